//! End-to-end: catalog filtering, registration, planning and one refresh.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use inverter_modbus::catalog::device_type::*;
use inverter_modbus::{
    BlockReader, CatalogEntry, CatalogWarning, DeviceInfo, DeviceLimits, DoubleWordOrder,
    ModbusError, ModbusResult, PlanWarning, RegisterType, Session, Subscriber, WidthClass,
    WordOrder,
};

fn catalog() -> Vec<CatalogEntry> {
    vec![
        // holding
        CatalogEntry::new("serial", "Serial Number")
            .with_register(RegisterType::Holding, 0x00, WidthClass::U16),
        CatalogEntry::new("rtc", "RTC")
            .with_register(RegisterType::Holding, 0x85, WidthClass::U16)
            .with_allowed_types(GEN3 | GEN4),
        CatalogEntry::new("charger_use_mode", "Charger Use Mode")
            .with_register(RegisterType::Holding, 0x8B, WidthClass::U16)
            .with_allowed_types(GEN4),
        CatalogEntry::new("firmware_dsp", "Firmware DSP")
            .with_register(RegisterType::Holding, 0x7D, WidthClass::U16)
            .with_allowed_types(GEN2),
        // input
        CatalogEntry::new("grid_voltage", "Grid Voltage")
            .with_register(RegisterType::Input, 0x00, WidthClass::U16)
            .with_scale(0.1),
        CatalogEntry::new("grid_current", "Grid Current")
            .with_register(RegisterType::Input, 0x01, WidthClass::U16)
            .with_scale(0.1),
        CatalogEntry::new("feedin_energy", "Feed-in Energy")
            .with_register(RegisterType::Input, 0x48, WidthClass::U32)
            .with_orders(WordOrder::BigEndian, DoubleWordOrder::LittleEndian)
            .with_scale(0.01),
        CatalogEntry::new("battery_capacity", "Battery Capacity")
            .with_register(RegisterType::Input, 0x4A, WidthClass::U16)
            .with_new_block(),
        CatalogEntry::new("eps_voltage", "EPS Voltage")
            .with_register(RegisterType::Input, 0x76, WidthClass::U16)
            .with_allowed_types(EPS),
        CatalogEntry::new("pv_total_power", "PV Total Power")
            .with_register(RegisterType::Input, 0x100, WidthClass::S32)
            .with_allowed_types(GEN4 | HYBRID)
            .with_blacklist(["XRE"]),
        CatalogEntry::new("grid_voltage_again", "Grid Voltage")
            .with_register(RegisterType::Input, 0x00, WidthClass::U16),
        CatalogEntry::new("house_load", "House Load"),
    ]
}

struct ZeroReader {
    calls: usize,
}

impl BlockReader for ZeroReader {
    async fn read_block(&mut self, _: RegisterType, start: u16, count: u16) -> ModbusResult<Bytes> {
        self.calls += 1;
        if start == 0x100 {
            return Err(ModbusError::connection("device busy"));
        }
        Ok(Bytes::from(vec![0u8; usize::from(count) * 2]))
    }
}

struct Tick(AtomicUsize);

impl Subscriber for Tick {
    fn on_update(&self, session: &Session) {
        assert!(session.last_update().is_some());
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn gen4_hybrid_plan() {
    let device = DeviceInfo::new(GEN4 | X3 | HYBRID, "H34");
    let session = Session::setup("solax", device, &catalog(), DeviceLimits::new()).unwrap();

    let holding = session.plan(RegisterType::Holding);
    let spans: Vec<_> = holding.blocks.iter().map(|b| (b.start, b.end)).collect();
    // 0x85 - 0x00 > 120
    assert_eq!(spans, vec![(0x00, 0x01), (0x85, 0x8C)]);

    let input = session.plan(RegisterType::Input);
    let spans: Vec<_> = input.blocks.iter().map(|b| (b.start, b.end)).collect();
    assert_eq!(spans, vec![(0x00, 0x4A), (0x4A, 0x4B), (0x100, 0x102)]);
    assert_eq!(input.blocks[0].members, vec![0x00, 0x01, 0x48]);

    // feedin_energy declares CDAB while everything else is ABCD
    assert!(input
        .warnings
        .iter()
        .any(|w| matches!(w, PlanWarning::InconsistentDoubleWordOrder { .. })));
    assert!(input
        .warnings
        .iter()
        .any(|w| matches!(w, PlanWarning::MixedEndianness { address: 0x48, .. })));
    assert_eq!(input.blocks[0].double_word_order, DoubleWordOrder::BigEndian);

    assert_eq!(
        session.catalog_warnings(),
        &[
            CatalogWarning::DuplicateAddress {
                register_type: RegisterType::Input,
                address: 0x00,
                key: "grid_voltage_again".to_string(),
            },
            CatalogWarning::MissingAddress {
                key: "house_load".to_string(),
            },
        ]
    );
}

#[test]
fn blacklisted_series_drops_entry() {
    let device = DeviceInfo::new(GEN4 | X3 | HYBRID, "XRE10");
    let session = Session::setup("solax", device, &catalog(), DeviceLimits::new()).unwrap();

    assert!(session.sensors().iter().all(|s| s.key != "pv_total_power"));
    assert_eq!(session.plan(RegisterType::Input).len(), 2);
}

#[tokio::test]
async fn refresh_survives_failing_block() {
    let device = DeviceInfo::new(GEN4 | X3 | HYBRID, "H34");
    let mut session = Session::setup("solax", device, &catalog(), DeviceLimits::new()).unwrap();
    let tick = Arc::new(Tick(AtomicUsize::new(0)));
    session.subscribe(tick.clone());

    let mut reader = ZeroReader { calls: 0 };
    let report = session.refresh(&mut reader).await;

    assert_eq!(reader.calls, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].start, 0x100);
    assert_eq!(session.sensor_bytes("feedin_energy"), Some(&[0u8; 4][..]));
    assert_eq!(session.sensor_bytes("pv_total_power"), None);
    assert_eq!(tick.0.load(Ordering::SeqCst), 1);
}
