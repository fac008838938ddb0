//! # Device Session
//!
//! Owns everything a connected inverter needs after setup: the sensors
//! selected from the catalog, one block plan per register namespace, the raw
//! bytes of the most recent read of each block, and the subscribers to notify
//! when fresh data arrives.
//!
//! Readers borrow from the session; nothing outside it holds the plan or the
//! data. A changed catalog goes through [`Session::reload`], which re-plans
//! from scratch.
//!
//! ## Refresh Cycle
//!
//! [`Session::refresh`] reads every planned block through a [`BlockReader`],
//! holding registers first. A failed block is recorded in the
//! [`RefreshReport`] and its data cleared; the remaining blocks are still
//! read. Subscribers are notified once per cycle when at least one block
//! succeeded.
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use inverter_modbus::catalog::{device_type::*, CatalogEntry, DeviceInfo};
//! use inverter_modbus::{
//!     BlockReader, DeviceLimits, ModbusResult, RegisterType, Session, WidthClass,
//! };
//!
//! struct Transport;
//!
//! impl BlockReader for Transport {
//!     async fn read_block(&mut self, _: RegisterType, _: u16, count: u16) -> ModbusResult<Bytes> {
//!         Ok(Bytes::from(vec![0u8; usize::from(count) * 2]))
//!     }
//! }
//!
//! # async fn example() -> ModbusResult<()> {
//! let catalog = vec![CatalogEntry::new("battery_soc", "Battery SoC")
//!     .with_register(RegisterType::Input, 0x1C, WidthClass::U16)
//!     .with_allowed_types(GEN4)];
//!
//! let device = DeviceInfo::new(GEN4 | X1 | HYBRID, "H4");
//! let mut session = Session::setup("solax", device, &catalog, DeviceLimits::new())?;
//! let report = session.refresh(&mut Transport).await;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogEntry, CatalogWarning, DeviceInfo, RegisterMaps};
use crate::constants::BYTES_PER_REGISTER;
use crate::device_limits::DeviceLimits;
use crate::error::{ModbusError, ModbusResult};
use crate::planner::{plan_checked, Block, BlockPlan};
use crate::register::{RegisterType, WidthClass};

/// Transport seam: reads `count` registers starting at `start` and returns
/// their raw bytes, two per register, in wire order.
pub trait BlockReader: Send {
    fn read_block(
        &mut self,
        register_type: RegisterType,
        start: u16,
        count: u16,
    ) -> impl Future<Output = ModbusResult<Bytes>> + Send;
}

/// Receives a notification after each refresh cycle that produced data.
pub trait Subscriber: Send + Sync {
    fn on_update(&self, session: &Session);
}

/// A catalog entry bound to the connected device.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorBinding {
    pub key: String,
    pub name: String,
    pub register_type: Option<RegisterType>,
    pub address: Option<u16>,
    pub width: WidthClass,
    /// Scale after applying the device series overrides.
    pub scale: f64,
}

impl SensorBinding {
    pub fn new(entry: &CatalogEntry, device: &DeviceInfo) -> Self {
        Self {
            key: entry.key.clone(),
            name: entry.name.clone(),
            register_type: entry.register_type,
            address: entry.register,
            width: entry.descriptor.width,
            scale: entry.resolve_scale(&device.series),
        }
    }
}

/// A block read that failed during a refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockFailure {
    pub register_type: RegisterType,
    pub index: usize,
    pub start: u16,
    pub error: ModbusError,
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub succeeded: usize,
    pub failures: Vec<BlockFailure>,
}

impl RefreshReport {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct Namespace {
    plan: BlockPlan,
    data: Vec<Option<Bytes>>,
}

impl Namespace {
    fn new(plan: BlockPlan) -> Self {
        let data = vec![None; plan.len()];
        Self { plan, data }
    }

    fn register_bytes(&self, address: u16, width: WidthClass) -> Option<&[u8]> {
        let (index, block) = self.plan.find(address)?;
        let data = self.data[index].as_ref()?;
        let offset = block.offset_of(address)? * BYTES_PER_REGISTER;
        let len = usize::from(width.register_count()) * BYTES_PER_REGISTER;
        data.get(offset..offset + len)
    }
}

/// Single-owner hub state for one connected inverter.
pub struct Session {
    name: String,
    device: DeviceInfo,
    limits: DeviceLimits,
    sensors: Vec<SensorBinding>,
    catalog_warnings: Vec<CatalogWarning>,
    holding: Namespace,
    input: Namespace,
    subscribers: Vec<Arc<dyn Subscriber>>,
    last_update: Option<DateTime<Utc>>,
}

impl Session {
    /// Filter `catalog` for `device`, register the applicable entries and
    /// plan both namespaces.
    ///
    /// Catalog authoring problems are logged and kept in
    /// [`Session::catalog_warnings`]; only invalid `limits` fail.
    pub fn setup(
        name: impl Into<String>,
        device: DeviceInfo,
        catalog: &[CatalogEntry],
        limits: DeviceLimits,
    ) -> ModbusResult<Self> {
        limits.validate()?;
        let mut session = Self {
            name: name.into(),
            device,
            limits,
            sensors: Vec::new(),
            catalog_warnings: Vec::new(),
            holding: Namespace::default(),
            input: Namespace::default(),
            subscribers: Vec::new(),
            last_update: None,
        };
        session.reload(catalog)?;
        Ok(session)
    }

    /// Replace the catalog: rebuild sensors and both plans, drop cached data.
    ///
    /// Subscribers are kept.
    pub fn reload(&mut self, catalog: &[CatalogEntry]) -> ModbusResult<()> {
        let selected = self.device.select(catalog);
        let sensors: Vec<SensorBinding> = selected
            .iter()
            .map(|entry| SensorBinding::new(entry, &self.device))
            .collect();
        let maps = RegisterMaps::from_entries(selected);

        let span = self.limits.max_block_span;
        let holding = plan_checked(&maps.holding, span)?;
        let input = plan_checked(&maps.input, span)?;

        let namespaces = [
            (RegisterType::Holding, &holding),
            (RegisterType::Input, &input),
        ];
        for (register_type, plan) in namespaces {
            info!(
                "{}: {} {} blocks, {} registers",
                self.name,
                plan.len(),
                register_type,
                plan.total_registers()
            );
            for block in &plan.blocks {
                debug!("{} {} block {}", self.name, register_type, block);
            }
        }

        self.sensors = sensors;
        self.catalog_warnings = maps.warnings;
        self.holding = Namespace::new(holding);
        self.input = Namespace::new(input);
        self.last_update = None;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    pub fn sensors(&self) -> &[SensorBinding] {
        &self.sensors
    }

    pub fn catalog_warnings(&self) -> &[CatalogWarning] {
        &self.catalog_warnings
    }

    pub fn plan(&self, register_type: RegisterType) -> &BlockPlan {
        &self.namespace(register_type).plan
    }

    /// Time of the last refresh cycle in which at least one block was read.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Raw bytes of one register from the most recent successful read of its
    /// block.
    pub fn register_bytes(
        &self,
        register_type: RegisterType,
        address: u16,
        width: WidthClass,
    ) -> Option<&[u8]> {
        self.namespace(register_type).register_bytes(address, width)
    }

    /// Raw bytes backing a sensor, looked up by key.
    pub fn sensor_bytes(&self, key: &str) -> Option<&[u8]> {
        let sensor = self.sensors.iter().find(|s| s.key == key)?;
        self.register_bytes(sensor.register_type?, sensor.address?, sensor.width)
    }

    /// Add a subscriber. Returns `false` if it was already subscribed.
    pub fn subscribe(&mut self, subscriber: Arc<dyn Subscriber>) -> bool {
        if self.position(&subscriber).is_some() {
            return false;
        }
        self.subscribers.push(subscriber);
        true
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, subscriber: &Arc<dyn Subscriber>) -> bool {
        match self.position(subscriber) {
            Some(idx) => {
                self.subscribers.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Read every planned block, holding registers first.
    pub async fn refresh<R: BlockReader>(&mut self, reader: &mut R) -> RefreshReport {
        let delay_ms = self.limits.inter_request_delay_ms;
        let mut report = RefreshReport::default();
        let mut first_request = true;

        for register_type in [RegisterType::Holding, RegisterType::Input] {
            let namespace = match register_type {
                RegisterType::Holding => &mut self.holding,
                RegisterType::Input => &mut self.input,
            };
            for (index, block) in namespace.plan.blocks.iter().enumerate() {
                if delay_ms > 0 && !first_request {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                first_request = false;

                match read_block(reader, register_type, block).await {
                    Ok(data) => {
                        namespace.data[index] = Some(data);
                        report.succeeded += 1;
                    }
                    Err(error) => {
                        warn!(
                            "{}: reading {} block at 0x{:x} failed: {}",
                            self.name, register_type, block.start, error
                        );
                        namespace.data[index] = None;
                        report.failures.push(BlockFailure {
                            register_type,
                            index,
                            start: block.start,
                            error,
                        });
                    }
                }
            }
        }

        if report.succeeded > 0 {
            self.last_update = Some(Utc::now());
            self.notify();
        }
        report
    }

    fn notify(&self) {
        for subscriber in &self.subscribers {
            subscriber.on_update(self);
        }
    }

    fn namespace(&self, register_type: RegisterType) -> &Namespace {
        match register_type {
            RegisterType::Holding => &self.holding,
            RegisterType::Input => &self.input,
        }
    }

    fn position(&self, subscriber: &Arc<dyn Subscriber>) -> Option<usize> {
        let target = Arc::as_ptr(subscriber) as *const ();
        self.subscribers
            .iter()
            .position(|s| Arc::as_ptr(s) as *const () == target)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("device", &self.device)
            .field("sensors", &self.sensors.len())
            .field("holding_blocks", &self.holding.plan.len())
            .field("input_blocks", &self.input.plan.len())
            .field("subscribers", &self.subscribers.len())
            .field("last_update", &self.last_update)
            .finish()
    }
}

async fn read_block<R: BlockReader>(
    reader: &mut R,
    register_type: RegisterType,
    block: &Block,
) -> ModbusResult<Bytes> {
    let count = u16::try_from(block.register_count()).map_err(|_| {
        ModbusError::invalid_argument(format!(
            "block at 0x{:x} exceeds the address space",
            block.start
        ))
    })?;
    let data = reader.read_block(register_type, block.start, count).await?;
    let expected = usize::from(count) * BYTES_PER_REGISTER;
    if data.len() != expected {
        return Err(ModbusError::invalid_data(format!(
            "block at 0x{:x}: expected {} bytes, got {}",
            block.start,
            expected,
            data.len()
        )));
    }
    Ok(data)
}

// ============================================================================
// Tests
// ============================================================================
