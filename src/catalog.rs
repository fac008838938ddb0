//! # Register Catalog
//!
//! Static per-model register tables and the gate that turns them into the
//! address-keyed maps the planner consumes.
//!
//! ## Device Variant Matching
//!
//! A catalog entry lists the inverter variants it applies to as a bitmask of
//! [`device_type`] flags. The flags fall into independent groups (generation,
//! phase count, PV kind, EPS, DC battery). For every group the entry matches
//! when it declares no flag of that group, or shares at least one flag of the
//! group with the connected device. Series prefixes on the entry's blacklist
//! never match.
//!
//! ## Registration Gate
//!
//! [`RegisterMaps::from_entries`] skips, with a warning:
//! - entries without a register address
//! - entries whose raw address does not fit 16 bits
//! - entries without a register type
//! - entries whose address is already taken in the same namespace
//!
//! ## Example
//!
//! ```rust
//! use inverter_modbus::catalog::{device_type::*, CatalogEntry, DeviceInfo, RegisterMaps};
//! use inverter_modbus::{RegisterType, WidthClass};
//!
//! let catalog = vec![
//!     CatalogEntry::new("pv_voltage_1", "PV Voltage 1")
//!         .with_register(RegisterType::Input, 0x03, WidthClass::U16)
//!         .with_allowed_types(GEN3 | GEN4),
//!     CatalogEntry::new("eps_power", "EPS Power")
//!         .with_register(RegisterType::Input, 0x78, WidthClass::S32)
//!         .with_allowed_types(GEN4 | EPS),
//! ];
//!
//! let device = DeviceInfo::new(GEN3 | X1 | HYBRID, "H1E");
//! let selected = device.select(&catalog);
//! assert_eq!(selected.len(), 1);
//!
//! let maps = RegisterMaps::from_entries(selected);
//! assert!(maps.input.contains_key(&0x03));
//! assert!(maps.warnings.is_empty());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::order::{DoubleWordOrder, WordOrder};
use crate::register::{RegisterDescriptor, RegisterType, WidthClass};

/// Inverter variant flags.
pub mod device_type {
    pub const GEN2: u32 = 0x0002;
    pub const GEN3: u32 = 0x0004;
    pub const GEN4: u32 = 0x0008;
    pub const ALL_GEN_GROUP: u32 = GEN2 | GEN3 | GEN4;

    pub const X1: u32 = 0x0100;
    pub const X3: u32 = 0x0200;
    pub const ALL_X_GROUP: u32 = X1 | X3;

    pub const HYBRID: u32 = 0x1000;
    pub const AC: u32 = 0x2000;
    pub const ALL_PV_GROUP: u32 = HYBRID | AC;

    pub const EPS: u32 = 0x8000;
    pub const ALL_EPS_GROUP: u32 = EPS;

    pub const DCB: u32 = 0x1_0000;
    pub const ALL_DCB_GROUP: u32 = DCB;

    /// Groups evaluated independently by [`super::matches`].
    pub const GROUPS: [u32; 5] = [
        ALL_GEN_GROUP,
        ALL_X_GROUP,
        ALL_PV_GROUP,
        ALL_EPS_GROUP,
        ALL_DCB_GROUP,
    ];
}

/// Whether a catalog entry applies to the connected device.
///
/// # Example
///
/// ```rust
/// use inverter_modbus::catalog::{device_type::*, matches};
///
/// let device = GEN4 | X3 | HYBRID;
/// assert!(matches(device, GEN4 | X3, "H34", &["H30"]));
/// assert!(!matches(device, GEN4 | X1, "H34", &[] as &[&str]));
/// assert!(!matches(device, GEN4, "H30A", &["H30"]));
/// ```
pub fn matches<S: AsRef<str>>(
    device_type: u32,
    allowed_types: u32,
    series: &str,
    blacklist: &[S],
) -> bool {
    let groups_match = device_type::GROUPS.iter().all(|&group| {
        allowed_types & group == 0 || device_type & allowed_types & group != 0
    });
    groups_match
        && !blacklist
            .iter()
            .any(|prefix| series.starts_with(prefix.as_ref()))
}

/// Identity of the connected inverter, detected at session setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Bitmask of [`device_type`] flags.
    pub device_type: u32,
    /// Serial-number prefix identifying the hardware series.
    pub series: String,
}

impl DeviceInfo {
    pub fn new(device_type: u32, series: impl Into<String>) -> Self {
        Self {
            device_type,
            series: series.into(),
        }
    }

    /// Entries of `catalog` that apply to this device, in catalog order.
    pub fn select<'a>(&self, catalog: &'a [CatalogEntry]) -> Vec<&'a CatalogEntry> {
        catalog
            .iter()
            .filter(|entry| entry.applies_to(self))
            .collect()
    }
}

/// One data point of a device-model catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Stable identifier, unique within the catalog.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Register address; `None` when the point has no Modbus register.
    pub register: Option<u16>,
    /// Raw address given to [`CatalogEntry::with_raw_address`] that does not
    /// fit the 16-bit address space.
    pub out_of_range_address: Option<i32>,
    pub register_type: Option<RegisterType>,
    pub descriptor: RegisterDescriptor,
    /// Bitmask of [`device_type`] flags this entry applies to.
    pub allowed_types: u32,
    /// Series prefixes excluded even when the type mask matches.
    pub blacklist: Vec<String>,
    pub scale: f64,
    /// `(series prefix, scale)` rules, first match wins.
    pub scale_exceptions: Vec<(String, f64)>,
}

impl CatalogEntry {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            register: None,
            out_of_range_address: None,
            register_type: None,
            descriptor: RegisterDescriptor::default(),
            allowed_types: 0,
            blacklist: Vec::new(),
            scale: 1.0,
            scale_exceptions: Vec::new(),
        }
    }

    pub fn with_register(
        mut self,
        register_type: RegisterType,
        address: u16,
        width: WidthClass,
    ) -> Self {
        self.register_type = Some(register_type);
        self.register = Some(address);
        self.descriptor.width = width;
        self
    }

    /// Set the address from a raw catalog value where negative means
    /// "no register assigned". Values above `0xFFFF` leave no address and are
    /// reported as [`CatalogWarning::AddressOutOfRange`] on registration.
    pub fn with_raw_address(mut self, raw: i32) -> Self {
        self.register = u16::try_from(raw).ok();
        self.out_of_range_address = (raw > i32::from(u16::MAX)).then_some(raw);
        self
    }

    pub fn with_register_type(mut self, register_type: RegisterType) -> Self {
        self.register_type = Some(register_type);
        self
    }

    pub fn with_orders(mut self, order16: WordOrder, order32: DoubleWordOrder) -> Self {
        self.descriptor.word_order = order16;
        self.descriptor.double_word_order = order32;
        self
    }

    pub fn with_new_block(mut self) -> Self {
        self.descriptor.force_new_block = true;
        self
    }

    pub fn with_allowed_types(mut self, mask: u32) -> Self {
        self.allowed_types = mask;
        self
    }

    pub fn with_blacklist<S: Into<String>>(
        mut self,
        prefixes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.blacklist = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_scale_exception(mut self, prefix: impl Into<String>, scale: f64) -> Self {
        self.scale_exceptions.push((prefix.into(), scale));
        self
    }

    #[inline]
    pub fn applies_to(&self, device: &DeviceInfo) -> bool {
        matches(
            device.device_type,
            self.allowed_types,
            &device.series,
            &self.blacklist,
        )
    }

    /// Scale for a device series: the first exception whose prefix matches,
    /// otherwise the default scale.
    pub fn resolve_scale(&self, series: &str) -> f64 {
        self.scale_exceptions
            .iter()
            .find(|(prefix, _)| series.starts_with(prefix.as_str()))
            .map(|&(_, scale)| scale)
            .unwrap_or(self.scale)
    }
}

/// Catalog authoring problems found while registering entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogWarning {
    MissingAddress {
        key: String,
    },
    AddressOutOfRange {
        key: String,
        address: i32,
    },
    MissingRegisterType {
        key: String,
    },
    DuplicateAddress {
        register_type: RegisterType,
        address: u16,
        key: String,
    },
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAddress { key } => {
                write!(f, "entity without modbus register address found: {}", key)
            }
            Self::AddressOutOfRange { key, address } => {
                write!(f, "register address 0x{:x} out of range: {}", address, key)
            }
            Self::MissingRegisterType { key } => {
                write!(f, "entity declaration without register_type found: {}", key)
            }
            Self::DuplicateAddress {
                register_type,
                address,
                key,
            } => write!(
                f,
                "{} register already used: 0x{:x} {}",
                register_type, address, key
            ),
        }
    }
}

/// Address-keyed descriptor maps for both namespaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterMaps {
    pub holding: BTreeMap<u16, RegisterDescriptor>,
    pub input: BTreeMap<u16, RegisterDescriptor>,
    pub warnings: Vec<CatalogWarning>,
}

impl RegisterMaps {
    /// Register entries in order; the first entry claiming an address wins.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CatalogEntry>) -> Self {
        let mut maps = Self::default();
        for entry in entries {
            maps.register(entry);
        }
        debug!(
            "Catalog registered: holding={} input={} warnings={}",
            maps.holding.len(),
            maps.input.len(),
            maps.warnings.len()
        );
        maps
    }

    fn register(&mut self, entry: &CatalogEntry) {
        let Some(address) = entry.register else {
            let warning = match entry.out_of_range_address {
                Some(address) => CatalogWarning::AddressOutOfRange {
                    key: entry.key.clone(),
                    address,
                },
                None => CatalogWarning::MissingAddress {
                    key: entry.key.clone(),
                },
            };
            self.push_warning(warning);
            return;
        };
        let Some(register_type) = entry.register_type else {
            self.push_warning(CatalogWarning::MissingRegisterType {
                key: entry.key.clone(),
            });
            return;
        };

        let map = match register_type {
            RegisterType::Holding => &mut self.holding,
            RegisterType::Input => &mut self.input,
        };
        if map.contains_key(&address) {
            self.push_warning(CatalogWarning::DuplicateAddress {
                register_type,
                address,
                key: entry.key.clone(),
            });
            return;
        }
        map.insert(address, entry.descriptor);
    }

    fn push_warning(&mut self, warning: CatalogWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn get(&self, register_type: RegisterType) -> &BTreeMap<u16, RegisterDescriptor> {
        match register_type {
            RegisterType::Holding => &self.holding,
            RegisterType::Input => &self.input,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::device_type::*;
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn test_matches_empty_mask_matches_everything() {
        assert!(matches(GEN2 | X1 | AC, 0, "A1", NONE));
    }

    #[test]
    fn test_matches_requires_every_declared_group() {
        let device = GEN3 | X3 | HYBRID;
        assert!(matches(device, GEN3, "H3", NONE));
        assert!(matches(device, GEN3 | GEN4 | X3, "H3", NONE));
        assert!(!matches(device, GEN4 | X3, "H3", NONE));
        assert!(!matches(device, GEN3 | X1, "H3", NONE));
        assert!(!matches(device, GEN3 | EPS, "H3", NONE));
        assert!(matches(device | EPS, GEN3 | EPS, "H3", NONE));
    }

    #[test]
    fn test_matches_blacklist_prefix() {
        assert!(!matches(GEN4, GEN4, "H450", &["H45", "XRE"]));
        assert!(matches(GEN4, GEN4, "H460", &["H45", "XRE"]));
    }

    #[test]
    fn test_resolve_scale_first_match_wins() {
        let entry = CatalogEntry::new("grid_power", "Grid Power")
            .with_scale(0.1)
            .with_scale_exception("H4", 1.0)
            .with_scale_exception("H43", 0.01);

        assert_eq!(entry.resolve_scale("H430"), 1.0);
        assert_eq!(entry.resolve_scale("H3"), 0.1);
    }

    #[test]
    fn test_raw_address_sentinel() {
        let missing = CatalogEntry::new("a", "A").with_raw_address(-1);
        assert_eq!(missing.register, None);
        assert_eq!(missing.out_of_range_address, None);

        let present = CatalogEntry::new("a", "A").with_raw_address(0x10);
        assert_eq!(present.register, Some(0x10));
        assert_eq!(present.out_of_range_address, None);

        let too_high = CatalogEntry::new("a", "A").with_raw_address(0x1_0000);
        assert_eq!(too_high.register, None);
        assert_eq!(too_high.out_of_range_address, Some(0x1_0000));
    }

    #[test]
    fn test_register_maps_report_out_of_range_address() {
        let catalog = vec![
            CatalogEntry::new("too_high", "Too High")
                .with_register_type(RegisterType::Holding)
                .with_raw_address(0x1_2345),
            CatalogEntry::new("unset", "Unset")
                .with_register_type(RegisterType::Holding)
                .with_raw_address(-1),
        ];
        let maps = RegisterMaps::from_entries(&catalog);

        assert!(maps.holding.is_empty());
        assert_eq!(
            maps.warnings,
            vec![
                CatalogWarning::AddressOutOfRange {
                    key: "too_high".to_string(),
                    address: 0x1_2345,
                },
                CatalogWarning::MissingAddress {
                    key: "unset".to_string()
                },
            ]
        );
        assert_eq!(
            maps.warnings[0].to_string(),
            "register address 0x12345 out of range: too_high"
        );
    }

    #[test]
    fn test_select_filters_by_device() {
        let catalog = vec![
            CatalogEntry::new("a", "A").with_allowed_types(GEN3),
            CatalogEntry::new("b", "B").with_allowed_types(GEN4),
            CatalogEntry::new("c", "C").with_allowed_types(GEN3).with_blacklist(["H3B"]),
        ];
        let keys: Vec<_> = DeviceInfo::new(GEN3 | X1, "H3BX")
            .select(&catalog)
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn test_register_maps_split_by_namespace() {
        let catalog = vec![
            CatalogEntry::new("h", "H").with_register(RegisterType::Holding, 0x10, WidthClass::U16),
            CatalogEntry::new("i", "I").with_register(RegisterType::Input, 0x10, WidthClass::U32),
        ];
        let maps = RegisterMaps::from_entries(&catalog);

        assert_eq!(maps.holding.len(), 1);
        assert_eq!(maps.input.len(), 1);
        assert_eq!(maps.get(RegisterType::Input)[&0x10].width, WidthClass::U32);
        assert!(maps.warnings.is_empty());
    }

    #[test]
    fn test_register_maps_skip_invalid_entries() {
        let catalog = vec![
            CatalogEntry::new("first", "First").with_register(
                RegisterType::Input,
                0x20,
                WidthClass::U16,
            ),
            CatalogEntry::new("dup", "Dup")
                .with_register(RegisterType::Input, 0x20, WidthClass::U32)
                .with_new_block(),
            CatalogEntry::new("computed", "Computed"),
            CatalogEntry::new("untyped", "Untyped").with_raw_address(0x30),
        ];
        let maps = RegisterMaps::from_entries(&catalog);

        assert_eq!(maps.input.len(), 1);
        assert_eq!(maps.input[&0x20].width, WidthClass::U16);
        assert!(!maps.input[&0x20].force_new_block);
        assert_eq!(
            maps.warnings,
            vec![
                CatalogWarning::DuplicateAddress {
                    register_type: RegisterType::Input,
                    address: 0x20,
                    key: "dup".to_string(),
                },
                CatalogWarning::MissingAddress {
                    key: "computed".to_string()
                },
                CatalogWarning::MissingRegisterType {
                    key: "untyped".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_register_maps_are_ascending() {
        let catalog = vec![
            CatalogEntry::new("c", "C").with_register(RegisterType::Holding, 0x30, WidthClass::U16),
            CatalogEntry::new("a", "A").with_register(RegisterType::Holding, 0x01, WidthClass::U16),
            CatalogEntry::new("b", "B").with_register(RegisterType::Holding, 0x15, WidthClass::U16),
        ];
        let maps = RegisterMaps::from_entries(&catalog);
        let addresses: Vec<u16> = maps.holding.keys().copied().collect();
        assert_eq!(addresses, vec![0x01, 0x15, 0x30]);
    }

    #[test]
    fn test_warning_display() {
        let w = CatalogWarning::DuplicateAddress {
            register_type: RegisterType::Holding,
            address: 0x1f,
            key: "charger_max".to_string(),
        };
        assert_eq!(w.to_string(), "holding register already used: 0x1f charger_max");
    }
}
