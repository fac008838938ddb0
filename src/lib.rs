//! # Inverter Modbus - Register Block Planning for Solar Inverters
//!
//! **License:** MIT
//!
//! Turns a static per-model register catalog into the minimal set of
//! contiguous Modbus reads needed to poll a connected solar inverter.
//!
//! ## Features
//!
//! - **Catalog Filtering**: Bitmask device-variant matching with series blacklists
//! - **Block Planning**: Greedy single-pass coalescing with span ceiling and
//!   explicit block-boundary hints
//! - **Ordering Checks**: Warnings for mixed byte/word order declarations
//! - **Sessions**: Single-owner hub state with per-block failure isolation and
//!   update subscribers
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use inverter_modbus::{plan, RegisterDescriptor, WidthClass, DEFAULT_MAX_BLOCK_SPAN};
//!
//! let mut regs = BTreeMap::new();
//! regs.insert(10, RegisterDescriptor::new(WidthClass::U16));
//! regs.insert(11, RegisterDescriptor::new(WidthClass::U16).with_new_block());
//! regs.insert(12, RegisterDescriptor::new(WidthClass::U16));
//!
//! let plan = plan(&regs, DEFAULT_MAX_BLOCK_SPAN).unwrap();
//! assert_eq!(plan.blocks[0].members, vec![10]);
//! assert_eq!(plan.blocks[1].members, vec![11, 12]);
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Register and block limits
pub mod constants;

/// Byte and word order declarations
pub mod order;

/// Register descriptors and namespaces
pub mod register;

/// Register block planning
pub mod planner;

// ============================================================================
// Device integration
// ============================================================================

/// Device-model catalogs and variant filtering
pub mod catalog;

/// Device-specific read limits configuration
pub mod device_limits;

/// Per-device session state and refresh cycle
pub mod session;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use order::{DoubleWordOrder, WordOrder};
pub use register::{RegisterDescriptor, RegisterType, WidthClass};

// === Planning ===
pub use planner::{
    check_blocks, check_consistency, plan, plan_checked, plan_sorted, Block, BlockPlan,
    PlanWarning,
};

// === Device integration ===
pub use catalog::{CatalogEntry, CatalogWarning, DeviceInfo, RegisterMaps};
pub use device_limits::DeviceLimits;
pub use session::{BlockReader, RefreshReport, SensorBinding, Session, Subscriber};

// === Limits ===
pub use constants::{DEFAULT_MAX_BLOCK_SPAN, MAX_READ_REGISTERS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
