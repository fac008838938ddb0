//! # Device Limits Configuration
//!
//! Read-side limits used when planning and fetching register blocks.
//!
//! - **Block span**: largest address delta from a block's first register to
//!   any later member (120 for the reference inverter family)
//! - **Read registers (FC03/04)**: Max 125 registers per request
//! - **Inter-request delay**: pause between consecutive block reads, for
//!   inverters that rate-limit their Modbus interface

use crate::constants::{DEFAULT_MAX_BLOCK_SPAN, MAX_READ_REGISTERS};
use crate::error::{ModbusError, ModbusResult};

/// Default inter-request delay in milliseconds.
pub const DEFAULT_INTER_REQUEST_DELAY_MS: u64 = 0;

/// Device-specific read limits.
///
/// A block can cover up to `max_block_span + 2` registers, so
/// [`DeviceLimits::validate`] requires that to fit in `max_read_registers`.
///
/// # Example
///
/// ```rust
/// use inverter_modbus::DeviceLimits;
///
/// let limits = DeviceLimits::new()
///     .with_max_block_span(60)
///     .with_inter_request_delay_ms(10);
///
/// assert_eq!(limits.max_block_span, 60);
/// assert!(limits.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Maximum `reg - block.start` for a register merged into a block.
    pub max_block_span: u16,
    /// Maximum registers per read request.
    pub max_read_registers: u16,
    /// Minimum delay between block reads (milliseconds).
    pub inter_request_delay_ms: u64,
}

impl DeviceLimits {
    /// Create limits with the reference inverter family values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create limits for a slow or rate-limited inverter:
    /// - block span of 50 registers
    /// - 60 registers per read
    /// - 20ms inter-request delay
    pub fn conservative() -> Self {
        Self {
            max_block_span: 50,
            max_read_registers: 60,
            inter_request_delay_ms: 20,
        }
    }

    pub fn with_max_block_span(mut self, span: u16) -> Self {
        self.max_block_span = span;
        self
    }

    pub fn with_max_read_registers(mut self, count: u16) -> Self {
        self.max_read_registers = count;
        self
    }

    pub fn with_inter_request_delay_ms(mut self, delay_ms: u64) -> Self {
        self.inter_request_delay_ms = delay_ms;
        self
    }

    /// Reject limits that cannot produce a usable plan.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.max_block_span == 0 {
            return Err(ModbusError::configuration("max_block_span must be positive"));
        }
        if self.max_read_registers == 0 || self.max_read_registers > MAX_READ_REGISTERS {
            return Err(ModbusError::configuration(format!(
                "max_read_registers must be within 1..={}, got {}",
                MAX_READ_REGISTERS, self.max_read_registers
            )));
        }
        // a 32-bit last member ends two registers past start + span
        if !self.is_read_within_limits(self.max_block_span.saturating_add(2)) {
            return Err(ModbusError::configuration(format!(
                "max_block_span {} plus a 32-bit member exceeds max_read_registers {}",
                self.max_block_span, self.max_read_registers
            )));
        }
        Ok(())
    }

    /// Check if a read request is within limits.
    pub fn is_read_within_limits(&self, register_count: u16) -> bool {
        register_count <= self.max_read_registers
    }
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_block_span: DEFAULT_MAX_BLOCK_SPAN,
            max_read_registers: MAX_READ_REGISTERS,
            inter_request_delay_ms: DEFAULT_INTER_REQUEST_DELAY_MS,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
