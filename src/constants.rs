//! Register and block limits for the supported inverter family.
//!
//! The Modbus read limit is derived from the PDU size:
//! - Maximum PDU size: 253 bytes (RS485 ADU of 256 bytes minus address and CRC)
//! - FC03/FC04 response: function code (1) + byte count (1) + N × 2 ≤ 253

/// Maximum PDU (Protocol Data Unit) size per Modbus specification.
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum number of registers for FC03/FC04 (Read Holding/Input Registers)
///
/// (253 - 2) / 2 = 125.5 → 125 registers
pub const MAX_READ_REGISTERS: u16 = 125;

/// Largest address delta between a block's first register and any later
/// member for the reference inverter family.
///
/// Kept below [`MAX_READ_REGISTERS`] so that a trailing 32-bit member still
/// fits into a single read.
pub const DEFAULT_MAX_BLOCK_SPAN: u16 = 120;

/// Bytes carried by a single 16-bit register.
pub const BYTES_PER_REGISTER: usize = 2;
