//! # Byte and Word Order
//!
//! Ordering conventions declared per register in an inverter catalog.
//!
//! ## Terminology
//!
//! - **Word order** (`order16`): order of the two bytes inside one 16-bit register
//! - **Double-word order** (`order32`): order of the two registers that make up
//!   a 32-bit value
//!
//! Uses ABCD notation where A is the most significant byte:
//! - `WordOrder::BigEndian` (AB), `WordOrder::LittleEndian` (BA)
//! - `DoubleWordOrder::BigEndian` (ABCD, high word first),
//!   `DoubleWordOrder::LittleEndian` (CDAB, low word first)
//!
//! A block inherits both orders from its first register; every other member
//! is expected to agree.

use std::fmt;

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Byte order inside a single 16-bit register.
///
/// # Example
///
/// ```rust
/// use inverter_modbus::WordOrder;
///
/// assert_eq!(WordOrder::from_str("ba"), Some(WordOrder::LittleEndian));
/// assert_eq!(WordOrder::default(), WordOrder::BigEndian);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum WordOrder {
    /// AB: most significant byte first (Modbus wire order)
    #[default]
    BigEndian,
    /// BA: least significant byte first
    LittleEndian,
}

impl WordOrder {
    /// Parse "AB"/"BA", "BE"/"LE" or "big"/"little" in any case.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "AB" | "BE" | "BIG" | "BIGENDIAN" => Some(Self::BigEndian),
            "BA" | "LE" | "LITTLE" | "LITTLEENDIAN" => Some(Self::LittleEndian),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "AB (Big-Endian 16)",
            Self::LittleEndian => "BA (Little-Endian 16)",
        }
    }

    #[inline]
    pub fn is_big_endian(&self) -> bool {
        matches!(self, Self::BigEndian)
    }
}

impl fmt::Display for WordOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Word order used when two registers form a 32-bit value.
///
/// # Example
///
/// ```rust
/// use inverter_modbus::DoubleWordOrder;
///
/// let order = DoubleWordOrder::from_str("CDAB").unwrap();
/// assert_eq!(order, DoubleWordOrder::LittleEndian);
/// assert!(order.has_word_swap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DoubleWordOrder {
    /// ABCD: high word at the lower address
    #[default]
    BigEndian,
    /// CDAB: low word at the lower address
    LittleEndian,
}

impl DoubleWordOrder {
    /// Parse "ABCD"/"CDAB", "BE"/"LE" or "big"/"little" in any case.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "ABCD" | "BE" | "BIG" | "BIGENDIAN" => Some(Self::BigEndian),
            "CDAB" | "LE" | "LITTLE" | "LITTLEENDIAN" => Some(Self::LittleEndian),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "ABCD (Big-Endian)",
            Self::LittleEndian => "CDAB (Little-Endian words)",
        }
    }

    /// Check if the low word comes first on the wire.
    #[inline]
    pub fn has_word_swap(&self) -> bool {
        matches!(self, Self::LittleEndian)
    }
}

impl fmt::Display for DoubleWordOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
