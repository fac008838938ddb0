//! # Register Descriptors
//!
//! The planner's view of a single catalog register: how many addresses it
//! occupies, how it is ordered, and whether it must open a new block.
//!
//! ## Width Classes
//!
//! | Class | Registers | Aliases |
//! |-------|-----------|---------|
//! | U16 | 1 | uint16, int16, u16, i16, word |
//! | S32 | 2 | int32, i32, s32, long |
//! | U32 | 2 | uint32, u32, dword |

use std::fmt;

use crate::order::{DoubleWordOrder, WordOrder};

/// Modbus register namespace. Holding and input registers share address
/// values but are planned independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterType {
    /// Read/write registers (FC03)
    Holding,
    /// Read-only registers (FC04)
    Input,
}

impl RegisterType {
    /// Function code used to read this namespace.
    #[inline]
    pub fn read_function_code(&self) -> u8 {
        match self {
            Self::Holding => 0x03,
            Self::Input => 0x04,
        }
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Holding => write!(f, "holding"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// Data width of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WidthClass {
    /// 16-bit value (signed or unsigned), one address
    #[default]
    U16,
    /// 32-bit signed value, two addresses
    S32,
    /// 32-bit unsigned value, two addresses
    U32,
}

impl WidthClass {
    /// Number of consecutive addresses occupied.
    #[inline]
    pub fn register_count(&self) -> u16 {
        match self {
            Self::U16 => 1,
            Self::S32 | Self::U32 => 2,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uint16" | "u16" | "int16" | "i16" | "s16" | "word" | "short" => Some(Self::U16),
            "int32" | "i32" | "s32" | "long" => Some(Self::S32),
            "uint32" | "u32" | "dword" => Some(Self::U32),
            _ => None,
        }
    }
}

/// Planning-relevant attributes of one register.
///
/// The address is the key of the map handed to the planner, so it is not
/// repeated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterDescriptor {
    pub width: WidthClass,
    pub word_order: WordOrder,
    pub double_word_order: DoubleWordOrder,
    /// Start a new block at this register even if contiguous with the previous one.
    pub force_new_block: bool,
}

impl RegisterDescriptor {
    pub fn new(width: WidthClass) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn with_word_order(mut self, order: WordOrder) -> Self {
        self.word_order = order;
        self
    }

    pub fn with_double_word_order(mut self, order: DoubleWordOrder) -> Self {
        self.double_word_order = order;
        self
    }

    pub fn with_new_block(mut self) -> Self {
        self.force_new_block = true;
        self
    }

    #[inline]
    pub fn register_count(&self) -> u16 {
        self.width.register_count()
    }
}
