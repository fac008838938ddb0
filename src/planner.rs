//! # Register Block Planner
//!
//! Partitions a sparse, ascending set of registers into contiguous blocks that
//! can each be fetched with a single FC03/FC04 read.
//!
//! ## How It Works
//!
//! A single linear scan keeps one open block. A register closes the open
//! block and starts a new one when either:
//! - its descriptor sets `force_new_block`, or
//! - its distance from the open block's first register exceeds `max_span`
//!
//! Otherwise it is merged into the open block. The span test is measured from
//! the block start, so a single wide register may end past `start + max_span`;
//! only *later* members are bounded.
//!
//! Ordering consistency is not enforced while merging. [`check_consistency`]
//! inspects a whole namespace and [`check_blocks`] inspects each block against
//! its inherited ordering; both only warn.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use inverter_modbus::{plan, RegisterDescriptor, WidthClass};
//!
//! let mut regs = BTreeMap::new();
//! regs.insert(10, RegisterDescriptor::new(WidthClass::U16));
//! regs.insert(11, RegisterDescriptor::new(WidthClass::U32));
//! regs.insert(200, RegisterDescriptor::new(WidthClass::U16));
//!
//! let plan = plan(&regs, 120).unwrap();
//! assert_eq!(plan.blocks.len(), 2);
//! assert_eq!((plan.blocks[0].start, plan.blocks[0].end), (10, 13));
//! assert_eq!(plan.blocks[1].members, vec![200]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, warn};

use crate::error::{ModbusError, ModbusResult};
use crate::order::{DoubleWordOrder, WordOrder};
use crate::register::RegisterDescriptor;

/// A contiguous address range fetched with one read transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// First address of the range.
    pub start: u16,
    /// Address right after the last occupied register (exclusive).
    ///
    /// `u32` so that a register at the top of the address space still has a
    /// representable end.
    pub end: u32,
    /// Byte order inherited from the first member.
    pub word_order: WordOrder,
    /// Word order inherited from the first member.
    pub double_word_order: DoubleWordOrder,
    /// Member register addresses, ascending.
    pub members: Vec<u16>,
}

impl Block {
    /// Number of registers covered by `[start, end)`.
    #[inline]
    pub fn register_count(&self) -> u32 {
        self.end - u32::from(self.start)
    }

    #[inline]
    pub fn contains(&self, address: u16) -> bool {
        u32::from(address) < self.end && address >= self.start
    }

    /// Register offset of `address` inside this block.
    pub fn offset_of(&self, address: u16) -> Option<usize> {
        self.contains(address).then(|| usize::from(address - self.start))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[0x{:04x}, 0x{:04x}) {} registers, {} members",
            self.start,
            self.end,
            self.register_count(),
            self.members.len()
        )
    }
}

/// Non-fatal findings produced while planning a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    /// `force_new_block` was set while no block was open.
    EmptyNewBlock { address: u16 },
    /// The namespace declares more than one 16-bit byte order.
    InconsistentWordOrder { orders: Vec<WordOrder> },
    /// The namespace declares more than one 32-bit word order.
    InconsistentDoubleWordOrder { orders: Vec<DoubleWordOrder> },
    /// A member disagrees with the ordering its block inherited.
    MixedEndianness { block_start: u16, address: u16 },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNewBlock { address } => {
                write!(f, "newblock declaration found for empty block at 0x{:x}", address)
            }
            Self::InconsistentWordOrder { orders } => write!(
                f,
                "inconsistent Big or Little Endian declaration for 16bit registers: {:?}",
                orders
            ),
            Self::InconsistentDoubleWordOrder { orders } => write!(
                f,
                "inconsistent Big or Little Endian declaration for 32bit registers: {:?}",
                orders
            ),
            Self::MixedEndianness {
                block_start,
                address,
            } => write!(
                f,
                "register 0x{:x} ordering differs from block starting at 0x{:x}",
                address, block_start
            ),
        }
    }
}

/// Planner output: blocks in ascending `start` order plus any warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPlan {
    pub blocks: Vec<Block>,
    pub warnings: Vec<PlanWarning>,
}

impl BlockPlan {
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Locate the block whose range contains `address`.
    pub fn find(&self, address: u16) -> Option<(usize, &Block)> {
        let idx = self
            .blocks
            .partition_point(|b| b.start <= address)
            .checked_sub(1)?;
        let block = &self.blocks[idx];
        block.contains(address).then_some((idx, block))
    }

    /// Total registers fetched per refresh cycle.
    pub fn total_registers(&self) -> u32 {
        self.blocks.iter().map(Block::register_count).sum()
    }
}

/// Block being accumulated during the scan.
struct OpenBlock {
    start: u16,
    end: u32,
    word_order: WordOrder,
    double_word_order: DoubleWordOrder,
    members: Vec<u16>,
}

impl OpenBlock {
    fn new(start: u16, first: &RegisterDescriptor) -> Self {
        Self {
            start,
            end: u32::from(start),
            word_order: first.word_order,
            double_word_order: first.double_word_order,
            members: Vec::new(),
        }
    }

    fn push(&mut self, address: u16, desc: &RegisterDescriptor) {
        self.end = u32::from(address) + u32::from(desc.register_count());
        self.members.push(address);
    }

    fn finish(self) -> Block {
        debug!(
            "Block closed: start=0x{:x} end=0x{:x} members={}",
            self.start,
            self.end,
            self.members.len()
        );
        Block {
            start: self.start,
            end: self.end,
            word_order: self.word_order,
            double_word_order: self.double_word_order,
            members: self.members,
        }
    }
}

/// Plan blocks for an address-keyed register map.
///
/// `BTreeMap` iteration is ascending, so only `max_span` is validated.
pub fn plan(
    descriptors: &BTreeMap<u16, RegisterDescriptor>,
    max_span: u16,
) -> ModbusResult<BlockPlan> {
    plan_sorted(descriptors.iter().map(|(&reg, desc)| (reg, desc)), max_span)
}

/// Plan blocks from `(address, descriptor)` pairs that must be strictly
/// ascending by address.
///
/// Returns [`ModbusError::InvalidArgument`] for `max_span == 0` or when an
/// address is not greater than its predecessor.
pub fn plan_sorted<'a, I>(descriptors: I, max_span: u16) -> ModbusResult<BlockPlan>
where
    I: IntoIterator<Item = (u16, &'a RegisterDescriptor)>,
{
    if max_span == 0 {
        return Err(ModbusError::invalid_argument("max_span must be positive"));
    }

    let mut blocks = Vec::new();
    let mut warnings = Vec::new();
    let mut open: Option<OpenBlock> = None;
    let mut previous: Option<u16> = None;

    for (reg, desc) in descriptors {
        if let Some(prev) = previous {
            if reg <= prev {
                return Err(ModbusError::invalid_argument(format!(
                    "register addresses must be strictly ascending: 0x{:x} after 0x{:x}",
                    reg, prev
                )));
            }
        }

        let span_exceeded = open
            .as_ref()
            .is_some_and(|block| reg - block.start > max_span);

        if desc.force_new_block || span_exceeded {
            match open.take() {
                Some(block) => blocks.push(block.finish()),
                // defensive guard: a block is always open after the first register
                None if previous.is_some() => {
                    let warning = PlanWarning::EmptyNewBlock { address: reg };
                    warn!("{}", warning);
                    warnings.push(warning);
                }
                None => {}
            }
        }

        open.get_or_insert_with(|| OpenBlock::new(reg, desc))
            .push(reg, desc);
        previous = Some(reg);
    }

    if let Some(block) = open {
        blocks.push(block.finish());
    }

    Ok(BlockPlan { blocks, warnings })
}

/// Namespace-wide ordering check.
///
/// Emits one warning per ordering kind that has more than one distinct value.
pub fn check_consistency(descriptors: &BTreeMap<u16, RegisterDescriptor>) -> Vec<PlanWarning> {
    let order16: BTreeSet<WordOrder> = descriptors.values().map(|d| d.word_order).collect();
    let order32: BTreeSet<DoubleWordOrder> =
        descriptors.values().map(|d| d.double_word_order).collect();

    let mut warnings = Vec::new();
    if order32.len() > 1 {
        warnings.push(PlanWarning::InconsistentDoubleWordOrder {
            orders: order32.into_iter().collect(),
        });
    }
    if order16.len() > 1 {
        warnings.push(PlanWarning::InconsistentWordOrder {
            orders: order16.into_iter().collect(),
        });
    }
    for warning in &warnings {
        warn!("{}", warning);
    }
    warnings
}

/// Per-block ordering check against the ordering each block inherited.
pub fn check_blocks(
    blocks: &[Block],
    descriptors: &BTreeMap<u16, RegisterDescriptor>,
) -> Vec<PlanWarning> {
    let mut warnings = Vec::new();
    for block in blocks {
        for &address in block.members.iter().skip(1) {
            let Some(desc) = descriptors.get(&address) else {
                continue;
            };
            if desc.word_order != block.word_order
                || desc.double_word_order != block.double_word_order
            {
                let warning = PlanWarning::MixedEndianness {
                    block_start: block.start,
                    address,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }
    warnings
}

/// Plan a namespace and run both ordering checks.
///
/// Warnings from the catalog-wide check come first, then planner warnings,
/// then per-block mismatches.
pub fn plan_checked(
    descriptors: &BTreeMap<u16, RegisterDescriptor>,
    max_span: u16,
) -> ModbusResult<BlockPlan> {
    let mut warnings = check_consistency(descriptors);
    let mut plan = plan(descriptors, max_span)?;
    warnings.append(&mut plan.warnings);
    warnings.extend(check_blocks(&plan.blocks, descriptors));
    plan.warnings = warnings;
    Ok(plan)
}

// ============================================================================
// Tests
// ============================================================================
