//! Per-resource in-flight tracking for hazard detection at decode.

use crate::decoder::{Instruction, Operand};
use crate::state::{RegisterIndex, REGISTER_COUNT};

/// Architectural resource an in-flight instruction can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// Vector register `VRn`.
    Vector(RegisterIndex),
    /// Scalar register `SRn`.
    Scalar(RegisterIndex),
    /// Vector length register.
    VectorLength,
    /// Vector mask register.
    VectorMask,
}

impl Resource {
    const fn slot(self) -> usize {
        match self {
            Self::Vector(reg) => reg.index(),
            Self::Scalar(reg) => REGISTER_COUNT + reg.index(),
            Self::VectorLength => 2 * REGISTER_COUNT,
            Self::VectorMask => 2 * REGISTER_COUNT + 1,
        }
    }
}

const SLOTS: usize = 2 * REGISTER_COUNT + 2;

/// Resources one instruction holds from decode until retirement.
///
/// Register operands are always held exclusively. The mask and length
/// registers are held exclusively by the instructions that overwrite them
/// and shared by the instructions that only consume them, so consumers of
/// one mask may overlap each other but never the write that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    /// Held alone; blocks every other claim on the same resource.
    pub exclusive: Vec<Resource>,
    /// Held alongside other shared claims; blocks only exclusive ones.
    pub shared: Vec<Resource>,
}

impl Claims {
    /// Whether the instruction holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exclusive.is_empty() && self.shared.is_empty()
    }
}

/// Claims of one instruction: every register operand other than the
/// hardwired zero registers, plus the mask and length registers for the
/// instructions that use them.
#[must_use]
pub fn claims_of(instr: &Instruction) -> Claims {
    let opcode = instr.opcode();
    let mut exclusive: Vec<Resource> = instr
        .operands()
        .iter()
        .filter_map(|operand| match *operand {
            Operand::Scalar(reg) if !reg.is_zero() => Some(Resource::Scalar(reg)),
            Operand::Vector(reg) if !reg.is_zero() => Some(Resource::Vector(reg)),
            _ => None,
        })
        .collect();
    let mut shared = Vec::new();

    if opcode.writes_mask() {
        exclusive.push(Resource::VectorMask);
    } else if opcode.reads_mask() {
        shared.push(Resource::VectorMask);
    }
    if opcode.writes_vector_length() {
        exclusive.push(Resource::VectorLength);
    } else if opcode.reads_vector_length() {
        shared.push(Resource::VectorLength);
    }

    exclusive.sort_unstable();
    exclusive.dedup();
    Claims { exclusive, shared }
}

/// One exclusive flag and one shared-holder count per resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyBoard {
    held: [bool; SLOTS],
    sharers: [u32; SLOTS],
}

impl Default for BusyBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl BusyBoard {
    /// Board with every resource free.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: [false; SLOTS],
            sharers: [0; SLOTS],
        }
    }

    /// Whether any instruction holds `resource`, exclusively or shared.
    #[must_use]
    pub const fn is_busy(&self, resource: Resource) -> bool {
        self.held[resource.slot()] || self.sharers[resource.slot()] > 0
    }

    /// Whether `claims` conflict with anything currently held.
    #[must_use]
    pub fn blocks(&self, claims: &Claims) -> bool {
        claims.exclusive.iter().any(|resource| self.is_busy(*resource))
            || claims
                .shared
                .iter()
                .any(|resource| self.held[resource.slot()])
    }

    /// Takes `claims`.
    pub fn reserve(&mut self, claims: &Claims) {
        for resource in &claims.exclusive {
            self.held[resource.slot()] = true;
        }
        for resource in &claims.shared {
            self.sharers[resource.slot()] += 1;
        }
    }

    /// Gives `claims` back.
    pub fn release(&mut self, claims: &Claims) {
        for resource in &claims.exclusive {
            self.held[resource.slot()] = false;
        }
        for resource in &claims.shared {
            let sharers = &mut self.sharers[resource.slot()];
            *sharers = sharers.saturating_sub(1);
        }
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        !self.held.iter().any(|held| *held) && self.sharers.iter().all(|count| *count == 0)
    }
}
