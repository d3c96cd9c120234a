use thiserror::Error;

use crate::memory::AddressSpace;

/// Fault classes used for diagnostics aggregation and run-report summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Instruction fetch left the loaded program.
    Fetch,
    /// Data access outside an address space or an oversized snapshot.
    Memory,
    /// Arithmetic fault such as division by zero.
    Arithmetic,
    /// Control-register value outside its architectural range.
    Control,
    /// Instruction or cycle ceiling reached before completion.
    Budget,
    /// Internal contract broken (malformed operands, exhausted trace).
    Invariant,
}

/// Fatal simulation faults raised by the functional and timing engines.
///
/// Every variant carries the program counter, address, or cycle that
/// identifies where the run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SimError {
    /// Program counter does not name a loaded instruction.
    #[error("instruction fetch at pc {pc} outside program of {len} instructions")]
    InstructionOutOfBounds {
        /// Offending program counter.
        pc: i64,
        /// Number of loaded instructions.
        len: usize,
    },
    /// Effective address outside the addressed memory.
    #[error("{space} access at address {address} outside [0, {size}) (pc {pc})")]
    MemoryOutOfBounds {
        /// Address space that was accessed.
        space: AddressSpace,
        /// Offending effective address.
        address: i64,
        /// Size of the address space in words.
        size: usize,
        /// Program counter of the faulting instruction.
        pc: usize,
    },
    /// Initial memory snapshot holds more words than the address space.
    #[error("{space} snapshot holds {len} words but capacity is {size}")]
    SnapshotTooLarge {
        /// Address space being initialized.
        space: AddressSpace,
        /// Number of words supplied.
        len: usize,
        /// Capacity of the address space in words.
        size: usize,
    },
    /// Configured address width is wider than a memory can be allocated.
    #[error("{space} address width of {bits} bits exceeds the supported {max}")]
    AddressWidthUnsupported {
        /// Address space being allocated.
        space: AddressSpace,
        /// Requested width.
        bits: u32,
        /// Widest supported width.
        max: u32,
    },
    /// `DIV`, `DIVVV` or `DIVVS` with a zero divisor.
    #[error("division by zero at pc {pc}")]
    DivisionByZero {
        /// Program counter of the faulting instruction.
        pc: usize,
    },
    /// `MTCL` source outside `1..=max`.
    #[error("vector length {value} at pc {pc} outside [1, {max}]")]
    VectorLengthOutOfRange {
        /// Program counter of the faulting instruction.
        pc: usize,
        /// Rejected vector length.
        value: i32,
        /// Maximum vector length of the configured core.
        max: usize,
    },
    /// Instruction operands do not match the opcode's operand shape.
    #[error("operand shape mismatch for instruction at pc {pc}")]
    OperandShape {
        /// Program counter of the malformed instruction.
        pc: usize,
    },
    /// Functional run retired `limit` instructions without reaching `HALT`.
    #[error("instruction limit of {limit} reached before HALT")]
    InstructionLimitExceeded {
        /// Configured instruction ceiling.
        limit: u64,
    },
    /// Timing run did not drain within `limit` cycles.
    #[error("cycle limit of {limit} reached before the pipeline drained")]
    CycleLimitExceeded {
        /// Configured cycle ceiling.
        limit: u64,
    },
    /// Trace ran out of records before a `HALT` record was fetched.
    #[error("trace exhausted without a HALT record at cycle {cycle}")]
    TraceExhausted {
        /// Cycle at which fetch found no further record.
        cycle: u64,
    },
    /// Trace amendment requested before any record was appended.
    #[error("trace amendment with no record to amend")]
    EmptyTrace,
}

impl SimError {
    /// Returns the diagnostics fault class for this error.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::InstructionOutOfBounds { .. } => FaultClass::Fetch,
            Self::MemoryOutOfBounds { .. }
            | Self::SnapshotTooLarge { .. }
            | Self::AddressWidthUnsupported { .. } => FaultClass::Memory,
            Self::DivisionByZero { .. } => FaultClass::Arithmetic,
            Self::VectorLengthOutOfRange { .. } => FaultClass::Control,
            Self::InstructionLimitExceeded { .. } | Self::CycleLimitExceeded { .. } => {
                FaultClass::Budget
            }
            Self::OperandShape { .. } | Self::TraceExhausted { .. } | Self::EmptyTrace => {
                FaultClass::Invariant
            }
        }
    }

    /// Program counter attached to the fault, when it names one.
    #[must_use]
    pub const fn pc(&self) -> Option<usize> {
        match self {
            Self::MemoryOutOfBounds { pc, .. }
            | Self::DivisionByZero { pc }
            | Self::VectorLengthOutOfRange { pc, .. }
            | Self::OperandShape { pc } => Some(*pc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FaultClass, SimError};
    use crate::memory::AddressSpace;

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        assert_eq!(
            SimError::InstructionOutOfBounds { pc: 9, len: 4 }.class(),
            FaultClass::Fetch
        );
        assert_eq!(
            SimError::MemoryOutOfBounds {
                space: AddressSpace::Vector,
                address: -1,
                size: 8,
                pc: 0,
            }
            .class(),
            FaultClass::Memory
        );
        assert_eq!(SimError::DivisionByZero { pc: 3 }.class(), FaultClass::Arithmetic);
        assert_eq!(
            SimError::VectorLengthOutOfRange {
                pc: 1,
                value: 0,
                max: 64,
            }
            .class(),
            FaultClass::Control
        );
        assert_eq!(
            SimError::CycleLimitExceeded { limit: 10 }.class(),
            FaultClass::Budget
        );
        assert_eq!(SimError::EmptyTrace.class(), FaultClass::Invariant);
    }

    #[test]
    fn diagnostics_name_the_offending_location() {
        let fault = SimError::MemoryOutOfBounds {
            space: AddressSpace::Scalar,
            address: 8192,
            size: 8192,
            pc: 7,
        };
        let text = fault.to_string();
        assert!(text.contains("SDMEM"));
        assert!(text.contains("8192"));
        assert!(text.contains("pc 7"));
        assert_eq!(fault.pc(), Some(7));
    }

    #[test]
    fn budget_faults_carry_no_pc() {
        assert_eq!(SimError::InstructionLimitExceeded { limit: 5 }.pc(), None);
    }
}
