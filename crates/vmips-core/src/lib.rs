//! Core of the VMIPS vector processor simulator.
//!
//! Two engines share this crate. The functional engine interprets a verified
//! program and records a dynamic trace; the timing engine replays that trace
//! against a configurable pipeline model to count cycles.

/// Scalar and vector data memories.
pub mod memory;
pub use memory::{
    AddressSpace, DataMemory, MAX_ADDRESS_BITS, SCALAR_ADDRESS_BITS, VECTOR_ADDRESS_BITS,
};

/// Architectural register, mask and vector-length state.
pub mod state;
pub use state::{
    ArchitecturalState, LanePatch, RegisterFile, RegisterFileKind, RegisterIndex, VectorMask,
    REGISTER_COUNT,
};

/// Fault taxonomy shared by both engines.
pub mod fault;
pub use fault::{FaultClass, SimError};

/// Opcode table and execution classes.
pub mod encoding;
pub use encoding::{
    FunctionalUnit, IssueClass, Opcode, OpcodeClass, OperandKind, ShuffleOp, VectorAccessMode,
    OPCODE_TABLE,
};

/// Assembly decoding and static verification.
pub mod decoder;
pub use decoder::{
    strip_comment, DecodeError, DecodeErrorKind, Decoder, Instruction, Operand, Program,
    INSTRUCTION_MEMORY_SIZE,
};

/// Per-run configuration and machine state.
pub mod api;
pub use api::{CoreConfig, CoreState, DEFAULT_INSTRUCTION_LIMIT, DEFAULT_MAX_VECTOR_LENGTH};

/// Functional engine.
pub mod execute;
pub use execute::{
    commit_execution, execute_instruction, AluOp, CompareOp, ExecuteState, FunctionalEngine,
    MaskUpdate, RunSummary, StepOutcome,
};

/// Dynamic instruction trace.
pub mod trace;
pub use trace::{Resolution, TraceLog, TraceParseError, TraceRecord, TraceRecordError};

/// Timing engine.
pub mod timing;
pub use timing::{ConfigError, IssueWindow, TimingConfig, TimingReport, TimingSim};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
