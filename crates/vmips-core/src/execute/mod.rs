//! Functional execution pipeline.
//!
//! Each instruction runs in two phases. [`execute_instruction`] reads
//! operands, resolves addresses, validates every access, and collects the
//! side effects in an [`ExecuteState`]. [`commit_execution`] then applies
//! them. A faulting instruction returns before commit and leaves the machine
//! untouched.

mod alu;
mod shuffle;

pub use alu::{AluOp, CompareOp};
pub use shuffle::shuffle;

use crate::decoder::{Instruction, Operand, Program};
use crate::encoding::{OpcodeClass, VectorAccessMode};
use crate::memory::{AddressSpace, DataMemory};
use crate::state::{LanePatch, RegisterIndex};
use crate::trace::{Resolution, TraceLog, TraceRecord};
use crate::{CoreConfig, CoreState, SimError};

/// Pending change to the vector mask register.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MaskUpdate {
    /// Mask unchanged.
    #[default]
    Keep,
    /// Leading lanes overwritten by a comparison result.
    Overwrite(Vec<bool>),
    /// Reset to all ones.
    Clear,
}

/// Side effects collected for one instruction, applied by [`commit_execution`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecuteState {
    /// Scalar register write.
    pub scalar_write: Option<(RegisterIndex, i32)>,
    /// Vector register write.
    pub vector_write: Option<(RegisterIndex, LanePatch)>,
    /// Word stores, already bounds-checked.
    pub memory_writes: Vec<(AddressSpace, usize, i32)>,
    /// Mask register change.
    pub mask_update: MaskUpdate,
    /// New vector length from `MTCL`.
    pub vector_length: Option<usize>,
    /// Program counter of the next instruction.
    pub next_pc: i64,
    /// Addresses or branch target for the trace.
    pub resolution: Resolution,
}

impl ExecuteState {
    fn fall_through(pc: usize) -> Self {
        Self {
            next_pc: as_i64(pc) + 1,
            ..Self::default()
        }
    }
}

fn as_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn scalar(operand: Operand, pc: usize) -> Result<RegisterIndex, SimError> {
    match operand {
        Operand::Scalar(reg) => Ok(reg),
        _ => Err(SimError::OperandShape { pc }),
    }
}

fn vector(operand: Operand, pc: usize) -> Result<RegisterIndex, SimError> {
    match operand {
        Operand::Vector(reg) => Ok(reg),
        _ => Err(SimError::OperandShape { pc }),
    }
}

fn immediate(operand: Operand, pc: usize) -> Result<i32, SimError> {
    match operand {
        Operand::Immediate(value) => Ok(value),
        _ => Err(SimError::OperandShape { pc }),
    }
}

/// Executes one instruction against a read-only view of the machine.
///
/// `HALT` produces an empty state with `next_pc == pc`; the engine stops on
/// it before calling this function.
///
/// # Errors
///
/// Returns the fault raised by the instruction; nothing has been written.
#[allow(clippy::too_many_lines)]
pub fn execute_instruction(
    instr: &Instruction,
    pc: usize,
    state: &CoreState,
) -> Result<ExecuteState, SimError> {
    let arch = &state.arch;
    let vl = arch.vector_length();
    let mut exec = ExecuteState::fall_through(pc);

    match instr.opcode().class() {
        OpcodeClass::ScalarAlu(op) => {
            let lhs = arch.srf.read_scalar(scalar(instr.op2(), pc)?);
            let rhs = arch.srf.read_scalar(scalar(instr.op3(), pc)?);
            let value = op.apply(lhs, rhs).ok_or(SimError::DivisionByZero { pc })?;
            exec.scalar_write = Some((scalar(instr.op1(), pc)?, value));
        }
        OpcodeClass::VectorAlu { op, scalar_operand } => {
            let lhs = arch.vrf.read(vector(instr.op2(), pc)?);
            let rhs = second_source(instr.op3(), scalar_operand, state, pc)?;
            let mut results = Vec::with_capacity(vl);
            for lane in 0..vl {
                let value = match op.apply(lhs[lane], rhs.lane(lane)) {
                    Some(value) => value,
                    None if arch.mask.is_set(lane) => {
                        return Err(SimError::DivisionByZero { pc });
                    }
                    None => 0,
                };
                results.push(value);
            }
            exec.vector_write = Some((vector(instr.op1(), pc)?, arch.mask.apply(&results)));
        }
        OpcodeClass::VectorCompare { op, scalar_operand } => {
            let lhs = arch.vrf.read(vector(instr.op1(), pc)?);
            let rhs = second_source(instr.op2(), scalar_operand, state, pc)?;
            let bits = (0..vl).map(|lane| op.holds(lhs[lane], rhs.lane(lane))).collect();
            exec.mask_update = MaskUpdate::Overwrite(bits);
        }
        OpcodeClass::ClearMask => exec.mask_update = MaskUpdate::Clear,
        OpcodeClass::PopCount => {
            let count = i32::try_from(arch.mask.count_ones()).unwrap_or(i32::MAX);
            exec.scalar_write = Some((scalar(instr.op1(), pc)?, count));
        }
        OpcodeClass::MoveToLength => {
            let value = arch.srf.read_scalar(scalar(instr.op1(), pc)?);
            let len = arch
                .checked_vector_length(value)
                .ok_or(SimError::VectorLengthOutOfRange {
                    pc,
                    value,
                    max: arch.max_vector_length(),
                })?;
            exec.vector_length = Some(len);
        }
        OpcodeClass::MoveFromLength => {
            let len = i32::try_from(vl).unwrap_or(i32::MAX);
            exec.scalar_write = Some((scalar(instr.op1(), pc)?, len));
        }
        OpcodeClass::VectorLoad(mode) => {
            let addresses = vector_addresses(instr, mode, state, pc)?;
            let values: Vec<i32> = addresses
                .iter()
                .map(|address| state.vector_memory.read(*address))
                .collect();
            exec.vector_write = Some((vector(instr.op1(), pc)?, arch.mask.apply(&values)));
            exec.resolution = Resolution::Addresses(addresses);
        }
        OpcodeClass::VectorStore(mode) => {
            let addresses = vector_addresses(instr, mode, state, pc)?;
            let source = arch.vrf.read(vector(instr.op1(), pc)?);
            exec.memory_writes = addresses
                .iter()
                .enumerate()
                .filter(|(lane, _)| arch.mask.is_set(*lane))
                .map(|(lane, address)| (AddressSpace::Vector, *address, source[lane]))
                .collect();
            exec.resolution = Resolution::Addresses(addresses);
        }
        OpcodeClass::ScalarLoad => {
            let address = scalar_address(instr, state, pc)?;
            let value = state.scalar_memory.read(address);
            exec.scalar_write = Some((scalar(instr.op1(), pc)?, value));
            exec.resolution = Resolution::Addresses(vec![address]);
        }
        OpcodeClass::ScalarStore => {
            let address = scalar_address(instr, state, pc)?;
            let value = arch.srf.read_scalar(scalar(instr.op1(), pc)?);
            exec.memory_writes = vec![(AddressSpace::Scalar, address, value)];
            exec.resolution = Resolution::Addresses(vec![address]);
        }
        OpcodeClass::Shuffle(op) => {
            let a = arch.vrf.read(vector(instr.op2(), pc)?).to_vec();
            let b = arch.vrf.read(vector(instr.op3(), pc)?).to_vec();
            let result = shuffle(op, &a, &b, vl, arch.max_vector_length());
            exec.vector_write = Some((vector(instr.op1(), pc)?, LanePatch::full(&result)));
        }
        OpcodeClass::Branch(op) => {
            let lhs = arch.srf.read_scalar(scalar(instr.op1(), pc)?);
            let rhs = arch.srf.read_scalar(scalar(instr.op2(), pc)?);
            if op.holds(lhs, rhs) {
                exec.next_pc = as_i64(pc) + i64::from(immediate(instr.op3(), pc)?);
            }
            exec.resolution = Resolution::Target(exec.next_pc);
        }
        OpcodeClass::Halt => exec.next_pc = as_i64(pc),
    }

    Ok(exec)
}

/// Second source of a vector ALU or compare: a vector register or a
/// broadcast scalar.
enum SecondSource<'a> {
    Vector(&'a [i32]),
    Broadcast(i32),
}

impl SecondSource<'_> {
    fn lane(&self, lane: usize) -> i32 {
        match self {
            Self::Vector(values) => values[lane],
            Self::Broadcast(value) => *value,
        }
    }
}

fn second_source(
    operand: Operand,
    scalar_operand: bool,
    state: &CoreState,
    pc: usize,
) -> Result<SecondSource<'_>, SimError> {
    if scalar_operand {
        Ok(SecondSource::Broadcast(
            state.arch.srf.read_scalar(scalar(operand, pc)?),
        ))
    } else {
        Ok(SecondSource::Vector(state.arch.vrf.read(vector(operand, pc)?)))
    }
}

/// Resolves one address per lane over the current vector length. Every
/// lane is checked, including lanes the mask disables.
fn vector_addresses(
    instr: &Instruction,
    mode: VectorAccessMode,
    state: &CoreState,
    pc: usize,
) -> Result<Vec<usize>, SimError> {
    let arch = &state.arch;
    let base = i64::from(arch.srf.read_scalar(scalar(instr.op2(), pc)?));
    let vl = arch.vector_length();
    let offsets: Vec<i64> = match mode {
        VectorAccessMode::Unit => (0..vl).map(as_i64).collect(),
        VectorAccessMode::Strided => {
            let stride = i64::from(arch.srf.read_scalar(scalar(instr.op3(), pc)?));
            (0..vl).map(|lane| stride * as_i64(lane)).collect()
        }
        VectorAccessMode::Indexed => arch.vrf.read(vector(instr.op3(), pc)?)[..vl]
            .iter()
            .map(|offset| i64::from(*offset))
            .collect(),
    };
    offsets
        .into_iter()
        .map(|offset| state.vector_memory.resolve_at(base + offset, pc))
        .collect()
}

fn scalar_address(instr: &Instruction, state: &CoreState, pc: usize) -> Result<usize, SimError> {
    let base = i64::from(state.arch.srf.read_scalar(scalar(instr.op2(), pc)?));
    let offset = i64::from(immediate(instr.op3(), pc)?);
    state.scalar_memory.resolve_at(base + offset, pc)
}

/// Applies the side effects of a successfully executed instruction.
pub fn commit_execution(state: &mut CoreState, exec: &ExecuteState) {
    if let Some((reg, value)) = exec.scalar_write {
        state.arch.srf.write_scalar(reg, value);
    }
    if let Some((reg, patch)) = &exec.vector_write {
        state.arch.vrf.write(*reg, patch);
    }
    for (space, address, value) in &exec.memory_writes {
        memory_mut(state, *space).write(*address, *value);
    }
    match &exec.mask_update {
        MaskUpdate::Keep => {}
        MaskUpdate::Overwrite(bits) => state.arch.mask.overwrite(bits),
        MaskUpdate::Clear => state.arch.mask.clear(),
    }
    if let Some(len) = exec.vector_length {
        if let Ok(value) = i32::try_from(len) {
            state.arch.set_vector_length(value);
        }
    }
}

fn memory_mut(state: &mut CoreState, space: AddressSpace) -> &mut DataMemory {
    match space {
        AddressSpace::Scalar => &mut state.scalar_memory,
        AddressSpace::Vector => &mut state.vector_memory,
    }
}

/// Result of a single [`FunctionalEngine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// One instruction executed and committed.
    Retired,
    /// `HALT` fetched; the run is over.
    Halted,
}

/// Totals for a completed functional run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunSummary {
    /// Instructions executed, `HALT` excluded.
    pub retired: u64,
    /// Trace records written, `HALT` included.
    pub trace_len: usize,
}

/// Interpreter for one verified program. Owns the machine state and the
/// trace it produces.
#[derive(Debug, Clone)]
pub struct FunctionalEngine {
    program: Program,
    state: CoreState,
    trace: TraceLog,
    pc: i64,
    retired: u64,
    instruction_limit: u64,
    halted: bool,
}

impl FunctionalEngine {
    /// Engine positioned at pc 0 over `state`.
    #[must_use]
    pub const fn new(program: Program, state: CoreState, config: &CoreConfig) -> Self {
        Self {
            program,
            state,
            trace: TraceLog::new(),
            pc: 0,
            retired: 0,
            instruction_limit: config.instruction_limit,
            halted: false,
        }
    }

    /// Fetches, traces, executes and commits one instruction.
    ///
    /// # Errors
    ///
    /// Returns the instruction's fault, a fetch outside the program, or
    /// [`SimError::InstructionLimitExceeded`]. A faulting instruction's record
    /// stays in the trace, unamended; an instruction refused by the limit is
    /// never traced.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        if self.halted {
            return Ok(StepOutcome::Halted);
        }
        let instr = usize::try_from(self.pc)
            .ok()
            .and_then(|pc| self.program.fetch(pc).map(|instr| (pc, *instr)));
        let Some((pc, instr)) = instr else {
            return Err(SimError::InstructionOutOfBounds {
                pc: self.pc,
                len: self.program.len(),
            });
        };

        let is_halt = matches!(instr.opcode().class(), OpcodeClass::Halt);
        if !is_halt && self.retired >= self.instruction_limit {
            return Err(SimError::InstructionLimitExceeded {
                limit: self.instruction_limit,
            });
        }

        let vector_length = instr
            .opcode()
            .is_vector()
            .then(|| self.state.arch.vector_length());
        self.trace.append(TraceRecord::new(instr, vector_length));

        if is_halt {
            log::debug!("pc {pc}: {instr}");
            self.halted = true;
            return Ok(StepOutcome::Halted);
        }

        let exec = execute_instruction(&instr, pc, &self.state)?;
        self.trace.amend_last(exec.resolution.clone())?;
        commit_execution(&mut self.state, &exec);
        log::debug!("pc {pc}: {instr} -> next pc {}", exec.next_pc);

        self.pc = exec.next_pc;
        self.retired += 1;
        Ok(StepOutcome::Retired)
    }

    /// Steps until `HALT`.
    ///
    /// # Errors
    ///
    /// Returns the first fault; state reflects every instruction before it.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        while self.step()? == StepOutcome::Retired {}
        let summary = self.summary();
        log::info!(
            "functional run halted after {} instructions ({} trace records)",
            summary.retired,
            summary.trace_len
        );
        Ok(summary)
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            retired: self.retired,
            trace_len: self.trace.len(),
        }
    }

    /// Current machine state.
    #[must_use]
    pub const fn state(&self) -> &CoreState {
        &self.state
    }

    /// Mutable machine state, for seeding registers before a run.
    pub fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }

    /// Trace so far.
    #[must_use]
    pub const fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// Program counter of the next fetch.
    #[must_use]
    pub const fn pc(&self) -> i64 {
        self.pc
    }

    /// Whether `HALT` has been fetched.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Final state and trace.
    #[must_use]
    pub fn into_parts(self) -> (CoreState, TraceLog) {
        (self.state, self.trace)
    }
}
