//! Assembly text decoding and static verification.
//!
//! The decoder turns instruction text into typed [`Instruction`] values and
//! enforces the static contract the engines rely on: every opcode is in the
//! fixed table, operand kinds match the opcode's shape, register numbers lie
//! in `0..8`, and the program contains a `HALT`. The engines never re-check
//! these properties at run time.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::encoding::{Opcode, OperandKind};
use crate::state::{RegisterFileKind, RegisterIndex, REGISTER_COUNT};

/// Default instruction memory capacity in instructions (2^16).
pub const INSTRUCTION_MEMORY_SIZE: usize = 1 << 16;

/// One decoded operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operand {
    /// Scalar register `SRn`.
    Scalar(RegisterIndex),
    /// Vector register `VRn`.
    Vector(RegisterIndex),
    /// Signed immediate.
    Immediate(i32),
    /// Empty slot.
    Absent,
}

impl Operand {
    /// Operand kind, for shape checks.
    #[must_use]
    pub const fn kind(self) -> OperandKind {
        match self {
            Self::Scalar(_) => OperandKind::Scalar,
            Self::Vector(_) => OperandKind::Vector,
            Self::Immediate(_) => OperandKind::Immediate,
            Self::Absent => OperandKind::Absent,
        }
    }

    /// Register file and index named by a register operand.
    #[must_use]
    pub const fn register(self) -> Option<(RegisterFileKind, RegisterIndex)> {
        match self {
            Self::Scalar(reg) => Some((RegisterFileKind::Scalar, reg)),
            Self::Vector(reg) => Some((RegisterFileKind::Vector, reg)),
            Self::Immediate(_) | Self::Absent => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(reg) => write!(f, "SR{}", reg.index()),
            Self::Vector(reg) => write!(f, "VR{}", reg.index()),
            Self::Immediate(value) => write!(f, "{value}"),
            Self::Absent => Ok(()),
        }
    }
}

/// A verified static instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    opcode: Opcode,
    operands: [Operand; 3],
}

impl Instruction {
    /// Builds an instruction, checking operands against the opcode's shape.
    ///
    /// # Errors
    ///
    /// Returns the first mismatching slot as [`DecodeErrorKind::OperandShape`].
    pub fn new(opcode: Opcode, operands: [Operand; 3]) -> Result<Self, DecodeErrorKind> {
        for (position, (operand, expected)) in operands
            .iter()
            .zip(opcode.operand_kinds())
            .enumerate()
        {
            if operand.kind() != expected {
                return Err(DecodeErrorKind::OperandShape {
                    position: position + 1,
                    expected,
                    found: operand.kind(),
                });
            }
        }
        Ok(Self { opcode, operands })
    }

    /// `HALT`.
    #[must_use]
    pub const fn halt() -> Self {
        Self {
            opcode: Opcode::Halt,
            operands: [Operand::Absent; 3],
        }
    }

    /// Opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// All three operand slots, absent slots included.
    #[must_use]
    pub const fn operands(&self) -> &[Operand; 3] {
        &self.operands
    }

    /// First operand.
    #[must_use]
    pub const fn op1(&self) -> Operand {
        self.operands[0]
    }

    /// Second operand.
    #[must_use]
    pub const fn op2(&self) -> Operand {
        self.operands[1]
    }

    /// Third operand.
    #[must_use]
    pub const fn op3(&self) -> Operand {
        self.operands[2]
    }

    /// Register operands in slot order.
    pub fn registers(&self) -> impl Iterator<Item = (RegisterFileKind, RegisterIndex)> + '_ {
        self.operands.iter().filter_map(|operand| operand.register())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for operand in self.operands.iter().filter(|op| **op != Operand::Absent) {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

impl FromStr for Instruction {
    type Err = DecodeErrorKind;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        Decoder::decode_tokens(&tokens)
    }
}

/// Reason a line failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum DecodeErrorKind {
    /// Mnemonic not in the opcode table.
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    /// Wrong number of operands for the opcode.
    #[error("expected {expected} operands, found {found}")]
    OperandCount {
        /// Operands the opcode takes.
        expected: usize,
        /// Operands supplied.
        found: usize,
    },
    /// Operand of the wrong kind in a slot.
    #[error("operand {position} should be {expected:?}, found {found:?}")]
    OperandShape {
        /// 1-based operand slot.
        position: usize,
        /// Kind the opcode requires.
        expected: OperandKind,
        /// Kind supplied.
        found: OperandKind,
    },
    /// Register number outside `0..8`.
    #[error("register `{0}` out of range")]
    RegisterOutOfRange(String),
    /// Token is neither a register nor a decimal immediate.
    #[error("invalid operand `{0}`")]
    InvalidOperand(String),
    /// No `HALT` anywhere in the program.
    #[error("program contains no HALT instruction")]
    MissingHalt,
    /// Program does not fit in instruction memory.
    #[error("program of {len} instructions exceeds instruction memory of {capacity}")]
    ProgramTooLarge {
        /// Number of instructions after comment stripping.
        len: usize,
        /// Instruction memory capacity.
        capacity: usize,
    },
}

/// Verification failure at a 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("line {line}: {kind}")]
pub struct DecodeError {
    /// 1-based source line; the last line for whole-program errors.
    pub line: usize,
    /// What went wrong.
    pub kind: DecodeErrorKind,
}

/// Removes a `#` comment and surrounding whitespace.
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(code, _)| code).trim()
}

/// Stateless line decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes one source line; blank and comment-only lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] tagged with `line`.
    pub fn decode_line(text: &str, line: usize) -> Result<Option<Instruction>, DecodeError> {
        let code = strip_comment(text);
        if code.is_empty() {
            return Ok(None);
        }
        let tokens: Vec<&str> = code.split_whitespace().collect();
        Self::decode_tokens(&tokens)
            .map(Some)
            .map_err(|kind| DecodeError { line, kind })
    }

    /// Decodes a mnemonic followed by its operand tokens.
    ///
    /// # Errors
    ///
    /// Returns the first verification failure.
    pub fn decode_tokens(tokens: &[&str]) -> Result<Instruction, DecodeErrorKind> {
        let Some((mnemonic, rest)) = tokens.split_first() else {
            return Err(DecodeErrorKind::OperandCount {
                expected: 0,
                found: 0,
            });
        };
        let opcode = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| DecodeErrorKind::UnknownOpcode((*mnemonic).to_owned()))?;
        let expected = opcode.operand_count();
        if rest.len() != expected {
            return Err(DecodeErrorKind::OperandCount {
                expected,
                found: rest.len(),
            });
        }
        let mut operands = [Operand::Absent; 3];
        for (slot, token) in operands.iter_mut().zip(rest) {
            *slot = parse_operand(token)?;
        }
        Instruction::new(opcode, operands)
    }
}

fn parse_operand(token: &str) -> Result<Operand, DecodeErrorKind> {
    for kind in [RegisterFileKind::Scalar, RegisterFileKind::Vector] {
        if let Some(number) = token.strip_prefix(kind.prefix()) {
            if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DecodeErrorKind::InvalidOperand(token.to_owned()));
            }
            let reg = number
                .parse::<usize>()
                .ok()
                .filter(|index| *index < REGISTER_COUNT)
                .and_then(RegisterIndex::from_index)
                .ok_or_else(|| DecodeErrorKind::RegisterOutOfRange(token.to_owned()))?;
            return Ok(match kind {
                RegisterFileKind::Scalar => Operand::Scalar(reg),
                RegisterFileKind::Vector => Operand::Vector(reg),
            });
        }
    }
    let digits = token.strip_prefix('-').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeErrorKind::InvalidOperand(token.to_owned()));
    }
    token
        .parse::<i32>()
        .map(Operand::Immediate)
        .map_err(|_| DecodeErrorKind::InvalidOperand(token.to_owned()))
}

/// A verified program: instruction memory contents with source line numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    source_lines: Vec<usize>,
}

impl Program {
    /// Parses and verifies program text against the default instruction
    /// memory capacity.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`] encountered.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        Self::parse_with_capacity(text, INSTRUCTION_MEMORY_SIZE)
    }

    /// Parses and verifies program text, rejecting programs longer than
    /// `capacity` instructions.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`] encountered.
    pub fn parse_with_capacity(text: &str, capacity: usize) -> Result<Self, DecodeError> {
        let mut instructions = Vec::new();
        let mut source_lines = Vec::new();
        let mut last_line = 0;
        for (index, raw) in text.lines().enumerate() {
            last_line = index + 1;
            if let Some(instruction) = Decoder::decode_line(raw, last_line)? {
                instructions.push(instruction);
                source_lines.push(last_line);
            }
        }
        if !instructions
            .iter()
            .any(|instr| instr.opcode() == Opcode::Halt)
        {
            return Err(DecodeError {
                line: last_line,
                kind: DecodeErrorKind::MissingHalt,
            });
        }
        if instructions.len() > capacity {
            return Err(DecodeError {
                line: last_line,
                kind: DecodeErrorKind::ProgramTooLarge {
                    len: instructions.len(),
                    capacity,
                },
            });
        }
        Ok(Self {
            instructions,
            source_lines,
        })
    }

    /// Instruction at `pc`, if it exists.
    #[must_use]
    pub fn fetch(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    /// 1-based source line of the instruction at `pc`.
    #[must_use]
    pub fn source_line(&self, pc: usize) -> Option<usize> {
        self.source_lines.get(pc).copied()
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` for an empty program (never produced by [`Self::parse`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// All instructions in program order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl FromStr for Program {
    type Err = DecodeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}
