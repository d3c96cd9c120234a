//! Dynamic instruction trace: the only channel from the functional engine to
//! the timing engine.
//!
//! One record per executed instruction, in execution order. Text form, one
//! record per line:
//!
//! ```text
//! ADDVV VR1 VR2 VR3 vl=4
//! LV VR1 SR1 vl=4 @ 0,1,2,3
//! LS SR1 SR2 3 @ 103
//! BEQ SR1 SR2 5 -> 12
//! HALT
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::decoder::{DecodeErrorKind, Decoder, Instruction};
use crate::encoding::{Opcode, OpcodeClass};
use crate::SimError;

/// Values resolved by the functional engine and never recomputed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Resolution {
    /// Nothing to resolve.
    #[default]
    None,
    /// Effective word addresses, one per lane (or one for scalar accesses).
    Addresses(Vec<usize>),
    /// Next program counter chosen by a branch.
    Target(i64),
}

/// One executed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TraceRecord {
    instruction: Instruction,
    vector_length: Option<usize>,
    resolution: Resolution,
}

impl TraceRecord {
    /// Record as appended at fetch, before amendment.
    #[must_use]
    pub const fn new(instruction: Instruction, vector_length: Option<usize>) -> Self {
        Self {
            instruction,
            vector_length,
            resolution: Resolution::None,
        }
    }

    /// Record with its resolution already known.
    #[must_use]
    pub const fn resolved(
        instruction: Instruction,
        vector_length: Option<usize>,
        resolution: Resolution,
    ) -> Self {
        Self {
            instruction,
            vector_length,
            resolution,
        }
    }

    /// Static instruction.
    #[must_use]
    pub const fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    /// Vector length in effect when a vector instruction executed.
    #[must_use]
    pub const fn vector_length(&self) -> Option<usize> {
        self.vector_length
    }

    /// Resolved addresses or branch target.
    #[must_use]
    pub const fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Resolved addresses; empty unless this is a memory access.
    #[must_use]
    pub fn addresses(&self) -> &[usize] {
        match &self.resolution {
            Resolution::Addresses(addresses) => addresses,
            Resolution::None | Resolution::Target(_) => &[],
        }
    }

    /// Whether this is the terminal `HALT` record.
    #[must_use]
    pub fn is_halt(&self) -> bool {
        self.instruction.opcode() == Opcode::Halt
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instruction)?;
        if let Some(vl) = self.vector_length {
            write!(f, " vl={vl}")?;
        }
        match &self.resolution {
            Resolution::None => Ok(()),
            Resolution::Addresses(addresses) => {
                f.write_str(" @ ")?;
                for (i, address) in addresses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{address}")?;
                }
                Ok(())
            }
            Resolution::Target(target) => write!(f, " -> {target}"),
        }
    }
}

impl FromStr for TraceRecord {
    type Err = TraceRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (head, resolution) = if let Some((head, addresses)) = line.split_once(" @ ") {
            let addresses = addresses
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| {
                    item.parse::<usize>()
                        .map_err(|_| TraceRecordError::InvalidAddress(item.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            (head, Resolution::Addresses(addresses))
        } else if let Some((head, target)) = line.split_once(" -> ") {
            let target = target.trim();
            let target = target
                .parse::<i64>()
                .map_err(|_| TraceRecordError::InvalidTarget(target.to_string()))?;
            (head, Resolution::Target(target))
        } else {
            (line, Resolution::None)
        };

        let mut tokens: Vec<&str> = head.split_whitespace().collect();
        let vector_length = match tokens.last().and_then(|last| last.strip_prefix("vl=")) {
            Some(value) => {
                let vl = value
                    .parse::<usize>()
                    .map_err(|_| TraceRecordError::InvalidVectorLength(value.to_string()))?;
                tokens.pop();
                Some(vl)
            }
            None => None,
        };
        let instruction = Decoder::decode_tokens(&tokens)?;
        let opcode = instruction.opcode();
        if opcode.is_vector() != vector_length.is_some() {
            return Err(TraceRecordError::VectorLengthMismatch(opcode.mnemonic()));
        }
        check_resolution(opcode, vector_length, &resolution)?;
        Ok(Self::resolved(instruction, vector_length, resolution))
    }
}

/// Memory records carry one address per lane, branches carry their target,
/// and nothing else carries either.
fn check_resolution(
    opcode: Opcode,
    vector_length: Option<usize>,
    resolution: &Resolution,
) -> Result<(), TraceRecordError> {
    let mnemonic = opcode.mnemonic();
    let expected_addresses = match opcode.class() {
        OpcodeClass::VectorLoad(_) | OpcodeClass::VectorStore(_) => vector_length,
        OpcodeClass::ScalarLoad | OpcodeClass::ScalarStore => Some(1),
        OpcodeClass::Branch(_) => {
            return match resolution {
                Resolution::Target(_) => Ok(()),
                _ => Err(TraceRecordError::MissingTarget(mnemonic)),
            };
        }
        _ => None,
    };
    match (expected_addresses, resolution) {
        (None, Resolution::None) => Ok(()),
        (None, _) => Err(TraceRecordError::UnexpectedResolution(mnemonic)),
        (Some(expected), Resolution::Addresses(addresses)) if addresses.len() == expected => Ok(()),
        (Some(expected), resolution) => Err(TraceRecordError::AddressCount {
            mnemonic,
            expected,
            found: match resolution {
                Resolution::Addresses(addresses) => addresses.len(),
                Resolution::None | Resolution::Target(_) => 0,
            },
        }),
    }
}

/// Reason one trace line is not a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceRecordError {
    /// Instruction part failed the opcode/operand checks.
    #[error(transparent)]
    Decode(#[from] DecodeErrorKind),
    /// Address list entry is not an unsigned integer.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    /// Branch target is not an integer.
    #[error("invalid branch target `{0}`")]
    InvalidTarget(String),
    /// `vl=` annotation is not an unsigned integer.
    #[error("invalid vector length `{0}`")]
    InvalidVectorLength(String),
    /// `vl=` present on a scalar record or absent on a vector one.
    #[error("vector length annotation does not match `{0}`")]
    VectorLengthMismatch(&'static str),
    /// Memory record with the wrong number of resolved addresses.
    #[error("`{mnemonic}` needs {expected} address(es), found {found}")]
    AddressCount {
        /// Opcode mnemonic.
        mnemonic: &'static str,
        /// One per lane, or one for a scalar access.
        expected: usize,
        /// Addresses on the line.
        found: usize,
    },
    /// Branch record without `-> target`.
    #[error("`{0}` needs a resolved branch target")]
    MissingTarget(&'static str),
    /// Addresses or a target on a record that has neither.
    #[error("`{0}` takes no resolved addresses or target")]
    UnexpectedResolution(&'static str),
}

/// Trace text that could not be parsed back into records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trace line {line}: {reason}")]
pub struct TraceParseError {
    /// 1-based line number.
    pub line: usize,
    /// What was wrong with the line.
    pub reason: TraceRecordError,
}

/// Ordered, append-and-amend record log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TraceLog {
    records: Vec<TraceRecord>,
}

impl TraceLog {
    /// Empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends a freshly fetched record.
    pub fn append(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    /// Attaches resolved addresses or a branch target to the newest record.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptyTrace`] when no record has been appended.
    pub fn amend_last(&mut self, resolution: Resolution) -> Result<(), SimError> {
        let last = self.records.last_mut().ok_or(SimError::EmptyTrace)?;
        last.resolution = resolution;
        Ok(())
    }

    /// Records in execution order.
    #[must_use]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Consumes the log.
    #[must_use]
    pub fn into_records(self) -> Vec<TraceRecord> {
        self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parses trace text; blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first malformed line.
    pub fn parse(text: &str) -> Result<Self, TraceParseError> {
        let records = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                line.trim().parse::<TraceRecord>().map_err(|reason| TraceParseError {
                    line: index + 1,
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    /// Text form, one record per line with a trailing newline.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TraceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

impl FromStr for TraceLog {
    type Err = TraceParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl From<Vec<TraceRecord>> for TraceLog {
    fn from(records: Vec<TraceRecord>) -> Self {
        Self { records }
    }
}
