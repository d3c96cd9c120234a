//! Fixed opcode table: mnemonics, operand shapes, and execution classes.

use crate::execute::{AluOp, CompareOp};

/// Kind of value an operand slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OperandKind {
    /// Scalar register (`SRn`).
    Scalar,
    /// Vector register (`VRn`).
    Vector,
    /// Signed decimal immediate.
    Immediate,
    /// Slot must be empty.
    Absent,
}

/// Address generation for vector loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorAccessMode {
    /// `base + i`.
    Unit,
    /// `base + stride * i`, stride from a scalar register.
    Strided,
    /// `base + offset[i]`, offsets from a vector register.
    Indexed,
}

/// Shuffle forms of the register-register shuffle unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ShuffleOp {
    UnpackLo,
    UnpackHi,
    PackLo,
    PackHi,
}

/// Execution class of an opcode, carrying the operator where one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeClass {
    /// `SRd = SRa op SRb`.
    ScalarAlu(AluOp),
    /// `VRd = mask(VRa op VRb|SRb)` over the current vector length.
    VectorAlu {
        /// Element operator.
        op: AluOp,
        /// Second operand is a broadcast scalar register.
        scalar_operand: bool,
    },
    /// `mask = VRa cmp VRb|SRb` over the current vector length.
    VectorCompare {
        /// Element predicate.
        op: CompareOp,
        /// Second operand is a broadcast scalar register.
        scalar_operand: bool,
    },
    /// `CVM`.
    ClearMask,
    /// `POP`.
    PopCount,
    /// `MTCL`.
    MoveToLength,
    /// `MFCL`.
    MoveFromLength,
    /// `LV`, `LVWS`, `LVI`.
    VectorLoad(VectorAccessMode),
    /// `SV`, `SVWS`, `SVI`.
    VectorStore(VectorAccessMode),
    /// `LS`.
    ScalarLoad,
    /// `SS`.
    ScalarStore,
    /// `UNPACKLO`, `UNPACKHI`, `PACKLO`, `PACKHI`.
    Shuffle(ShuffleOp),
    /// `B__ SRa SRb imm`.
    Branch(CompareOp),
    /// `HALT`.
    Halt,
}

/// Vector functional units of the timing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FunctionalUnit {
    /// Add/subtract family, including vector comparisons.
    Add,
    /// Multiply.
    Mul,
    /// Divide.
    Div,
    /// Pack/unpack shuffles.
    Shuffle,
}

impl FunctionalUnit {
    /// All units in dispatch order.
    pub const ALL: [Self; 4] = [Self::Add, Self::Mul, Self::Div, Self::Shuffle];

    /// Dense index for per-unit tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Back-end resource class an instruction is queued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueClass {
    /// Scalar ALU, scalar memory, branch, mask and length control.
    Scalar,
    /// One of the vector functional units.
    VectorCompute(FunctionalUnit),
    /// The vector load/store unit.
    VectorMemory,
}

/// Every opcode of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sra,
    Addvv,
    Subvv,
    Mulvv,
    Divvv,
    Addvs,
    Subvs,
    Mulvs,
    Divvs,
    Seqvv,
    Snevv,
    Sgtvv,
    Sltvv,
    Sgevv,
    Slevv,
    Seqvs,
    Snevs,
    Sgtvs,
    Sltvs,
    Sgevs,
    Slevs,
    Cvm,
    Pop,
    Mtcl,
    Mfcl,
    Lv,
    Sv,
    Lvws,
    Svws,
    Lvi,
    Svi,
    Ls,
    Ss,
    Beq,
    Bne,
    Bgt,
    Blt,
    Bge,
    Ble,
    Unpacklo,
    Unpackhi,
    Packlo,
    Packhi,
    Halt,
}

use OperandKind::{Absent as N, Immediate as I, Scalar as S, Vector as V};

/// Single source-of-truth table of mnemonics and operand shapes.
pub const OPCODE_TABLE: &[(Opcode, &str, [OperandKind; 3])] = &[
    (Opcode::Add, "ADD", [S, S, S]),
    (Opcode::Sub, "SUB", [S, S, S]),
    (Opcode::Mul, "MUL", [S, S, S]),
    (Opcode::Div, "DIV", [S, S, S]),
    (Opcode::And, "AND", [S, S, S]),
    (Opcode::Or, "OR", [S, S, S]),
    (Opcode::Xor, "XOR", [S, S, S]),
    (Opcode::Sll, "SLL", [S, S, S]),
    (Opcode::Srl, "SRL", [S, S, S]),
    (Opcode::Sra, "SRA", [S, S, S]),
    (Opcode::Addvv, "ADDVV", [V, V, V]),
    (Opcode::Subvv, "SUBVV", [V, V, V]),
    (Opcode::Mulvv, "MULVV", [V, V, V]),
    (Opcode::Divvv, "DIVVV", [V, V, V]),
    (Opcode::Addvs, "ADDVS", [V, V, S]),
    (Opcode::Subvs, "SUBVS", [V, V, S]),
    (Opcode::Mulvs, "MULVS", [V, V, S]),
    (Opcode::Divvs, "DIVVS", [V, V, S]),
    (Opcode::Seqvv, "SEQVV", [V, V, N]),
    (Opcode::Snevv, "SNEVV", [V, V, N]),
    (Opcode::Sgtvv, "SGTVV", [V, V, N]),
    (Opcode::Sltvv, "SLTVV", [V, V, N]),
    (Opcode::Sgevv, "SGEVV", [V, V, N]),
    (Opcode::Slevv, "SLEVV", [V, V, N]),
    (Opcode::Seqvs, "SEQVS", [V, S, N]),
    (Opcode::Snevs, "SNEVS", [V, S, N]),
    (Opcode::Sgtvs, "SGTVS", [V, S, N]),
    (Opcode::Sltvs, "SLTVS", [V, S, N]),
    (Opcode::Sgevs, "SGEVS", [V, S, N]),
    (Opcode::Slevs, "SLEVS", [V, S, N]),
    (Opcode::Cvm, "CVM", [N, N, N]),
    (Opcode::Pop, "POP", [S, N, N]),
    (Opcode::Mtcl, "MTCL", [S, N, N]),
    (Opcode::Mfcl, "MFCL", [S, N, N]),
    (Opcode::Lv, "LV", [V, S, N]),
    (Opcode::Sv, "SV", [V, S, N]),
    (Opcode::Lvws, "LVWS", [V, S, S]),
    (Opcode::Svws, "SVWS", [V, S, S]),
    (Opcode::Lvi, "LVI", [V, S, V]),
    (Opcode::Svi, "SVI", [V, S, V]),
    (Opcode::Ls, "LS", [S, S, I]),
    (Opcode::Ss, "SS", [S, S, I]),
    (Opcode::Beq, "BEQ", [S, S, I]),
    (Opcode::Bne, "BNE", [S, S, I]),
    (Opcode::Bgt, "BGT", [S, S, I]),
    (Opcode::Blt, "BLT", [S, S, I]),
    (Opcode::Bge, "BGE", [S, S, I]),
    (Opcode::Ble, "BLE", [S, S, I]),
    (Opcode::Unpacklo, "UNPACKLO", [V, V, V]),
    (Opcode::Unpackhi, "UNPACKHI", [V, V, V]),
    (Opcode::Packlo, "PACKLO", [V, V, V]),
    (Opcode::Packhi, "PACKHI", [V, V, V]),
    (Opcode::Halt, "HALT", [N, N, N]),
];

impl Opcode {
    /// Resolves an upper-case mnemonic.
    #[must_use]
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find_map(|(opcode, name, _)| (*name == mnemonic).then_some(*opcode))
    }

    /// Canonical mnemonic.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        OPCODE_TABLE
            .iter()
            .find_map(|(opcode, name, _)| (*opcode == self).then_some(*name))
            .unwrap_or("?")
    }

    /// Operand shape required by the verifier.
    #[must_use]
    pub fn operand_kinds(self) -> [OperandKind; 3] {
        OPCODE_TABLE
            .iter()
            .find_map(|(opcode, _, kinds)| (*opcode == self).then_some(*kinds))
            .unwrap_or([N, N, N])
    }

    /// Number of non-absent operands.
    #[must_use]
    pub fn operand_count(self) -> usize {
        self.operand_kinds()
            .iter()
            .filter(|kind| **kind != N)
            .count()
    }

    /// Instructions with a vector operand carry the vector length in the trace.
    #[must_use]
    pub fn is_vector(self) -> bool {
        self.operand_kinds().contains(&V)
    }

    /// Execution class.
    #[must_use]
    pub const fn class(self) -> OpcodeClass {
        use OpcodeClass as C;
        match self {
            Self::Add => C::ScalarAlu(AluOp::Add),
            Self::Sub => C::ScalarAlu(AluOp::Sub),
            Self::Mul => C::ScalarAlu(AluOp::Mul),
            Self::Div => C::ScalarAlu(AluOp::Div),
            Self::And => C::ScalarAlu(AluOp::And),
            Self::Or => C::ScalarAlu(AluOp::Or),
            Self::Xor => C::ScalarAlu(AluOp::Xor),
            Self::Sll => C::ScalarAlu(AluOp::Sll),
            Self::Srl => C::ScalarAlu(AluOp::Srl),
            Self::Sra => C::ScalarAlu(AluOp::Sra),
            Self::Addvv => vector_alu(AluOp::Add, false),
            Self::Subvv => vector_alu(AluOp::Sub, false),
            Self::Mulvv => vector_alu(AluOp::Mul, false),
            Self::Divvv => vector_alu(AluOp::Div, false),
            Self::Addvs => vector_alu(AluOp::Add, true),
            Self::Subvs => vector_alu(AluOp::Sub, true),
            Self::Mulvs => vector_alu(AluOp::Mul, true),
            Self::Divvs => vector_alu(AluOp::Div, true),
            Self::Seqvv => vector_compare(CompareOp::Eq, false),
            Self::Snevv => vector_compare(CompareOp::Ne, false),
            Self::Sgtvv => vector_compare(CompareOp::Gt, false),
            Self::Sltvv => vector_compare(CompareOp::Lt, false),
            Self::Sgevv => vector_compare(CompareOp::Ge, false),
            Self::Slevv => vector_compare(CompareOp::Le, false),
            Self::Seqvs => vector_compare(CompareOp::Eq, true),
            Self::Snevs => vector_compare(CompareOp::Ne, true),
            Self::Sgtvs => vector_compare(CompareOp::Gt, true),
            Self::Sltvs => vector_compare(CompareOp::Lt, true),
            Self::Sgevs => vector_compare(CompareOp::Ge, true),
            Self::Slevs => vector_compare(CompareOp::Le, true),
            Self::Cvm => C::ClearMask,
            Self::Pop => C::PopCount,
            Self::Mtcl => C::MoveToLength,
            Self::Mfcl => C::MoveFromLength,
            Self::Lv => C::VectorLoad(VectorAccessMode::Unit),
            Self::Lvws => C::VectorLoad(VectorAccessMode::Strided),
            Self::Lvi => C::VectorLoad(VectorAccessMode::Indexed),
            Self::Sv => C::VectorStore(VectorAccessMode::Unit),
            Self::Svws => C::VectorStore(VectorAccessMode::Strided),
            Self::Svi => C::VectorStore(VectorAccessMode::Indexed),
            Self::Ls => C::ScalarLoad,
            Self::Ss => C::ScalarStore,
            Self::Beq => C::Branch(CompareOp::Eq),
            Self::Bne => C::Branch(CompareOp::Ne),
            Self::Bgt => C::Branch(CompareOp::Gt),
            Self::Blt => C::Branch(CompareOp::Lt),
            Self::Bge => C::Branch(CompareOp::Ge),
            Self::Ble => C::Branch(CompareOp::Le),
            Self::Unpacklo => C::Shuffle(ShuffleOp::UnpackLo),
            Self::Unpackhi => C::Shuffle(ShuffleOp::UnpackHi),
            Self::Packlo => C::Shuffle(ShuffleOp::PackLo),
            Self::Packhi => C::Shuffle(ShuffleOp::PackHi),
            Self::Halt => C::Halt,
        }
    }

    /// Back-end queue this opcode is routed to by decode.
    #[must_use]
    pub const fn issue_class(self) -> IssueClass {
        match self.class() {
            OpcodeClass::VectorLoad(_) | OpcodeClass::VectorStore(_) => IssueClass::VectorMemory,
            OpcodeClass::VectorAlu { op, .. } => IssueClass::VectorCompute(match op {
                AluOp::Mul => FunctionalUnit::Mul,
                AluOp::Div => FunctionalUnit::Div,
                _ => FunctionalUnit::Add,
            }),
            OpcodeClass::VectorCompare { .. } => IssueClass::VectorCompute(FunctionalUnit::Add),
            OpcodeClass::Shuffle(_) => IssueClass::VectorCompute(FunctionalUnit::Shuffle),
            _ => IssueClass::Scalar,
        }
    }

    /// Instructions that overwrite the vector mask register.
    #[must_use]
    pub const fn writes_mask(self) -> bool {
        matches!(
            self.class(),
            OpcodeClass::ClearMask | OpcodeClass::VectorCompare { .. }
        )
    }

    /// Instructions whose effect depends on the vector mask register.
    #[must_use]
    pub const fn reads_mask(self) -> bool {
        matches!(
            self.class(),
            OpcodeClass::PopCount
                | OpcodeClass::VectorAlu { .. }
                | OpcodeClass::VectorLoad(_)
                | OpcodeClass::VectorStore(_)
        )
    }

    /// Instructions that overwrite the vector length register.
    #[must_use]
    pub const fn writes_vector_length(self) -> bool {
        matches!(self.class(), OpcodeClass::MoveToLength)
    }

    /// Instructions whose effect depends on the vector length register.
    #[must_use]
    pub const fn reads_vector_length(self) -> bool {
        matches!(
            self.class(),
            OpcodeClass::MoveFromLength
                | OpcodeClass::VectorAlu { .. }
                | OpcodeClass::VectorCompare { .. }
                | OpcodeClass::VectorLoad(_)
                | OpcodeClass::VectorStore(_)
                | OpcodeClass::Shuffle(_)
        )
    }
}

const fn vector_alu(op: AluOp, scalar_operand: bool) -> OpcodeClass {
    OpcodeClass::VectorAlu { op, scalar_operand }
}

const fn vector_compare(op: CompareOp, scalar_operand: bool) -> OpcodeClass {
    OpcodeClass::VectorCompare { op, scalar_operand }
}
