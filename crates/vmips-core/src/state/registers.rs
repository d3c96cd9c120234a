/// Number of architecturally visible registers per file (`SR0..SR7`, `VR0..VR7`).
pub const REGISTER_COUNT: usize = 8;

/// Architectural register index shared by the scalar and vector files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RegisterIndex {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl RegisterIndex {
    /// Ordered list of all register indices.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Converts a register number into an index, rejecting values `>= 8`.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::R0),
            1 => Some(Self::R1),
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            5 => Some(Self::R5),
            6 => Some(Self::R6),
            7 => Some(Self::R7),
            _ => None,
        }
    }

    /// The hardwired zero register.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        matches!(self, Self::R0)
    }
}

/// Which register file a register operand names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterFileKind {
    /// One word per register.
    Scalar,
    /// `max_vector_length` words per register.
    Vector,
}

impl RegisterFileKind {
    /// Assembly operand prefix (`SR` / `VR`).
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Scalar => "SR",
            Self::Vector => "VR",
        }
    }

    /// Dump file stem (`SRF` / `VRF`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "SRF",
            Self::Vector => "VRF",
        }
    }
}

/// Per-lane register write: `Some(value)` replaces a lane, `None` keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanePatch {
    lanes: Vec<Option<i32>>,
}

impl LanePatch {
    /// Patch that writes every value in `values`.
    #[must_use]
    pub fn full(values: &[i32]) -> Self {
        Self {
            lanes: values.iter().copied().map(Some).collect(),
        }
    }

    /// Patch from explicit per-lane entries.
    #[must_use]
    pub const fn from_lanes(lanes: Vec<Option<i32>>) -> Self {
        Self { lanes }
    }

    /// Number of lanes covered (written or kept).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Returns `true` when the patch covers no lanes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Entry for one lane; `None` both for kept lanes and lanes past the end.
    #[must_use]
    pub fn get(&self, lane: usize) -> Option<i32> {
        self.lanes.get(lane).copied().flatten()
    }

    /// Raw per-lane entries.
    #[must_use]
    pub fn lanes(&self) -> &[Option<i32>] {
        &self.lanes
    }

    /// `(lane, value)` pairs for lanes that are written.
    pub fn writes(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.lanes
            .iter()
            .enumerate()
            .filter_map(|(lane, value)| value.map(|value| (lane, value)))
    }
}

/// Register file of eight fixed-width registers with a hardwired zero register.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    kind: RegisterFileKind,
    lanes: usize,
    words: Vec<i32>,
}

impl RegisterFile {
    /// Scalar register file (`SRF`): one word per register.
    #[must_use]
    pub fn scalar() -> Self {
        Self::with_lanes(RegisterFileKind::Scalar, 1)
    }

    /// Vector register file (`VRF`): `max_vector_length` words per register.
    #[must_use]
    pub fn vector(max_vector_length: usize) -> Self {
        Self::with_lanes(RegisterFileKind::Vector, max_vector_length)
    }

    fn with_lanes(kind: RegisterFileKind, lanes: usize) -> Self {
        Self {
            kind,
            lanes,
            words: vec![0; REGISTER_COUNT * lanes],
        }
    }

    /// File kind.
    #[must_use]
    pub const fn kind(&self) -> RegisterFileKind {
        self.kind
    }

    /// Words per register.
    #[must_use]
    pub const fn lanes(&self) -> usize {
        self.lanes
    }

    /// All lanes of one register.
    #[must_use]
    pub fn read(&self, reg: RegisterIndex) -> &[i32] {
        let start = reg.index() * self.lanes;
        &self.words[start..start + self.lanes]
    }

    /// Lane 0 of one register.
    #[must_use]
    pub fn read_scalar(&self, reg: RegisterIndex) -> i32 {
        self.words[reg.index() * self.lanes]
    }

    /// Writes lane 0 of one register. Writes to `R0` are discarded.
    pub fn write_scalar(&mut self, reg: RegisterIndex, value: i32) {
        if reg.is_zero() {
            return;
        }
        self.words[reg.index() * self.lanes] = value;
    }

    /// Applies a lane patch. Writes to `R0` and lanes past the register width
    /// are discarded.
    pub fn write(&mut self, reg: RegisterIndex, patch: &LanePatch) {
        if reg.is_zero() {
            return;
        }
        let start = reg.index() * self.lanes;
        let row = &mut self.words[start..start + self.lanes];
        for (lane, value) in patch.writes() {
            if let Some(slot) = row.get_mut(lane) {
                *slot = value;
            }
        }
    }

    /// Registers in index order, for dumps.
    pub fn rows(&self) -> impl Iterator<Item = &[i32]> + '_ {
        self.words.chunks(self.lanes.max(1))
    }
}
