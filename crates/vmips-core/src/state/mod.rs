//! Architectural machine state: register files, mask, and vector length.

/// Vector mask register.
pub mod mask;
/// Scalar and vector register files.
pub mod registers;

pub use mask::VectorMask;
pub use registers::{LanePatch, RegisterFile, RegisterFileKind, RegisterIndex, REGISTER_COUNT};

/// Register-level state owned by the functional engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    /// Scalar register file (`SR0..SR7`).
    pub srf: RegisterFile,
    /// Vector register file (`VR0..VR7`).
    pub vrf: RegisterFile,
    /// Vector mask register.
    pub mask: VectorMask,
    vector_length: usize,
    max_vector_length: usize,
}

impl ArchitecturalState {
    /// Reset state: zeroed registers, all-ones mask, vector length at maximum.
    #[must_use]
    pub fn new(max_vector_length: usize) -> Self {
        Self {
            srf: RegisterFile::scalar(),
            vrf: RegisterFile::vector(max_vector_length),
            mask: VectorMask::new(max_vector_length),
            vector_length: max_vector_length,
            max_vector_length,
        }
    }

    /// Current vector length register.
    #[must_use]
    pub const fn vector_length(&self) -> usize {
        self.vector_length
    }

    /// Maximum vector length of this core.
    #[must_use]
    pub const fn max_vector_length(&self) -> usize {
        self.max_vector_length
    }

    /// Validates a candidate vector length against `1..=max_vector_length`.
    #[must_use]
    pub fn checked_vector_length(&self, value: i32) -> Option<usize> {
        usize::try_from(value)
            .ok()
            .filter(|len| (1..=self.max_vector_length).contains(len))
    }

    /// Sets the vector length register, rejecting out-of-range values.
    ///
    /// Returns `false` and leaves the register untouched on rejection.
    pub fn set_vector_length(&mut self, value: i32) -> bool {
        match self.checked_vector_length(value) {
            Some(len) => {
                self.vector_length = len;
                true
            }
            None => false,
        }
    }
}
