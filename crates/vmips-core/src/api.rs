//! Host-facing configuration and state containers for one simulation run.

use crate::decoder::INSTRUCTION_MEMORY_SIZE;
use crate::memory::{AddressSpace, DataMemory, SCALAR_ADDRESS_BITS, VECTOR_ADDRESS_BITS};
use crate::{ArchitecturalState, SimError};

/// Default maximum vector length (`MVL`).
pub const DEFAULT_MAX_VECTOR_LENGTH: usize = 64;

/// Default ceiling on retired instructions for one functional run.
pub const DEFAULT_INSTRUCTION_LIMIT: u64 = 10_000_000;

/// Immutable per-run configuration of the functional core.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Lanes per vector register and upper bound of the vector length register.
    pub max_vector_length: usize,
    /// Scalar data memory holds `2^scalar_address_bits` words.
    pub scalar_address_bits: u32,
    /// Vector data memory holds `2^vector_address_bits` words.
    pub vector_address_bits: u32,
    /// Retired-instruction ceiling before a run is abandoned.
    pub instruction_limit: u64,
    /// Instruction memory capacity in instructions.
    pub instruction_memory_size: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_vector_length: DEFAULT_MAX_VECTOR_LENGTH,
            scalar_address_bits: SCALAR_ADDRESS_BITS,
            vector_address_bits: VECTOR_ADDRESS_BITS,
            instruction_limit: DEFAULT_INSTRUCTION_LIMIT,
            instruction_memory_size: INSTRUCTION_MEMORY_SIZE,
        }
    }
}

/// Complete mutable state of one functional run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreState {
    /// Register files, mask and vector length.
    pub arch: ArchitecturalState,
    /// Scalar data memory.
    pub scalar_memory: DataMemory,
    /// Vector data memory.
    pub vector_memory: DataMemory,
}

impl CoreState {
    /// Reset state with zeroed memories.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::AddressWidthUnsupported`] when either configured
    /// address width is too wide to allocate.
    pub fn new(config: &CoreConfig) -> Result<Self, SimError> {
        Self::with_memories(config, &[], &[])
    }

    /// Reset state with memories initialized from snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SnapshotTooLarge`] when a snapshot exceeds its
    /// address space, or the width error of [`Self::new`].
    pub fn with_memories(
        config: &CoreConfig,
        scalar_words: &[i32],
        vector_words: &[i32],
    ) -> Result<Self, SimError> {
        Ok(Self {
            arch: ArchitecturalState::new(config.max_vector_length),
            scalar_memory: DataMemory::from_words(
                AddressSpace::Scalar,
                config.scalar_address_bits,
                scalar_words,
            )?,
            vector_memory: DataMemory::from_words(
                AddressSpace::Vector,
                config.vector_address_bits,
                vector_words,
            )?,
        })
    }

    /// Memory backing one address space.
    #[must_use]
    pub const fn memory(&self, space: AddressSpace) -> &DataMemory {
        match space {
            AddressSpace::Scalar => &self.scalar_memory,
            AddressSpace::Vector => &self.vector_memory,
        }
    }
}
