//! Word-addressable scalar and vector data memories.

use std::fmt;

use crate::SimError;

/// Default scalar data memory width: 2^13 words (32 KiB).
pub const SCALAR_ADDRESS_BITS: u32 = 13;
/// Default vector data memory width: 2^17 words (512 KiB).
pub const VECTOR_ADDRESS_BITS: u32 = 17;
/// Widest supported address space: 2^30 words (4 GiB).
pub const MAX_ADDRESS_BITS: u32 = 30;

/// Independent data address spaces of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressSpace {
    /// Scalar data memory (`SDMEM`), reached by `LS`/`SS`.
    Scalar,
    /// Vector data memory (`VDMEM`), reached by vector loads and stores.
    Vector,
}

impl AddressSpace {
    /// Both address spaces in snapshot order.
    pub const ALL: [Self; 2] = [Self::Scalar, Self::Vector];

    /// Snapshot file stem for this address space.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "SDMEM",
            Self::Vector => "VDMEM",
        }
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flat store of signed 32-bit words for one address space.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DataMemory {
    space: AddressSpace,
    words: Box<[i32]>,
}

impl DataMemory {
    /// Allocates a zeroed memory of `2^address_bits` words.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::AddressWidthUnsupported`] above
    /// [`MAX_ADDRESS_BITS`].
    pub fn new(space: AddressSpace, address_bits: u32) -> Result<Self, SimError> {
        let size = 1_usize
            .checked_shl(address_bits)
            .filter(|_| address_bits <= MAX_ADDRESS_BITS)
            .ok_or(SimError::AddressWidthUnsupported {
                space,
                bits: address_bits,
                max: MAX_ADDRESS_BITS,
            })?;
        Ok(Self {
            space,
            words: vec![0; size].into_boxed_slice(),
        })
    }

    /// Builds a memory from a snapshot, zero-padding up to full capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SnapshotTooLarge`] when the snapshot holds more
    /// words than the address space, or the width error of [`Self::new`].
    pub fn from_words(space: AddressSpace, address_bits: u32, words: &[i32]) -> Result<Self, SimError> {
        let mut memory = Self::new(space, address_bits)?;
        if words.len() > memory.len() {
            return Err(SimError::SnapshotTooLarge {
                space,
                len: words.len(),
                size: memory.len(),
            });
        }
        memory.words[..words.len()].copy_from_slice(words);
        Ok(memory)
    }

    /// Address space this memory backs.
    #[must_use]
    pub const fn space(&self) -> AddressSpace {
        self.space
    }

    /// Capacity in words.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` for a zero-capacity memory.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Validates an effective address; addresses are never wrapped or clamped.
    #[must_use]
    pub fn resolve(&self, address: i64) -> Option<usize> {
        usize::try_from(address).ok().filter(|index| *index < self.words.len())
    }

    /// Like [`Self::resolve`], but reports a failure as a fault at `pc`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MemoryOutOfBounds`] for an address outside
    /// `[0, len)`.
    pub fn resolve_at(&self, address: i64, pc: usize) -> Result<usize, SimError> {
        self.resolve(address).ok_or(SimError::MemoryOutOfBounds {
            space: self.space,
            address,
            size: self.words.len(),
            pc,
        })
    }

    /// Reads a word at a resolved address.
    ///
    /// # Panics
    ///
    /// Panics if `address` was not produced by [`Self::resolve`].
    #[must_use]
    pub fn read(&self, address: usize) -> i32 {
        self.words[address]
    }

    /// Writes a word at a resolved address.
    ///
    /// # Panics
    ///
    /// Panics if `address` was not produced by [`Self::resolve`].
    pub fn write(&mut self, address: usize, value: i32) {
        self.words[address] = value;
    }

    /// Full memory image in address order.
    #[must_use]
    pub fn words(&self) -> &[i32] {
        &self.words
    }
}
