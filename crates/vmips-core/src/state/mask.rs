use super::registers::LanePatch;

/// Vector mask register: one enable bit per lane, fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct VectorMask {
    bits: Vec<bool>,
}

impl VectorMask {
    /// All-ones mask of `len` lanes.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![true; len],
        }
    }

    /// Number of lanes; never changes after construction.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` for a zero-lane mask.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Enable bit for one lane; lanes past the end read as disabled.
    #[must_use]
    pub fn is_set(&self, lane: usize) -> bool {
        self.bits.get(lane).copied().unwrap_or(false)
    }

    /// All enable bits.
    #[must_use]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Gates a candidate result: enabled lanes carry the new value, disabled
    /// lanes are left unchanged.
    #[must_use]
    pub fn apply(&self, values: &[i32]) -> LanePatch {
        LanePatch::from_lanes(
            values
                .iter()
                .enumerate()
                .map(|(lane, value)| self.is_set(lane).then_some(*value))
                .collect(),
        )
    }

    /// Overwrites the leading `bits.len()` lanes; the rest keep their value.
    pub fn overwrite(&mut self, bits: &[bool]) {
        for (slot, bit) in self.bits.iter_mut().zip(bits) {
            *slot = *bit;
        }
    }

    /// Resets every lane to enabled (`CVM`).
    pub fn clear(&mut self) {
        self.bits.fill(true);
    }

    /// Number of enabled lanes (`POP`).
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }
}

#[cfg(test)]
mod tests {
    use super::VectorMask;

    #[test]
    fn new_mask_is_all_ones() {
        let mask = VectorMask::new(8);
        assert_eq!(mask.count_ones(), 8);
        assert_eq!(mask.len(), 8);
    }

    #[test]
    fn overwrite_touches_only_leading_lanes() {
        let mut mask = VectorMask::new(4);
        mask.overwrite(&[false, true]);
        assert_eq!(mask.bits(), &[false, true, true, true]);
        assert_eq!(mask.len(), 4);
    }

    #[test]
    fn apply_marks_disabled_lanes_as_kept() {
        let mut mask = VectorMask::new(4);
        mask.overwrite(&[true, false, true, false]);
        let patch = mask.apply(&[10, 20, 30, 40]);
        assert_eq!(patch.lanes(), &[Some(10), None, Some(30), None]);
    }

    #[test]
    fn clear_restores_all_ones() {
        let mut mask = VectorMask::new(6);
        mask.overwrite(&[false; 6]);
        assert_eq!(mask.count_ones(), 0);
        mask.clear();
        assert_eq!(mask.count_ones(), 6);
    }
}
