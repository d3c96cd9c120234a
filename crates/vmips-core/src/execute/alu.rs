//! Pure 32-bit operator semantics shared by scalar, vector, and branch forms.

/// Two-operand arithmetic and logic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication (low 32 bits).
    Mul,
    /// Floor division, rounding toward negative infinity.
    Div,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise exclusive or.
    Xor,
    /// Logical shift left.
    Sll,
    /// Logical (zero-fill) shift right.
    Srl,
    /// Arithmetic (sign-fill) shift right.
    Sra,
}

impl AluOp {
    /// Applies the operator. Returns `None` only for a zero divisor.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub fn apply(self, lhs: i32, rhs: i32) -> Option<i32> {
        let value = match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div => return floor_div(lhs, rhs),
            Self::And => lhs & rhs,
            Self::Or => lhs | rhs,
            Self::Xor => lhs ^ rhs,
            Self::Sll => u32::try_from(rhs)
                .ok()
                .and_then(|shift| lhs.checked_shl(shift))
                .unwrap_or(0),
            Self::Srl => u32::try_from(rhs)
                .ok()
                .and_then(|shift| (lhs as u32).checked_shr(shift))
                .map_or(0, |bits| bits as i32),
            Self::Sra => lhs >> u32::try_from(rhs).map_or(31, |shift| shift.min(31)),
        };
        Some(value)
    }
}

/// Floor division on two's-complement words; `i32::MIN / -1` wraps.
fn floor_div(lhs: i32, rhs: i32) -> Option<i32> {
    if rhs == 0 {
        return None;
    }
    let quotient = lhs.wrapping_div(rhs);
    if lhs.wrapping_rem(rhs) != 0 && ((lhs < 0) != (rhs < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

/// Signed comparison predicates used by `S__VV`/`S__VS` and `B__`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    /// Evaluates the predicate.
    #[must_use]
    pub const fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Ge => lhs >= rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AluOp, CompareOp};
    use rstest::rstest;

    #[rstest]
    #[case(7, 2, 3)]
    #[case(-7, 2, -4)]
    #[case(7, -2, -4)]
    #[case(-7, -2, 3)]
    #[case(-8, 2, -4)]
    #[case(0, -5, 0)]
    #[case(i32::MIN, -1, i32::MIN)]
    fn division_rounds_toward_negative_infinity(
        #[case] lhs: i32,
        #[case] rhs: i32,
        #[case] expected: i32,
    ) {
        assert_eq!(AluOp::Div.apply(lhs, rhs), Some(expected));
    }

    #[test]
    fn division_by_zero_has_no_result() {
        assert_eq!(AluOp::Div.apply(1, 0), None);
    }

    #[rstest]
    #[case(AluOp::Add, i32::MAX, 1, i32::MIN)]
    #[case(AluOp::Sub, i32::MIN, 1, i32::MAX)]
    #[case(AluOp::Mul, 0x1_0000, 0x1_0000, 0)]
    #[case(AluOp::And, 0b1100, 0b1010, 0b1000)]
    #[case(AluOp::Or, 0b1100, 0b1010, 0b1110)]
    #[case(AluOp::Xor, 0b1100, 0b1010, 0b0110)]
    fn arithmetic_wraps_in_thirty_two_bits(
        #[case] op: AluOp,
        #[case] lhs: i32,
        #[case] rhs: i32,
        #[case] expected: i32,
    ) {
        assert_eq!(op.apply(lhs, rhs), Some(expected));
    }

    #[rstest]
    #[case(AluOp::Sll, 1, 4, 16)]
    #[case(AluOp::Sll, 1, 31, i32::MIN)]
    #[case(AluOp::Sll, 1, 32, 0)]
    #[case(AluOp::Srl, -16, 2, 0x3FFF_FFFC)]
    #[case(AluOp::Srl, -1, 40, 0)]
    #[case(AluOp::Sra, -16, 2, -4)]
    #[case(AluOp::Sra, 16, 2, 4)]
    #[case(AluOp::Sra, -1, 64, -1)]
    #[case(AluOp::Sra, -5, -1, -1)]
    fn shifts_follow_logical_and_arithmetic_rules(
        #[case] op: AluOp,
        #[case] lhs: i32,
        #[case] rhs: i32,
        #[case] expected: i32,
    ) {
        assert_eq!(op.apply(lhs, rhs), Some(expected));
    }

    #[test]
    fn comparisons_are_signed() {
        assert!(CompareOp::Lt.holds(-1, 0));
        assert!(CompareOp::Ge.holds(3, 3));
        assert!(CompareOp::Le.holds(-5, -4));
        assert!(CompareOp::Gt.holds(0, i32::MIN));
        assert!(CompareOp::Ne.holds(1, 2));
        assert!(!CompareOp::Eq.holds(1, 2));
    }
}
