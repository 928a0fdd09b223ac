//! Fixed-point helpers.
//!
//! 18-decimal amounts times 8-decimal prices times basis points blow
//! through `u128` long before the result does. [`mul_div`] keeps the
//! intermediate product at 256 bits so only the final quotient has to fit.

const LOW_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of `a × b` as `(high, low)`.
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LOW_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LOW_MASK);

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    // Three terms below 2^64 each; the sum fits comfortably.
    let middle = (lo_lo >> 64) + (lo_hi & LOW_MASK) + (hi_lo & LOW_MASK);
    let low = (lo_lo & LOW_MASK) | (middle << 64);
    let high = hi_hi + (lo_hi >> 64) + (hi_lo >> 64) + (middle >> 64);
    (high, low)
}

/// `floor(a × b / denominator)` without intermediate overflow.
///
/// Returns `None` if `denominator` is zero or the quotient exceeds
/// `u128::MAX`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let (high, low) = mul_wide(a, b);
    if high == 0 {
        return Some(low / denominator);
    }
    if high >= denominator {
        return None;
    }

    // Restoring long division of (high, low) by the denominator, one bit at
    // a time. `remainder < denominator` holds at the top of every iteration.
    let mut remainder = high;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = remainder >> 127;
        remainder = (remainder << 1) | ((low >> bit) & 1);
        if carry == 1 || remainder >= denominator {
            remainder = remainder.wrapping_sub(denominator);
            quotient |= 1 << bit;
        }
    }
    Some(quotient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_match_naive() {
        assert_eq!(mul_div(7, 9, 4), Some(15));
        assert_eq!(mul_div(0, u128::MAX, 3), Some(0));
        assert_eq!(mul_div(10, 10, 100), Some(1));
    }

    #[test]
    fn wide_intermediate() {
        let e18 = 10u128.pow(18);
        // 62_500e18 × 100e18 overflows u128; the quotient does not.
        assert_eq!(
            mul_div(62_500 * e18, 100 * e18, 250_000 * e18),
            Some(25 * e18)
        );
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
        assert_eq!(mul_div(u128::MAX, 2, 4), Some(u128::MAX / 2));
    }

    #[test]
    fn rounds_down() {
        assert_eq!(mul_div(u128::MAX, 3, 7), Some(u128::MAX / 7 * 3 + (u128::MAX % 7) * 3 / 7));
        assert_eq!(mul_div(1, 1, 2), Some(0));
    }

    #[test]
    fn overflow_and_zero_denominator() {
        assert_eq!(mul_div(u128::MAX, 2, 1), None);
        assert_eq!(mul_div(1, 1, 0), None);
    }
}
