//! Rounding and random-range helpers shared by the series pipeline.
//!
//! The random helpers take the generator explicitly so callers can pass a
//! seeded `StdRng` in tests and an OS-seeded one in production.

use rand::Rng;

/// Number of fractional digits every price, volume and average is rounded to.
pub const DEFAULT_FRACTIONAL_DIGITS: i32 = 3;

/// Rounds `value` to `fractional_digits` decimal places, half away from zero.
///
/// Values too large to scale are returned as they are; they carry no
/// fractional digits anyway.
pub fn round(value: f64, fractional_digits: i32) -> f64 {
    let scale = 10f64.powi(fractional_digits);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

/// [`round`] with [`DEFAULT_FRACTIONAL_DIGITS`].
pub fn round3(value: f64) -> f64 {
    round(value, DEFAULT_FRACTIONAL_DIGITS)
}

/// Uniform integer in `[lower, upper]` (both ends inclusive).
///
/// An inverted range collapses to `lower`.
pub fn random_int_in_range<R: Rng + ?Sized>(rng: &mut R, lower: i64, upper: i64) -> i64 {
    if upper <= lower {
        return lower;
    }
    rng.random_range(lower..=upper)
}

/// Uniform float in `[lower, upper)`.
///
/// An empty or inverted range collapses to `lower`, as does one whose width
/// is not finite (NaN bounds, or bounds so far apart the width overflows).
pub fn random_float_in_range<R: Rng + ?Sized>(rng: &mut R, lower: f64, upper: f64) -> f64 {
    if !(upper > lower) || !(upper - lower).is_finite() {
        return lower;
    }
    rng.random_range(lower..upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn rounds_to_three_digits() {
        assert_eq!(round3(10.5), 10.5);
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-1.23456), -1.235);
        assert_eq!(round(2.5, 0), 3.0);
        assert_eq!(round(-2.5, 0), -3.0);
        assert_eq!(round3(1.5e308), 1.5e308);
    }

    #[test]
    fn degenerate_ranges_collapse_to_lower() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(random_int_in_range(&mut rng, 4, 4), 4);
        assert_eq!(random_int_in_range(&mut rng, 5, 1), 5);
        assert_eq!(random_float_in_range(&mut rng, 3.0, 3.0), 3.0);
    }

    #[test]
    #[allow(overflowing_literals)]
    fn overflowing_float_range_collapses_to_lower() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(random_float_in_range(&mut rng, 1.2e308, 1.8e308), 1.2e308);
        assert_eq!(random_float_in_range(&mut rng, -f64::MAX, f64::MAX), -f64::MAX);
        assert_eq!(random_float_in_range(&mut rng, 1.0, f64::INFINITY), 1.0);
        assert!(random_float_in_range(&mut rng, f64::NAN, 1.0).is_nan());
    }

    proptest! {
        #[test]
        fn int_range_is_inclusive(seed in any::<u64>(), lower in -50i64..50, width in 0i64..40) {
            let mut rng = StdRng::seed_from_u64(seed);
            let v = random_int_in_range(&mut rng, lower, lower + width);
            prop_assert!(v >= lower && v <= lower + width);
        }

        #[test]
        fn float_range_is_half_open(seed in any::<u64>(), lower in -100.0f64..100.0, width in 0.001f64..50.0) {
            let mut rng = StdRng::seed_from_u64(seed);
            let v = random_float_in_range(&mut rng, lower, lower + width);
            prop_assert!(v >= lower && v < lower + width);
        }
    }

    #[test]
    fn int_range_reaches_both_ends() {
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<i64> = (0..500).map(|_| random_int_in_range(&mut rng, 2, 4)).collect();
        assert!(draws.contains(&2));
        assert!(draws.contains(&4));
    }
}
