//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the closed range `[min, max]`.
///
/// Computed as `max(min, min(max, value))` with `Float::max`/`Float::min`, which ignore NaN, so
/// a NaN value is pinned to `max`. The result is always inside the range.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    min.max(max.min(value))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(0.5f64, -1.0, 1.0), 0.5);
        assert_eq!(clamp(1.0f64, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-1.0f64, -1.0, 1.0), -1.0);
        assert_eq!(clamp(3.2f64, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-7.0f64, -1.0, 1.0), -1.0);
        assert_eq!(clamp(f64::INFINITY, -1.0, 1.0), 1.0);
        assert_eq!(clamp(f64::NEG_INFINITY, -1.0, 1.0), -1.0);
        assert_eq!(clamp(f64::NAN, -1.0, 1.0), 1.0);

        // Clamping an already clamped value changes nothing
        for v in [-2.5f64, -1.0, -0.3, 0.0, 0.9, 1.0, 4.0].iter() {
            let once = clamp(*v, -1.0, 1.0);
            assert_eq!(clamp(once, -1.0, 1.0), once);
        }
    }
}
