use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Sentinel written in place of a ratio whose denominator is (nearly) zero.
pub const RATIO_SENTINEL: Real = -1.2345e25;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Guard for ratios whose denominator may vanish.
///
/// The ratio is computed only when `|denominator| > threshold`; otherwise
/// (or when the quotient is not finite) the sentinel is returned.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RatioGuard {
    pub threshold: Real,
    pub sentinel: Real,
}

impl RatioGuard {
    pub const fn new(threshold: Real, sentinel: Real) -> Self {
        Self {
            threshold,
            sentinel,
        }
    }

    pub fn ratio(&self, numerator: Real, denominator: Real) -> Real {
        if denominator.abs() > self.threshold {
            let q = numerator / denominator;
            if q.is_finite() {
                return q;
            }
        }
        self.sentinel
    }
}

impl Default for RatioGuard {
    fn default() -> Self {
        Self::new(0.0, RATIO_SENTINEL)
    }
}

/// C-style scientific notation (`%.<precision>e`): signed two-digit exponent.
pub fn sci(value: Real, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return raw;
    };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

/// Scientific notation with a leading blank for non-negative values (`% .8e`).
pub fn sci_space_signed(value: Real, precision: usize) -> String {
    let body = sci(value, precision);
    if body.starts_with('-') {
        body
    } else {
        format!(" {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn guard_returns_sentinel_for_zero_baseline() {
        let guard = RatioGuard::default();
        assert_eq!(guard.ratio(5.0, 0.0), RATIO_SENTINEL);
        assert_eq!(guard.ratio(5.0, -0.0), RATIO_SENTINEL);
        assert_eq!(guard.ratio(5.0, 2.0), 2.5);
        assert_eq!(guard.ratio(5.0, Real::NAN), RATIO_SENTINEL);

        let loose = RatioGuard::new(1e-10, -1.0);
        assert_eq!(loose.ratio(1.0, 1e-11), -1.0);
    }

    #[test]
    fn sci_matches_c_formatting() {
        assert_eq!(sci(12.5, 8), "1.25000000e+01");
        assert_eq!(sci(-0.00125, 3), "-1.250e-03");
        assert_eq!(sci(0.0, 2), "0.00e+00");
        assert_eq!(sci_space_signed(12.5, 2), " 1.25e+01");
        assert_eq!(sci_space_signed(-12.5, 2), "-1.25e+01");
        assert_eq!(sci(-1.2345e25, 4), "-1.2345e+25");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn guarded_ratio_is_always_finite(
            num in -1e12_f64..1e12_f64,
            den in prop_oneof![Just(0.0_f64), Just(-0.0_f64), -1e6_f64..1e6_f64],
        ) {
            let guard = RatioGuard::new(1e-10, RATIO_SENTINEL);
            let r = guard.ratio(num, den);
            prop_assert!(r.is_finite());
            if den.abs() <= 1e-10 {
                prop_assert_eq!(r, RATIO_SENTINEL);
            }
        }
    }
}
