//! Theis well function W(u) = E1(u)
//!
//! Power series below u = 1, modified Lentz continued fraction above. Both
//! expansions run to relative precision ~1e-15 across 1e-8 ≤ u ≤ 50 and stay
//! finite far beyond that range (E1 underflows to 0 for u ≳ 700).

use crate::config::defaults::{
    WELL_FUNCTION_MAX_TERMS, WELL_FUNCTION_SERIES_LIMIT, WELL_FUNCTION_TOLERANCE,
};
use crate::error::{InversionError, Result};

/// Euler-Mascheroni constant γ.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Evaluate the well function W(u).
///
/// `u` must be finite and strictly positive: W diverges at u = 0, where the
/// Theis drawdown is undefined.
pub fn well_function(u: f64) -> Result<f64> {
    if !u.is_finite() || u <= 0.0 {
        return Err(InversionError::domain(
            "well_function",
            format!("u = {u} (W(u) requires 0 < u < ∞)"),
        ));
    }
    if u < WELL_FUNCTION_SERIES_LIMIT {
        Ok(e1_series(u))
    } else {
        Ok(e1_continued_fraction(u))
    }
}

/// Evaluate W(u) element-wise. Fails on the first out-of-domain argument.
pub fn well_function_many(u: &[f64]) -> Result<Vec<f64>> {
    u.iter().map(|&x| well_function(x)).collect()
}

/// E1(u) = −γ − ln u − Σ_{k≥1} (−u)^k / (k·k!)
fn e1_series(u: f64) -> f64 {
    let mut sum = 0.0;
    let mut term = 1.0;
    for k in 1..=WELL_FUNCTION_MAX_TERMS {
        let kf = k as f64;
        term *= -u / kf;
        let contribution = term / kf;
        sum += contribution;
        if contribution.abs() < WELL_FUNCTION_TOLERANCE * sum.abs() {
            break;
        }
    }
    -EULER_GAMMA - u.ln() - sum
}

/// E1(u) = e^{−u} / (u + 1 − 1²/(u + 3 − 2²/(u + 5 − …)))
fn e1_continued_fraction(u: f64) -> f64 {
    const TINY: f64 = 1e-300;
    let mut b = u + 1.0;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=WELL_FUNCTION_MAX_TERMS {
        let an = -((i * i) as f64);
        b += 2.0;
        d = 1.0 / (an * d + b);
        c = b + an / c;
        let delta = c * d;
        h *= delta;
        if (delta - 1.0).abs() < WELL_FUNCTION_TOLERANCE {
            break;
        }
    }
    h * (-u).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rel(actual: f64, expected: f64, tol: f64) {
        let rel = ((actual - expected) / expected).abs();
        assert!(rel < tol, "W = {actual}, expected {expected} (rel err {rel:e})");
    }

    #[test]
    fn test_reference_values() {
        assert_rel(well_function(0.01).unwrap(), 4.037_929_576_5, 1e-9);
        assert_rel(well_function(0.1).unwrap(), 1.822_923_958_4, 1e-9);
        assert_rel(well_function(1.0).unwrap(), 0.219_383_934_4, 1e-9);
        assert_rel(well_function(5.0).unwrap(), 1.148_295_591_2e-3, 1e-9);
        assert_rel(well_function(10.0).unwrap(), 4.156_968_929_7e-6, 1e-9);
    }

    #[test]
    fn test_small_u_asymptote() {
        // W(u) ≈ −γ − ln u for u → 0
        let u = 1e-8;
        assert_rel(well_function(u).unwrap(), -EULER_GAMMA - u.ln(), 1e-7);
    }

    #[test]
    fn test_continuity_at_switch() {
        let below = well_function(1.0 - 1e-12).unwrap();
        let above = well_function(1.0).unwrap();
        assert!((below - above).abs() < 1e-10);
    }

    #[test]
    fn test_monotonically_decreasing() {
        let us = [1e-6, 1e-4, 1e-2, 0.5, 1.0, 2.0, 10.0, 50.0];
        let w = well_function_many(&us).unwrap();
        assert!(w.windows(2).all(|p| p[0] > p[1]));
        assert!(w.iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn test_huge_u_is_zero_not_nan() {
        assert_eq!(well_function(1e4).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_domain() {
        for u in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                well_function(u),
                Err(InversionError::InvalidDomain { function: "well_function", .. })
            ));
        }
        assert!(well_function_many(&[0.1, 0.0]).is_err());
    }
}
