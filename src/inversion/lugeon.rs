//! Lugeon stepped-injection averaging
//!
//! Each pressure step is normalised to the reference pressure:
//! UL = (Q / L) · (P_ref / P), with Q in L/min and L in metres, and
//! K = UL · 1e-7 m/s. Steps near the reference pressure are the most
//! reliable and drive the mean; the spread of per-step K over all steps
//! scores reproducibility.

use tracing::{debug, info};

use crate::config::defaults::LUGEON_TO_MS;
use crate::config::LugeonConfig;
use crate::error::{require_points, Result};
use crate::types::{InjectionTest, LugeonQuality, LugeonResult, LugeonStepResult};

/// Lugeon units to m/s. `lugeon_to_ms(1.0) == 1e-7` exactly.
pub fn lugeon_to_ms(lugeon: f64) -> f64 {
    lugeon * LUGEON_TO_MS
}

/// m/s to Lugeon units, the exact inverse of [`lugeon_to_ms`].
///
/// Plain division can land one ulp off the value that converts back to `k`;
/// the neighbours are checked so that `ms_to_lugeon(lugeon_to_ms(x)) == x`.
pub fn ms_to_lugeon(k: f64) -> f64 {
    let ul = k / LUGEON_TO_MS;
    if !ul.is_finite() || ul <= 0.0 || lugeon_to_ms(ul) == k {
        return ul;
    }
    let bits = ul.to_bits();
    [f64::from_bits(bits + 1), f64::from_bits(bits - 1)]
        .into_iter()
        .find(|candidate| lugeon_to_ms(*candidate) == k)
        .unwrap_or(ul)
}

/// Averages a multi-step injection test into a single conductivity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LugeonAverager {
    config: LugeonConfig,
}

impl LugeonAverager {
    pub fn new(config: LugeonConfig) -> Self {
        Self { config }
    }

    /// Lugeon value of one step normalised to the reference pressure (UL).
    pub fn step_lugeon(&self, pressure_bar: f64, discharge_lpm: f64, segment_length: f64) -> f64 {
        (discharge_lpm / segment_length) * (self.config.reference_pressure_bar / pressure_bar)
    }

    /// Reproducibility band for a coefficient of variation.
    pub fn quality(&self, cv: f64) -> LugeonQuality {
        let c = &self.config;
        if cv < c.cv_excellent {
            LugeonQuality::Excellent
        } else if cv < c.cv_good {
            LugeonQuality::Good
        } else if cv < c.cv_fair {
            LugeonQuality::Fair
        } else {
            LugeonQuality::Poor
        }
    }

    /// Evaluate every step, average, and score the test.
    ///
    /// The mean uses the steps within `pressure_tolerance_bar` of the reference
    /// pressure, or every step when none qualifies. The CV always spans all steps.
    pub fn analyze(&self, test: &InjectionTest) -> Result<LugeonResult> {
        require_points("Lugeon", test.steps().len(), 1)?;
        let length = test.segment_length();

        let steps: Vec<LugeonStepResult> = test
            .steps()
            .iter()
            .map(|step| {
                let lugeon = self.step_lugeon(step.pressure_bar, step.discharge_lpm, length);
                let conductivity = lugeon_to_ms(lugeon);
                debug!(
                    pressure_bar = step.pressure_bar,
                    discharge_lpm = step.discharge_lpm,
                    lugeon,
                    conductivity,
                    "Lugeon step"
                );
                LugeonStepResult {
                    pressure_bar: step.pressure_bar,
                    discharge_lpm: step.discharge_lpm,
                    lugeon,
                    conductivity,
                }
            })
            .collect();

        let reference: Vec<&LugeonStepResult> = steps
            .iter()
            .filter(|s| {
                (s.pressure_bar - self.config.reference_pressure_bar).abs()
                    < self.config.pressure_tolerance_bar
            })
            .collect();
        let used_reference_steps = !reference.is_empty();
        let averaged: Vec<&LugeonStepResult> = if used_reference_steps {
            reference
        } else {
            steps.iter().collect()
        };

        let count = averaged.len() as f64;
        let k_mean = averaged.iter().map(|s| s.conductivity).sum::<f64>() / count;
        let lugeon_mean = averaged.iter().map(|s| s.lugeon).sum::<f64>() / count;

        let n = steps.len() as f64;
        let k_all_mean = steps.iter().map(|s| s.conductivity).sum::<f64>() / n;
        let k_std = (steps
            .iter()
            .map(|s| (s.conductivity - k_all_mean).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();
        let cv = if k_mean > 0.0 { k_std / k_mean } else { 0.0 };
        let quality = self.quality(cv);

        info!(
            k_mean,
            lugeon_mean,
            cv,
            steps = steps.len(),
            used_reference_steps,
            "Lugeon analysis complete"
        );

        Ok(LugeonResult {
            segment_length: length,
            steps,
            k_mean,
            lugeon_mean,
            k_std,
            cv,
            quality,
            used_reference_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InversionError;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(lugeon_to_ms(1.0), 1e-7);
        for x in [0.3, 1.0, 1.5, 2.7, 12.3, 45.0, 1234.5678] {
            assert_eq!(ms_to_lugeon(lugeon_to_ms(x)), x, "x = {x}");
        }
    }

    #[test]
    fn test_step_normalisation() {
        let averager = LugeonAverager::default();
        // 20 L/min over 5 m at 5 bar → 4 L/min/m, doubled to the 10 bar reference
        assert!((averager.step_lugeon(5.0, 20.0, 5.0) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_uses_reference_steps() {
        let test = InjectionTest::from_steps(5.0, [(5.0, 20.0), (10.0, 30.0), (10.5, 31.5)]).unwrap();
        let result = LugeonAverager::default().analyze(&test).unwrap();
        assert!(result.used_reference_steps);
        // steps at 10 and 10.5 bar: UL = 6.0 and 6.0
        assert!((result.lugeon_mean - 6.0).abs() < 1e-12);
        assert!((result.k_mean - 6e-7).abs() < 1e-20);
        assert_eq!(result.num_steps(), 3);
    }

    #[test]
    fn test_fallback_to_all_steps() {
        let test = InjectionTest::from_steps(2.0, [(2.0, 4.0), (4.0, 8.0)]).unwrap();
        let result = LugeonAverager::default().analyze(&test).unwrap();
        assert!(!result.used_reference_steps);
        assert!((result.lugeon_mean - 10.0).abs() < 1e-12);
        assert_eq!(result.cv, 0.0);
        assert_eq!(result.quality, LugeonQuality::Excellent);
    }

    #[test]
    fn test_quality_bands() {
        let averager = LugeonAverager::default();
        assert_eq!(averager.quality(0.10), LugeonQuality::Excellent);
        assert_eq!(averager.quality(0.15), LugeonQuality::Good);
        assert_eq!(averager.quality(0.30), LugeonQuality::Fair);
        assert_eq!(averager.quality(0.49), LugeonQuality::Fair);
        assert_eq!(averager.quality(0.50), LugeonQuality::Poor);
    }

    #[test]
    fn test_no_steps() {
        let test = InjectionTest::new(5.0).unwrap();
        assert!(matches!(
            LugeonAverager::default().analyze(&test),
            Err(InversionError::InsufficientData { needed: 1, available: 0, .. })
        ));
    }

    #[test]
    fn test_zero_discharge_gives_zero_cv() {
        let test = InjectionTest::from_steps(3.0, [(10.0, 0.0), (5.0, 0.0)]).unwrap();
        let result = LugeonAverager::default().analyze(&test).unwrap();
        assert_eq!(result.k_mean, 0.0);
        assert_eq!(result.cv, 0.0);
    }
}
