//! Piezometric level trend and aquifer behavior
//!
//! Ordinary least squares of level against elapsed days, with a two-sided
//! Student-t significance test on the slope, plus two heuristic lookups:
//! amplitude band and reactivity (std/mean of the levels).

use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::info;

use super::diagnostics::linear_regression;
use crate::config::PiezometryConfig;
use crate::error::{require_points, Result};
use crate::types::{
    AmplitudeBand, AquiferBehavior, LevelSeries, LevelStatistics, PiezometryReport, Reactivity,
    TrendDirection, TrendReport,
};

const MODEL: &str = "piezometry";

/// Level series trend analyzer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendAnalyzer {
    config: PiezometryConfig,
}

impl TrendAnalyzer {
    pub fn new(config: PiezometryConfig) -> Self {
        Self { config }
    }

    /// Statistics, trend and behavior in one report.
    pub fn analyze(&self, series: &LevelSeries) -> Result<PiezometryReport> {
        let statistics = self.statistics(series)?;
        let trend = self.trend(series)?;
        let behavior = self.behavior(&statistics);

        info!(
            slope_m_per_year = trend.slope_m_per_year,
            r_squared = trend.r_squared,
            amplitude = statistics.amplitude,
            interpretation = %trend.interpretation,
            "Piezometric analysis complete"
        );

        Ok(PiezometryReport {
            statistics,
            trend,
            behavior,
        })
    }

    /// Min, max, mean, population std and amplitude of the levels.
    pub fn statistics(&self, series: &LevelSeries) -> Result<LevelStatistics> {
        require_points(MODEL, series.len(), 1)?;
        let levels = series.levels();
        let n = levels.len() as f64;
        let min = levels.iter().copied().fold(f64::INFINITY, f64::min);
        let max = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = levels.iter().sum::<f64>() / n;
        let std = (levels.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        Ok(LevelStatistics {
            n_points: levels.len(),
            min,
            max,
            mean,
            std,
            amplitude: max - min,
        })
    }

    /// Stable below the threshold, rising strictly above it; everything else,
    /// including a slope of exactly +threshold, reads as falling.
    fn direction(&self, slope_m_per_year: f64) -> TrendDirection {
        let threshold = self.config.stable_slope_m_per_year;
        if slope_m_per_year.abs() < threshold {
            TrendDirection::Stable
        } else if slope_m_per_year > threshold {
            TrendDirection::Rising
        } else {
            TrendDirection::Falling
        }
    }

    /// Least-squares trend of level against elapsed days.
    pub fn trend(&self, series: &LevelSeries) -> Result<TrendReport> {
        require_points(MODEL, series.len(), self.config.min_points)?;
        let days = series.elapsed_days();
        let line = linear_regression(days, series.levels())?;

        let slope_m_per_year = line.slope * self.config.days_per_year;
        let direction = self.direction(slope_m_per_year);
        let interpretation = match direction {
            TrendDirection::Stable => "Stable".to_string(),
            TrendDirection::Rising => format!("Rising ({slope_m_per_year:.3} m/yr)"),
            TrendDirection::Falling => format!("Falling ({slope_m_per_year:.3} m/yr)"),
        };

        Ok(TrendReport {
            slope_m_per_day: line.slope,
            slope_m_per_year,
            intercept: line.intercept,
            r_squared: line.r_squared,
            p_value: slope_p_value(line.slope, line.slope_std_error, line.n),
            std_error: line.slope_std_error,
            direction,
            interpretation,
            trend_line: days.iter().map(|&d| line.predict(d)).collect(),
        })
    }

    /// Amplitude band and reactivity from the level statistics.
    pub fn behavior(&self, statistics: &LevelStatistics) -> AquiferBehavior {
        let c = &self.config;
        let behavior = if statistics.amplitude > c.amplitude_high_m {
            AmplitudeBand::High
        } else if statistics.amplitude > c.amplitude_moderate_m {
            AmplitudeBand::Moderate
        } else {
            AmplitudeBand::Low
        };

        let std_normalized = if statistics.mean > 0.0 {
            statistics.std / statistics.mean
        } else {
            0.0
        };
        let reactivity = if std_normalized > c.reactivity_high {
            Reactivity::VeryReactive
        } else if std_normalized > c.reactivity_moderate {
            Reactivity::Reactive
        } else {
            Reactivity::Sluggish
        };

        AquiferBehavior {
            behavior,
            reactivity,
            amplitude_m: statistics.amplitude,
            std_normalized,
        }
    }
}

/// Two-sided p-value of a regression slope, Student t with n − 2 dof.
fn slope_p_value(slope: f64, std_error: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if std_error <= 0.0 {
        // exact fit: any non-zero slope is certain
        return if slope == 0.0 { 1.0 } else { 0.0 };
    }
    let t_stat = slope / std_error;
    match StudentsT::new(0.0, 1.0, (n - 2) as f64) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t_stat.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}
