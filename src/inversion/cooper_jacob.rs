//! Cooper-Jacob semi-log straight-line analysis
//!
//! For small u the Theis drawdown is linear in log10(t). A least-squares line
//! s = a·log10(t) + b gives:
//! - T  = Q / (4π·a·ln10)
//! - t0 = 10^(−b/a), where the line crosses zero drawdown
//! - S  = 2.25·T·t0 / r²
//!
//! The approximation only holds where u = r²S/(4Tt) < `u_limit`; the fit
//! reports which share of the observations satisfies that with its own T, S.

use std::f64::consts::{LN_10, PI};

use tracing::{info, warn};

use super::diagnostics::linear_regression;
use super::theis::theis_u;
use crate::config::CooperJacobConfig;
use crate::error::{require_points, require_positive, InversionError, Result};
use crate::types::{CooperJacobCurve, CooperJacobFit, TestMeasurementSeries};

const MODEL: &str = "Cooper-Jacob";

/// Semi-log drawdown s = Q/(4πT) · ln(2.25·T·t / (r²·S)) (m).
///
/// Negative before the zero-crossing time t0 = r²S/(2.25T), where the
/// approximation is meaningless anyway.
pub fn cooper_jacob_drawdown(
    pumping_rate: f64,
    transmissivity: f64,
    storativity: f64,
    distance: f64,
    time: f64,
) -> Result<f64> {
    require_positive("transmissivity", transmissivity)?;
    require_positive("storativity", storativity)?;
    require_positive("distance", distance)?;
    if !(time.is_finite() && time > 0.0) {
        return Err(InversionError::domain(
            "cooper_jacob_drawdown",
            format!("time = {time} must be > 0"),
        ));
    }
    let argument = 2.25 * transmissivity * time / (distance * distance * storativity);
    Ok(pumping_rate / (4.0 * PI * transmissivity) * argument.ln())
}

/// Cooper-Jacob straight-line inverter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CooperJacobInverter {
    config: CooperJacobConfig,
}

impl CooperJacobInverter {
    pub fn new(config: CooperJacobConfig) -> Self {
        Self { config }
    }

    /// Fit the semi-log line and derive T, S and the validity window.
    ///
    /// Closed form, hence fully deterministic.
    pub fn fit(&self, series: &TestMeasurementSeries) -> Result<CooperJacobFit> {
        require_points(MODEL, series.len(), self.config.min_points)?;
        let q = series.require_pumping_rate()?;
        let r = series.require_distance()?;
        series.require_positive_times(MODEL)?;

        let times = series.times();
        let log10_t: Vec<f64> = times.iter().map(|t| t.log10()).collect();
        let line = linear_regression(&log10_t, series.values())?;
        let (slope, intercept) = (line.slope, line.intercept);

        if !(slope.is_finite() && slope > 0.0) {
            return Err(InversionError::convergence(
                MODEL,
                format!("slope {slope:.4e} m/log-cycle is not positive, drawdown must grow with time"),
            ));
        }

        let transmissivity = q / (4.0 * PI * slope * LN_10);
        let t0 = 10f64.powf(-intercept / slope);
        let storativity = 2.25 * transmissivity * t0 / (r * r);
        if !(transmissivity.is_finite() && storativity.is_finite() && storativity > 0.0) {
            return Err(InversionError::convergence(
                MODEL,
                format!("non-physical estimate T = {transmissivity:e}, S = {storativity:e}"),
            ));
        }

        let u_values: Vec<f64> = times
            .iter()
            .map(|&t| theis_u(transmissivity, storativity, r, t))
            .collect();
        let valid_times: Vec<f64> = times
            .iter()
            .zip(&u_values)
            .filter(|(_, u)| **u < self.config.u_limit)
            .map(|(t, _)| *t)
            .collect();
        let validity_percent = 100.0 * valid_times.len() as f64 / times.len() as f64;
        let validity_window = valid_times
            .iter()
            .copied()
            .fold(None, |acc: Option<(f64, f64)>, t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            });

        let validity_warning = (validity_percent < self.config.min_validity_percent).then(|| {
            format!(
                "only {validity_percent:.1}% of points satisfy u < {}: the semi-log approximation is not justified, prefer a Theis fit",
                self.config.u_limit
            )
        });

        let predicted: Vec<f64> = log10_t.iter().map(|&x| line.predict(x)).collect();
        let rmse = super::diagnostics::rmse(series.values(), &predicted);

        if let Some(message) = &validity_warning {
            warn!(validity_percent, "{message}");
        }
        info!(
            transmissivity,
            storativity,
            rmse,
            validity_percent,
            "Cooper-Jacob fit complete"
        );

        Ok(CooperJacobFit {
            transmissivity,
            storativity,
            slope,
            intercept,
            t0,
            rmse,
            r_squared: line.r_squared,
            validity_percent,
            validity_window,
            u_values,
            validity_warning,
            pumping_rate: q,
            distance: r,
            num_points: series.len(),
        })
    }
}

/// Evaluate a fitted line over `times`, with u from the fitted T, S.
pub fn cooper_jacob_curve(fit: &CooperJacobFit, times: &[f64]) -> Result<CooperJacobCurve> {
    if let Some(t) = times.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
        return Err(InversionError::domain(
            "cooper_jacob_curve",
            format!("time = {t} must be > 0"),
        ));
    }
    let log10_time: Vec<f64> = times.iter().map(|t| t.log10()).collect();
    Ok(CooperJacobCurve {
        time: times.to_vec(),
        drawdown: log10_time
            .iter()
            .map(|x| fit.slope * x + fit.intercept)
            .collect(),
        u: times
            .iter()
            .map(|&t| theis_u(fit.transmissivity, fit.storativity, fit.distance, t))
            .collect(),
        log10_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_series(times: Vec<f64>) -> TestMeasurementSeries {
        let drawdown = times
            .iter()
            .map(|&t| cooper_jacob_drawdown(1e-3, 1e-3, 1e-4, 10.0, t).unwrap())
            .collect();
        TestMeasurementSeries::new(times, drawdown)
            .unwrap()
            .with_pumping_rate(1e-3)
            .with_distance(10.0)
    }

    #[test]
    fn test_exact_line_recovers_slope_and_t0() {
        let times: Vec<f64> = (0..12).map(|i| 600.0 * 1.5f64.powi(i)).collect();
        let fit = CooperJacobInverter::default().fit(&line_series(times)).unwrap();
        // slope of the generating line: Q·ln10 / (4πT)
        let expected_slope = 1e-3 * LN_10 / (4.0 * PI * 1e-3);
        assert!((fit.slope - expected_slope).abs() < 1e-12);
        // t0 = r²S / (2.25 T)
        assert!((fit.t0 - 100.0 * 1e-4 / (2.25 * 1e-3)).abs() < 1e-6);
        assert!(fit.rmse < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_validity_window() {
        let times: Vec<f64> = (0..12).map(|i| 600.0 * 1.5f64.powi(i)).collect();
        let fit = CooperJacobInverter::default().fit(&line_series(times.clone())).unwrap();
        assert_eq!(fit.validity_percent, 100.0);
        assert_eq!(fit.validity_window, Some((times[0], times[11])));
        assert!(fit.is_valid());
        assert_eq!(fit.u_values.len(), 12);
    }

    #[test]
    fn test_non_positive_slope_is_rejected() {
        let series = TestMeasurementSeries::new(vec![10.0, 100.0, 1000.0], vec![0.3, 0.2, 0.1])
            .unwrap()
            .with_pumping_rate(1e-3)
            .with_distance(10.0);
        let err = CooperJacobInverter::default().fit(&series).unwrap_err();
        assert!(matches!(err, InversionError::FitConvergence { .. }));
    }

    #[test]
    fn test_curve_from_fit() {
        let times: Vec<f64> = (0..6).map(|i| 600.0 * 2f64.powi(i)).collect();
        let fit = CooperJacobInverter::default().fit(&line_series(times)).unwrap();
        let curve = cooper_jacob_curve(&fit, &[1000.0, 10_000.0]).unwrap();
        assert!((curve.drawdown[1] - curve.drawdown[0] - fit.slope).abs() < 1e-12);
        assert!(curve.u[0] > curve.u[1]);
        assert!(cooper_jacob_curve(&fit, &[0.0]).is_err());
    }
}
