//! Theis transient drawdown inversion
//!
//! s(t) = Q / (4πT) · W(u),  u = r²S / (4Tt)
//!
//! (T, S) are fitted jointly with the simplex from the configured initial
//! guess, or T alone with a bounded scalar search when the caller fixes S.

use std::f64::consts::PI;

use tracing::{info, warn};

use super::fitter::{NonlinearFitter, Parameter};
use super::well_function::well_function;
use crate::config::{FittingConfig, TheisConfig};
use crate::error::{require_points, require_positive, InversionError, Result};
use crate::types::{TestMeasurementSeries, TheisCurve, TheisFit};

const MODEL: &str = "Theis";

/// Dimensionless time argument u = r²S / (4Tt).
pub fn theis_u(transmissivity: f64, storativity: f64, distance: f64, time: f64) -> f64 {
    distance * distance * storativity / (4.0 * transmissivity * time)
}

/// Theis drawdown at one time (m).
pub fn theis_drawdown(
    pumping_rate: f64,
    transmissivity: f64,
    storativity: f64,
    distance: f64,
    time: f64,
) -> Result<f64> {
    require_positive("transmissivity", transmissivity)?;
    require_storativity(storativity)?;
    let u = theis_u(transmissivity, storativity, distance, time);
    Ok(pumping_rate / (4.0 * PI * transmissivity) * well_function(u)?)
}

/// Theoretical Theis curve over `times`, for plotting and residual diagnostics.
pub fn theis_curve(
    pumping_rate: f64,
    transmissivity: f64,
    storativity: f64,
    distance: f64,
    times: &[f64],
) -> Result<TheisCurve> {
    require_positive("pumping_rate", pumping_rate)?;
    require_positive("transmissivity", transmissivity)?;
    require_storativity(storativity)?;
    require_positive("distance", distance)?;

    let u: Vec<f64> = times
        .iter()
        .map(|&t| theis_u(transmissivity, storativity, distance, t))
        .collect();
    let w_u = u
        .iter()
        .map(|&x| well_function(x))
        .collect::<Result<Vec<f64>>>()?;
    let factor = pumping_rate / (4.0 * PI * transmissivity);

    Ok(TheisCurve {
        transmissivity,
        storativity,
        time: times.to_vec(),
        drawdown: w_u.iter().map(|w| factor * w).collect(),
        u,
        w_u,
    })
}

fn require_storativity(storativity: f64) -> Result<f64> {
    if storativity.is_finite() && storativity > 0.0 && storativity < 1.0 {
        Ok(storativity)
    } else {
        Err(InversionError::parameter(
            "storativity",
            format!("must lie in (0, 1) (got {storativity})"),
        ))
    }
}

/// Theis (T, S) inverter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TheisInverter {
    config: TheisConfig,
    fitter: NonlinearFitter,
}

impl TheisInverter {
    pub fn new(config: TheisConfig, fitting: FittingConfig) -> Self {
        Self {
            config,
            fitter: NonlinearFitter::new(fitting),
        }
    }

    /// Fit T and S jointly from the configured initial guess.
    ///
    /// The series must carry `pumping_rate` and `distance`, have at least
    /// `min_points` points and only positive times; its values are drawdowns (m).
    pub fn fit(&self, series: &TestMeasurementSeries) -> Result<TheisFit> {
        self.fit_from(
            series,
            self.config.initial_transmissivity,
            self.config.initial_storativity,
        )
    }

    /// Fit T and S jointly from an explicit initial guess.
    ///
    /// Nelder-Mead is local: a different guess may land in a different minimum.
    pub fn fit_from(
        &self,
        series: &TestMeasurementSeries,
        initial_transmissivity: f64,
        initial_storativity: f64,
    ) -> Result<TheisFit> {
        let (q, r) = self.check_series(series)?;
        require_positive("initial_transmissivity", initial_transmissivity)?;
        require_storativity(initial_storativity)?;

        let c = &self.config;
        let params = [
            Parameter::positive("T", initial_transmissivity, c.t_min, c.t_max),
            Parameter::positive("S", initial_storativity, c.s_min, c.s_max),
        ];
        let model = |p: &[f64], t: f64| forward(q, p[0], p[1], r, t);
        let fit = self
            .fitter
            .least_squares(model, &params, series.times(), series.values())?
            .ensure_converged(MODEL)?;

        Ok(self.finish(series, q, r, fit.parameters[0], fit.parameters[1], false, fit))
    }

    /// Fit T only, with S fixed by the caller, by a bounded scalar search
    /// over `[fixed_s_t_min, fixed_s_t_max]`.
    pub fn fit_with_storativity(
        &self,
        series: &TestMeasurementSeries,
        storativity: f64,
    ) -> Result<TheisFit> {
        let (q, r) = self.check_series(series)?;
        require_storativity(storativity)?;

        let c = &self.config;
        let params = [Parameter::positive(
            "T",
            c.initial_transmissivity.clamp(c.fixed_s_t_min, c.fixed_s_t_max),
            c.fixed_s_t_min,
            c.fixed_s_t_max,
        )];
        let model = |p: &[f64], t: f64| forward(q, p[0], storativity, r, t);
        let fit = self
            .fitter
            .least_squares(model, &params, series.times(), series.values())?
            .ensure_converged(MODEL)?;

        Ok(self.finish(series, q, r, fit.parameters[0], storativity, true, fit))
    }

    fn check_series(&self, series: &TestMeasurementSeries) -> Result<(f64, f64)> {
        require_points(MODEL, series.len(), self.config.min_points)?;
        let q = series.require_pumping_rate()?;
        let r = series.require_distance()?;
        series.require_positive_times(MODEL)?;
        Ok((q, r))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        series: &TestMeasurementSeries,
        q: f64,
        r: f64,
        transmissivity: f64,
        storativity: f64,
        storativity_fixed: bool,
        fit: super::fitter::LeastSquaresFit,
    ) -> TheisFit {
        let observed = series.values();
        let mean_drawdown = observed.iter().sum::<f64>() / observed.len() as f64;
        let success =
            mean_drawdown > 0.0 && fit.rmse < self.config.success_rmse_ratio * mean_drawdown;

        if success {
            info!(
                transmissivity,
                storativity,
                rmse = fit.rmse,
                iterations = fit.iterations,
                "Theis fit complete"
            );
        } else {
            warn!(
                rmse = fit.rmse,
                mean_drawdown,
                ratio = self.config.success_rmse_ratio,
                "Theis fit converged but RMSE exceeds the success threshold"
            );
        }

        TheisFit {
            transmissivity,
            storativity,
            rmse: fit.rmse,
            sse: fit.sse,
            success,
            storativity_fixed,
            iterations: fit.iterations,
            pumping_rate: q,
            distance: r,
            num_points: series.len(),
            residuals: fit.residuals(observed),
            fitted: fit.fitted,
        }
    }
}

/// Forward model used inside the objective: NaN outside the domain, which the
/// fitter turns into its penalty.
fn forward(q: f64, t: f64, s: f64, r: f64, time: f64) -> f64 {
    well_function(theis_u(t, s, r, time))
        .map(|w| q / (4.0 * PI * t) * w)
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(t: f64, s: f64) -> TestMeasurementSeries {
        let times: Vec<f64> = (0..30).map(|i| 60.0 * 1.25f64.powi(i)).collect();
        let drawdown = times
            .iter()
            .map(|&time| theis_drawdown(1e-3, t, s, 50.0, time).unwrap())
            .collect();
        TestMeasurementSeries::new(times, drawdown)
            .unwrap()
            .with_pumping_rate(1e-3)
            .with_distance(50.0)
    }

    #[test]
    fn test_forward_reference_point() {
        // u = 2500·1e-4 / (4·1e-3·1000) = 0.0625
        let s = theis_drawdown(1e-3, 1e-3, 1e-4, 50.0, 1000.0).unwrap();
        let expected = 1e-3 / (4.0 * PI * 1e-3) * well_function(0.0625).unwrap();
        assert!((s - expected).abs() < 1e-15);
    }

    #[test]
    fn test_recovers_noise_free_parameters_from_offset_guess() {
        let series = synthetic(5e-4, 2e-4);
        let fit = TheisInverter::default().fit(&series).unwrap();
        assert!((fit.transmissivity - 5e-4).abs() / 5e-4 < 1e-3, "T = {}", fit.transmissivity);
        assert!((fit.storativity - 2e-4).abs() / 2e-4 < 1e-2, "S = {}", fit.storativity);
        assert!(fit.success);
        assert!(!fit.storativity_fixed);
        assert_eq!(fit.residuals.len(), series.len());
    }

    #[test]
    fn test_fixed_storativity() {
        let series = synthetic(2e-3, 1e-4);
        let fit = TheisInverter::default()
            .fit_with_storativity(&series, 1e-4)
            .unwrap();
        assert!((fit.transmissivity - 2e-3).abs() / 2e-3 < 1e-4);
        assert_eq!(fit.storativity, 1e-4);
        assert!(fit.storativity_fixed);
    }

    #[test]
    fn test_fixed_storativity_out_of_range() {
        let series = synthetic(1e-3, 1e-4);
        let err = TheisInverter::default()
            .fit_with_storativity(&series, 1.5)
            .unwrap_err();
        assert!(matches!(err, InversionError::InvalidParameter { name: "storativity", .. }));
    }

    #[test]
    fn test_insufficient_data() {
        let series = TestMeasurementSeries::new(vec![60.0], vec![0.1])
            .unwrap()
            .with_pumping_rate(1e-3)
            .with_distance(50.0);
        let err = TheisInverter::default().fit(&series).unwrap_err();
        assert!(matches!(err, InversionError::InsufficientData { needed: 2, available: 1, .. }));
    }

    #[test]
    fn test_zero_time_rejected() {
        let series = TestMeasurementSeries::new(vec![0.0, 60.0], vec![0.0, 0.1])
            .unwrap()
            .with_pumping_rate(1e-3)
            .with_distance(50.0);
        let err = TheisInverter::default().fit(&series).unwrap_err();
        assert!(matches!(err, InversionError::InvalidDomain { .. }));
    }

    #[test]
    fn test_missing_distance() {
        let series = TestMeasurementSeries::new(vec![60.0, 120.0], vec![0.1, 0.2])
            .unwrap()
            .with_pumping_rate(1e-3);
        assert_eq!(
            TheisInverter::default().fit(&series).unwrap_err(),
            InversionError::MissingParameter("distance")
        );
    }

    #[test]
    fn test_curve_matches_forward() {
        let curve = theis_curve(1e-3, 1e-3, 1e-4, 50.0, &[100.0, 1000.0]).unwrap();
        assert_eq!(curve.drawdown.len(), 2);
        let direct = theis_drawdown(1e-3, 1e-3, 1e-4, 50.0, 1000.0).unwrap();
        assert_eq!(curve.drawdown[1], direct);
        assert!(theis_curve(1e-3, 1e-3, 1e-4, 50.0, &[0.0]).is_err());
    }
}
