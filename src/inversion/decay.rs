//! Single-segment transient decay tests
//!
//! - **Lefranc**: h(t) = h∞ + (h0 − h∞)·e^{−t/τ}, fitted for (h0, h∞, τ), then
//!   τ → K through the cavity geometry.
//! - **Porchet**: H(t) = max(0, H0^{2/3} − (2K/r)·t)^{3/2}, fitted for K alone
//!   inside a bounded range.
//!
//! The Porchet clip at zero is a domain guard of the forward model: once the
//! radicand goes negative the hole has drained, and raising a negative
//! number to 3/2 has no real value.

use std::f64::consts::LN_2;

use tracing::info;

use super::fitter::{NonlinearFitter, Parameter};
use crate::config::{FittingConfig, LefrancConfig, PorchetConfig};
use crate::error::{require_points, require_positive, InversionError, Result};
use crate::types::{DecayGeometry, LefrancFit, PorchetFit, TestMeasurementSeries};

// ============================================================================
// Lefranc
// ============================================================================

/// Exponential head decay toward the formation head.
pub fn lefranc_head(h0: f64, h_infinity: f64, tau: f64, time: f64) -> f64 {
    h_infinity + (h0 - h_infinity) * (-time / tau).exp()
}

/// Convert a decay time constant into a hydraulic conductivity (m/s).
///
/// - Cylinder: K = ln2·r² / (τ·L)
/// - Packer:   K = r / (2·τ·L)
pub fn permeability_from_tau(
    tau: f64,
    radius: f64,
    length: f64,
    geometry: DecayGeometry,
) -> Result<f64> {
    require_positive("tau", tau)?;
    require_positive("radius", radius)?;
    require_positive("segment_length", length)?;
    Ok(match geometry {
        DecayGeometry::Cylinder => LN_2 * radius * radius / (tau * length),
        DecayGeometry::Packer => radius / (2.0 * tau * length),
    })
}

/// Lefranc (variable-head) inverter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LefrancInverter {
    config: LefrancConfig,
    fitter: NonlinearFitter,
}

impl LefrancInverter {
    pub fn new(config: LefrancConfig, fitting: FittingConfig) -> Self {
        Self {
            config,
            fitter: NonlinearFitter::new(fitting),
        }
    }

    /// Fit with h∞ initialised to the last observed head.
    pub fn fit(&self, series: &TestMeasurementSeries, geometry: DecayGeometry) -> Result<LefrancFit> {
        self.fit_with_aquifer_head(series, geometry, None)
    }

    /// Fit with an explicit initial guess for the formation head h∞.
    ///
    /// Radius and segment length come from the series, falling back to the
    /// configured defaults for the geometry.
    pub fn fit_with_aquifer_head(
        &self,
        series: &TestMeasurementSeries,
        geometry: DecayGeometry,
        aquifer_head: Option<f64>,
    ) -> Result<LefrancFit> {
        require_points("Lefranc", series.len(), self.config.min_points)?;
        let times = series.times();
        let heads = series.values();

        let radius = series
            .parameters()
            .radius
            .unwrap_or(self.config.default_radius_m);
        let length = series.parameters().segment_length.unwrap_or(match geometry {
            DecayGeometry::Cylinder => self.config.default_cylinder_length_m,
            DecayGeometry::Packer => self.config.default_packer_length_m,
        });
        require_positive("radius", radius)?;
        require_positive("segment_length", length)?;

        let t_last = times.iter().copied().fold(0.0, f64::max);
        require_positive("last observation time", t_last)?;
        let h_infinity_guess = match aquifer_head {
            Some(h) if h.is_finite() => h,
            Some(h) => {
                return Err(InversionError::parameter(
                    "aquifer_head",
                    format!("must be finite (got {h})"),
                ))
            }
            None => heads[heads.len() - 1],
        };

        let params = [
            Parameter::free("h0", heads[0]),
            Parameter::free("h_infinity", h_infinity_guess),
            Parameter::positive(
                "tau",
                t_last * self.config.initial_tau_fraction,
                0.0,
                f64::INFINITY,
            ),
        ];
        let model = |p: &[f64], t: f64| lefranc_head(p[0], p[1], p[2], t);
        let fit = self
            .fitter
            .least_squares(model, &params, times, heads)?
            .ensure_converged("Lefranc")?;

        let (h0, h_infinity, tau) = (fit.parameters[0], fit.parameters[1], fit.parameters[2]);
        let hydraulic_conductivity = permeability_from_tau(tau, radius, length, geometry)?;

        info!(
            %geometry,
            k = hydraulic_conductivity,
            tau,
            rmse = fit.rmse,
            "Lefranc fit complete"
        );

        Ok(LefrancFit {
            geometry,
            hydraulic_conductivity,
            tau,
            h0,
            h_infinity,
            rmse: fit.rmse,
            iterations: fit.iterations,
            radius,
            segment_length: length,
            num_points: series.len(),
        })
    }
}

// ============================================================================
// Porchet
// ============================================================================

/// H0^{2/3} − (2K/r)·t; negative once the hole has drained.
pub fn porchet_radicand(initial_head: f64, conductivity: f64, radius: f64, time: f64) -> f64 {
    initial_head.powf(2.0 / 3.0) - 2.0 * conductivity / radius * time
}

/// Porchet head with the radicand clipped at zero (m).
pub fn porchet_head(initial_head: f64, conductivity: f64, radius: f64, time: f64) -> f64 {
    porchet_radicand(initial_head, conductivity, radius, time)
        .max(0.0)
        .powf(1.5)
}

/// Porchet head without clipping: a negative radicand is an `InvalidDomain` error.
pub fn porchet_head_strict(
    initial_head: f64,
    conductivity: f64,
    radius: f64,
    time: f64,
) -> Result<f64> {
    let radicand = porchet_radicand(initial_head, conductivity, radius, time);
    if radicand < 0.0 {
        return Err(InversionError::domain(
            "porchet_head",
            format!("negative radicand {radicand:.3e} at t = {time} s (hole already drained)"),
        ));
    }
    Ok(radicand.powf(1.5))
}

/// Porchet (falling-head, loose formations) inverter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PorchetInverter {
    config: PorchetConfig,
    fitter: NonlinearFitter,
}

impl PorchetInverter {
    pub fn new(config: PorchetConfig, fitting: FittingConfig) -> Self {
        Self {
            config,
            fitter: NonlinearFitter::new(fitting),
        }
    }

    /// Fit K within `[k_min, k_max]`.
    ///
    /// The series must carry `radius`; H0 is `initial_head` when given,
    /// otherwise the first observed head.
    pub fn fit(&self, series: &TestMeasurementSeries) -> Result<PorchetFit> {
        require_points("Porchet", series.len(), self.config.min_points)?;
        let radius = series
            .parameters()
            .radius
            .ok_or(InversionError::MissingParameter("radius"))?;
        require_positive("radius", radius)?;
        let initial_head = match series.parameters().initial_head {
            Some(h0) => h0,
            None => series.values().first().copied().ok_or(
                InversionError::InsufficientData {
                    model: "Porchet",
                    needed: 1,
                    available: 0,
                },
            )?,
        };
        require_positive("initial_head", initial_head)?;

        let c = &self.config;
        let params = [Parameter::positive(
            "K",
            c.initial_k.clamp(c.k_min, c.k_max),
            c.k_min,
            c.k_max,
        )];
        let model = |p: &[f64], t: f64| porchet_head(initial_head, p[0], radius, t);
        let fit = self
            .fitter
            .least_squares(model, &params, series.times(), series.values())?
            .ensure_converged("Porchet")?;

        let k = fit.parameters[0];
        info!(k, rmse = fit.rmse, "Porchet fit complete");

        Ok(PorchetFit {
            hydraulic_conductivity: k,
            rmse: fit.rmse,
            radius,
            initial_head,
            iterations: fit.iterations,
            num_points: series.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permeability_from_tau() {
        let k = permeability_from_tau(100.0, 0.025, 2.0, DecayGeometry::Cylinder).unwrap();
        assert!((k - LN_2 * 0.025 * 0.025 / 200.0).abs() < 1e-18);
        let k = permeability_from_tau(100.0, 0.025, 1.0, DecayGeometry::Packer).unwrap();
        assert!((k - 0.025 / 200.0).abs() < 1e-18);
        assert!(permeability_from_tau(0.0, 0.025, 1.0, DecayGeometry::Packer).is_err());
    }

    #[test]
    fn test_lefranc_recovers_tau() {
        let times: Vec<f64> = (0..30).map(|i| i as f64 * 20.0).collect();
        let heads: Vec<f64> = times.iter().map(|&t| lefranc_head(3.0, 0.5, 120.0, t)).collect();
        let series = TestMeasurementSeries::new(times, heads).unwrap();
        let fit = LefrancInverter::default()
            .fit(&series, DecayGeometry::Cylinder)
            .unwrap();
        assert!((fit.tau - 120.0).abs() < 1e-4, "tau = {}", fit.tau);
        assert!((fit.h0 - 3.0).abs() < 1e-6);
        assert!((fit.h_infinity - 0.5).abs() < 1e-6);
        // default cylinder dimensions
        assert_eq!(fit.radius, 0.025);
        assert_eq!(fit.segment_length, 2.0);
        let expected = permeability_from_tau(fit.tau, 0.025, 2.0, DecayGeometry::Cylinder).unwrap();
        assert_eq!(fit.hydraulic_conductivity, expected);
    }

    #[test]
    fn test_lefranc_uses_series_geometry() {
        let times: Vec<f64> = (0..20).map(|i| i as f64 * 30.0).collect();
        let heads: Vec<f64> = times.iter().map(|&t| lefranc_head(2.0, 0.0, 90.0, t)).collect();
        let series = TestMeasurementSeries::new(times, heads)
            .unwrap()
            .with_radius(0.05)
            .with_segment_length(3.0);
        let fit = LefrancInverter::default()
            .fit_with_aquifer_head(&series, DecayGeometry::Packer, Some(0.0))
            .unwrap();
        assert_eq!(fit.segment_length, 3.0);
        assert!((fit.hydraulic_conductivity - 0.05 / (2.0 * 90.0 * 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_lefranc_needs_three_points() {
        let series = TestMeasurementSeries::new(vec![0.0, 10.0], vec![1.0, 0.5]).unwrap();
        assert!(matches!(
            LefrancInverter::default().fit(&series, DecayGeometry::Cylinder),
            Err(InversionError::InsufficientData { needed: 3, .. })
        ));
    }

    #[test]
    fn test_porchet_clipping_and_strict() {
        // H0 = 1, 2K/r = 0.01 → radicand reaches 0 at t = 100 s
        assert_eq!(porchet_head(1.0, 1e-4, 0.02, 150.0), 0.0);
        assert!((porchet_head(1.0, 1e-4, 0.02, 0.0) - 1.0).abs() < 1e-12);
        assert!(porchet_head_strict(1.0, 1e-4, 0.02, 50.0).is_ok());
        assert!(matches!(
            porchet_head_strict(1.0, 1e-4, 0.02, 150.0),
            Err(InversionError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_porchet_recovers_k() {
        let times: Vec<f64> = (0..15).map(|i| i as f64 * 20.0).collect();
        let heads: Vec<f64> = times
            .iter()
            .map(|&t| porchet_head(1.2, 2e-5, 0.05, t))
            .collect();
        let series = TestMeasurementSeries::new(times, heads)
            .unwrap()
            .with_radius(0.05);
        let fit = PorchetInverter::default().fit(&series).unwrap();
        assert!((fit.hydraulic_conductivity - 2e-5).abs() / 2e-5 < 1e-5);
        // H0 read back from the first head went through the 2/3 and 3/2 powers
        assert!((fit.initial_head - 1.2).abs() < 1e-12, "H0 = {}", fit.initial_head);

        let fit = PorchetInverter::default()
            .fit(&series.with_initial_head(1.2))
            .unwrap();
        assert_eq!(fit.initial_head, 1.2);
        assert!((fit.hydraulic_conductivity - 2e-5).abs() / 2e-5 < 1e-5);
    }

    #[test]
    fn test_porchet_empty_series_is_error_without_min_points() {
        let config = PorchetConfig {
            min_points: 0,
            ..PorchetConfig::default()
        };
        let inverter = PorchetInverter::new(config, FittingConfig::default());
        let series = TestMeasurementSeries::new(Vec::new(), Vec::new())
            .unwrap()
            .with_radius(0.05);
        assert!(matches!(
            inverter.fit(&series),
            Err(InversionError::InsufficientData { model: "Porchet", .. })
        ));
    }

    #[test]
    fn test_porchet_requires_radius() {
        let series = TestMeasurementSeries::new(vec![0.0, 10.0], vec![1.0, 0.9]).unwrap();
        assert_eq!(
            PorchetInverter::default().fit(&series).unwrap_err(),
            InversionError::MissingParameter("radius")
        );
    }
}
