//! Seeded synthetic test series
//!
//! Forward models evaluated at chosen times, with optional Gaussian noise,
//! packaged as ready-to-fit [`TestMeasurementSeries`]. Used to check that an
//! inverter recovers known parameters.
//!
//! Noise is additive with standard deviation `noise_fraction × mean(|clean|)`,
//! so a fraction of 0.01 is "1% of the mean signal". The same seed always
//! yields the same series.
//!
//! ## Usage
//!
//! ```ignore
//! let times = log_spaced_times(60.0, 86_400.0, 40);
//! let series = SyntheticGenerator::new(42)
//!     .with_noise(0.01)
//!     .theis(1e-3, 1e-3, 1e-4, 50.0, &times)?;
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::error::{require_positive, InversionError, Result};
use crate::inversion::{cooper_jacob_drawdown, lefranc_head, porchet_head, theis_drawdown};
use crate::types::TestMeasurementSeries;

/// `n` times evenly spaced in log10 between `start` and `end` (inclusive).
pub fn log_spaced_times(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let (lo, hi) = (start.log10(), end.log10());
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| 10f64.powf(lo + step * i as f64)).collect()
        }
    }
}

/// `n` times evenly spaced between `start` and `end` (inclusive).
pub fn linear_times(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Deterministic generator of noisy forward-model series.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    rng: StdRng,
    noise_fraction: f64,
}

impl SyntheticGenerator {
    /// Noise-free generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise_fraction: 0.0,
        }
    }

    /// Add Gaussian noise of `fraction × mean(|signal|)` standard deviation.
    pub fn with_noise(mut self, fraction: f64) -> Self {
        self.noise_fraction = fraction;
        self
    }

    /// Theis drawdowns; the series carries `pumping_rate` and `distance`.
    pub fn theis(
        &mut self,
        pumping_rate: f64,
        transmissivity: f64,
        storativity: f64,
        distance: f64,
        times: &[f64],
    ) -> Result<TestMeasurementSeries> {
        require_positive("distance", distance)?;
        let clean = times
            .iter()
            .map(|&t| theis_drawdown(pumping_rate, transmissivity, storativity, distance, t))
            .collect::<Result<Vec<f64>>>()?;
        let values = self.perturb(clean)?;
        Ok(TestMeasurementSeries::new(times.to_vec(), values)?
            .with_pumping_rate(pumping_rate)
            .with_distance(distance))
    }

    /// Semi-log Cooper-Jacob drawdowns (negative before t0).
    pub fn cooper_jacob(
        &mut self,
        pumping_rate: f64,
        transmissivity: f64,
        storativity: f64,
        distance: f64,
        times: &[f64],
    ) -> Result<TestMeasurementSeries> {
        let clean = times
            .iter()
            .map(|&t| cooper_jacob_drawdown(pumping_rate, transmissivity, storativity, distance, t))
            .collect::<Result<Vec<f64>>>()?;
        let values = self.perturb(clean)?;
        Ok(TestMeasurementSeries::new(times.to_vec(), values)?
            .with_pumping_rate(pumping_rate)
            .with_distance(distance))
    }

    /// Lefranc exponential head decay from `h0` toward `h_infinity`.
    pub fn lefranc(
        &mut self,
        h0: f64,
        h_infinity: f64,
        tau: f64,
        times: &[f64],
    ) -> Result<TestMeasurementSeries> {
        require_positive("tau", tau)?;
        let clean = times
            .iter()
            .map(|&t| lefranc_head(h0, h_infinity, tau, t))
            .collect();
        let values = self.perturb(clean)?;
        Ok(TestMeasurementSeries::new(times.to_vec(), values)?.with_initial_head(h0))
    }

    /// Porchet drained-hole heads; the series carries `radius` and `initial_head`.
    pub fn porchet(
        &mut self,
        initial_head: f64,
        conductivity: f64,
        radius: f64,
        times: &[f64],
    ) -> Result<TestMeasurementSeries> {
        require_positive("initial_head", initial_head)?;
        require_positive("radius", radius)?;
        let clean = times
            .iter()
            .map(|&t| porchet_head(initial_head, conductivity, radius, t))
            .collect();
        let values = self.perturb(clean)?;
        Ok(TestMeasurementSeries::new(times.to_vec(), values)?
            .with_radius(radius)
            .with_initial_head(initial_head))
    }

    fn perturb(&mut self, mut values: Vec<f64>) -> Result<Vec<f64>> {
        // Normal::new only rejects a non-finite std dev, not a negative one
        if !(self.noise_fraction.is_finite() && self.noise_fraction >= 0.0) {
            return Err(InversionError::parameter(
                "noise_fraction",
                format!("must be finite and >= 0 (got {})", self.noise_fraction),
            ));
        }
        if self.noise_fraction == 0.0 || values.is_empty() {
            return Ok(values);
        }
        let scale = values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64;
        let sigma = self.noise_fraction * scale;
        let noise = Normal::new(0.0, sigma)
            .map_err(|e| InversionError::parameter("noise_fraction", e.to_string()))?;
        debug!(sigma, points = values.len(), "adding synthetic noise");
        for v in &mut values {
            *v += noise.sample(&mut self.rng);
        }
        Ok(values)
    }
}
