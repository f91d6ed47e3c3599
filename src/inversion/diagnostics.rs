//! Shared fit diagnostics: ordinary least squares, RMSE, the drawdown
//! derivative used for flow-regime diagnosis, and the recovery-curve fit.

use tracing::info;

use super::fitter::{NonlinearFitter, Parameter};
use crate::config::defaults::MIN_VARIANCE_FLOOR;
use crate::error::{require_points, InversionError, Result};
use crate::types::RecoveryFit;

/// Ordinary least-squares line y = slope·x + intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Standard error of the slope (0 with fewer than 3 points)
    pub slope_std_error: f64,
    pub n: usize,
}

impl LinearRegression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit y = a·x + b by ordinary least squares.
///
/// Fails when fewer than 2 points are given or x has no spread.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LinearRegression> {
    if x.len() != y.len() {
        return Err(InversionError::parameter(
            "y",
            format!("length {} does not match {} abscissae", y.len(), x.len()),
        ));
    }
    require_points("linear regression", x.len(), 2)?;

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx < MIN_VARIANCE_FLOOR * MIN_VARIANCE_FLOOR {
        return Err(InversionError::parameter(
            "x",
            "abscissae have no spread (all values identical)",
        ));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();

    // A constant y is perfectly explained by a flat line
    let r_squared = if syy > 0.0 { (1.0 - sse / syy).clamp(0.0, 1.0) } else { 1.0 };
    let slope_std_error = if x.len() > 2 {
        (sse / (n - 2.0) / sxx).sqrt()
    } else {
        0.0
    };

    Ok(LinearRegression {
        slope,
        intercept,
        r_squared,
        slope_std_error,
        n: x.len(),
    })
}

/// Root-mean-square of observed − predicted.
pub fn rmse(observed: &[f64], predicted: &[f64]) -> f64 {
    let n = observed.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    let sse: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| (o - p).powi(2))
        .sum();
    (sse / n as f64).sqrt()
}

/// Drawdown derivative ds/d(log10 t) at every observation.
///
/// Second-order central differences on the (possibly uneven) log10 t grid,
/// first-order one-sided differences at both ends. A plateau marks radial
/// flow; a rising or falling derivative points at boundaries or leakage.
pub fn drawdown_derivative(times: &[f64], drawdown: &[f64]) -> Result<Vec<f64>> {
    if times.len() != drawdown.len() {
        return Err(InversionError::parameter(
            "drawdown",
            format!("length {} does not match {} times", drawdown.len(), times.len()),
        ));
    }
    require_points("drawdown derivative", times.len(), 2)?;
    if let Some((i, t)) = times.iter().enumerate().find(|(_, t)| **t <= 0.0) {
        return Err(InversionError::domain(
            "drawdown_derivative",
            format!("time[{i}] = {t} must be > 0"),
        ));
    }

    let x: Vec<f64> = times.iter().map(|t| t.log10()).collect();
    let n = x.len();
    if x.windows(2).any(|w| w[1] == w[0]) {
        return Err(InversionError::parameter("times", "duplicate time stamps"));
    }

    let mut derivative = Vec::with_capacity(n);
    derivative.push((drawdown[1] - drawdown[0]) / (x[1] - x[0]));
    for i in 1..n - 1 {
        let h_prev = x[i] - x[i - 1];
        let h_next = x[i + 1] - x[i];
        let value = (h_prev * h_prev * drawdown[i + 1] - h_next * h_next * drawdown[i - 1]
            + (h_next * h_next - h_prev * h_prev) * drawdown[i])
            / (h_prev * h_next * (h_prev + h_next));
        derivative.push(value);
    }
    if n > 2 {
        derivative.push((drawdown[n - 1] - drawdown[n - 2]) / (x[n - 1] - x[n - 2]));
    } else {
        derivative.push(derivative[0]);
    }
    Ok(derivative)
}

/// Fit a recovery curve h(t) = h_final·(1 − e^{−αt}) after pumping stops.
///
/// Starts from h_final = last observed value and α = 0.1 s⁻¹.
pub fn fit_recovery(
    fitter: &NonlinearFitter,
    times: &[f64],
    heads: &[f64],
) -> Result<RecoveryFit> {
    if times.len() != heads.len() {
        return Err(InversionError::parameter(
            "heads",
            format!("length {} does not match {} times", heads.len(), times.len()),
        ));
    }
    require_points("recovery", times.len(), 2)?;
    let last = heads[heads.len() - 1];

    let params = [
        Parameter::free("h_final", last),
        Parameter::positive("alpha", 0.1, 0.0, f64::INFINITY),
    ];
    let model = |p: &[f64], t: f64| p[0] * (1.0 - (-p[1] * t).exp());
    let fit = fitter
        .least_squares(model, &params, times, heads)?
        .ensure_converged("recovery")?;

    let (h_final, alpha) = (fit.parameters[0], fit.parameters[1]);
    info!(h_final, alpha, rmse = fit.rmse, "Recovery fit complete");

    Ok(RecoveryFit {
        h_final,
        alpha,
        tau_recovery: 1.0 / alpha,
        rmse: fit.rmse,
    })
}
