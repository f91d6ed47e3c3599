//! Bounded nonlinear least squares
//!
//! Two `argmin` solvers behind one entry point:
//! - **Nelder-Mead simplex** ([`NelderMead`]) for 2-3 free parameters (Theis
//!   joint, Lefranc, recovery curve)
//! - **Brent bounded scalar search** ([`BrentOpt`]) for a single parameter
//!   with finite bounds (Theis with fixed S, Porchet)
//!
//! Positive physical quantities are searched in log10 space
//! ([`Scale::Log10`]), which keeps them positive and gives the simplex
//! comparable step sizes for T ≈ 1e-3 and S ≈ 1e-4.
//!
//! Trial points outside the bounds, or whose forward model produces a
//! non-finite value, score `penalty` instead of propagating NaN, so the
//! optimizer steers away from invalid regions.
//!
//! Both minimisers are deterministic: the same initial guess always gives
//! the same result. Different initial guesses may converge to different
//! local minima; `multi_start` trades time for robustness against that.

use argmin::core::{CostFunction, Error as ArgminError, Executor, State, TerminationReason};
use argmin::solver::brent::BrentOpt;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;

use crate::config::FittingConfig;
use crate::error::{InversionError, Result};

/// Search-space mapping of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Searched as-is
    Linear,
    /// Searched as log10(value); value must be > 0
    Log10,
}

impl Scale {
    fn to_search(self, value: f64) -> f64 {
        match self {
            Scale::Linear => value,
            Scale::Log10 => value.log10(),
        }
    }

    fn to_model(self, value: f64) -> f64 {
        match self {
            Scale::Linear => value,
            Scale::Log10 => 10f64.powf(value),
        }
    }
}

/// One free parameter: initial guess, admissible range and search scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub initial: f64,
    pub lower: f64,
    pub upper: f64,
    pub scale: Scale,
}

impl Parameter {
    /// Unbounded parameter searched on a linear scale (heads, levels).
    pub fn free(name: &'static str, initial: f64) -> Self {
        Self {
            name,
            initial,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            scale: Scale::Linear,
        }
    }

    /// Strictly positive parameter searched in log10 space within `[lower, upper]`.
    /// Pass `0.0` / `f64::INFINITY` for a one-sided range.
    pub fn positive(name: &'static str, initial: f64, lower: f64, upper: f64) -> Self {
        Self {
            name,
            initial,
            lower,
            upper,
            scale: Scale::Log10,
        }
    }

    fn admits(&self, value: f64) -> bool {
        let positive = self.scale == Scale::Linear || value > 0.0;
        positive && value >= self.lower && value <= self.upper
    }

    fn search_bounds(&self) -> (f64, f64) {
        (self.scale.to_search(self.lower), self.scale.to_search(self.upper))
    }
}

/// Outcome of a raw minimisation in search space.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Minimiser, in search space
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Outcome of a least-squares fit, in model space.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    pub parameters: Vec<f64>,
    /// Sum of squared residuals
    pub sse: f64,
    pub rmse: f64,
    /// Model evaluated at every observation
    pub fitted: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    penalty: f64,
}

impl LeastSquaresFit {
    /// Turn a non-converged, penalised or non-finite optimum into `FitConvergence`.
    pub fn ensure_converged(self, model: &'static str) -> Result<Self> {
        if !self.converged {
            return Err(InversionError::convergence(
                model,
                format!("optimizer did not converge after {} iterations", self.iterations),
            ));
        }
        if !self.sse.is_finite() || self.sse >= self.penalty {
            return Err(InversionError::convergence(
                model,
                "optimum lies in the penalised (physically invalid) region",
            ));
        }
        if let Some(p) = self.parameters.iter().find(|p| !p.is_finite()) {
            return Err(InversionError::convergence(
                model,
                format!("non-finite parameter estimate {p}"),
            ));
        }
        Ok(self)
    }

    /// observed − fitted, element-wise.
    pub fn residuals(&self, observed: &[f64]) -> Vec<f64> {
        observed
            .iter()
            .zip(&self.fitted)
            .map(|(o, f)| o - f)
            .collect()
    }
}

// ============================================================================
// Cost functions
// ============================================================================

/// Sum of squared residuals over search-space coordinates.
///
/// Each coordinate is mapped back through its [`Scale`] before the model is
/// evaluated, so the solver only ever sees the scaled parameters.
struct ScaledLeastSquares<'a, M> {
    model: &'a M,
    parameters: &'a [Parameter],
    x: &'a [f64],
    y: &'a [f64],
    penalty: f64,
}

impl<M> Clone for ScaledLeastSquares<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for ScaledLeastSquares<'_, M> {}

impl<M> ScaledLeastSquares<'_, M>
where
    M: Fn(&[f64], f64) -> f64,
{
    fn to_model(&self, search: &[f64]) -> Vec<f64> {
        self.parameters
            .iter()
            .zip(search)
            .map(|(p, s)| p.scale.to_model(*s))
            .collect()
    }

    fn evaluate(&self, search: &[f64]) -> f64 {
        let params = self.to_model(search);
        if !self.parameters.iter().zip(&params).all(|(p, v)| p.admits(*v)) {
            return self.penalty;
        }
        sum_of_squares(self.model, &params, self.x, self.y).unwrap_or(self.penalty)
    }
}

impl<M> CostFunction for ScaledLeastSquares<'_, M>
where
    M: Fn(&[f64], f64) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, search: &Self::Param) -> std::result::Result<f64, ArgminError> {
        Ok(self.evaluate(search))
    }
}

/// Arbitrary vector objective handed to the simplex.
struct SimplexCost<F>(F);

impl<F> CostFunction for SimplexCost<F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<f64, ArgminError> {
        Ok(sanitize((self.0)(x)))
    }
}

/// Scalar objective handed to Brent.
struct ScalarCost<F>(F);

impl<F> CostFunction for ScalarCost<F>
where
    F: Fn(f64) -> f64,
{
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<f64, ArgminError> {
        Ok(sanitize((self.0)(*x)))
    }
}

// ============================================================================
// NonlinearFitter
// ============================================================================

/// Generic bounded nonlinear least-squares minimiser.
#[derive(Debug, Clone, PartialEq)]
pub struct NonlinearFitter {
    config: FittingConfig,
}

impl Default for NonlinearFitter {
    fn default() -> Self {
        Self::new(FittingConfig::default())
    }
}

impl NonlinearFitter {
    pub fn new(config: FittingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FittingConfig {
        &self.config
    }

    /// Fit `model(params, x)` to `(x, y)` by minimising the sum of squared residuals.
    ///
    /// A single parameter with finite bounds uses the Brent bounded search;
    /// anything else uses Nelder-Mead from the parameters' initial values
    /// (and, when `multi_start` is on, from each scaled restart as well).
    /// Errors only when the solver itself fails; a poor optimum is reported
    /// through [`LeastSquaresFit::ensure_converged`].
    pub fn least_squares<M>(
        &self,
        model: M,
        parameters: &[Parameter],
        x: &[f64],
        y: &[f64],
    ) -> Result<LeastSquaresFit>
    where
        M: Fn(&[f64], f64) -> f64,
    {
        let objective = ScaledLeastSquares {
            model: &model,
            parameters,
            x,
            y,
            penalty: self.config.penalty,
        };

        let minimum = match parameters {
            [single] if single.lower.is_finite() && single.upper.is_finite() => {
                let (lo, hi) = single.search_bounds();
                self.minimize_scalar(|s| objective.evaluate(&[s]), lo, hi)?
            }
            _ => self.minimize_with_restarts(&objective, parameters)?,
        };

        let values = objective.to_model(&minimum.x);
        let fitted: Vec<f64> = x.iter().map(|&xi| model(&values, xi)).collect();
        let n = y.len().max(1) as f64;

        Ok(LeastSquaresFit {
            rmse: (minimum.value / n).sqrt(),
            sse: minimum.value,
            parameters: values,
            fitted,
            iterations: minimum.iterations,
            converged: minimum.converged,
            penalty: self.config.penalty,
        })
    }

    fn minimize_with_restarts<M>(
        &self,
        objective: &ScaledLeastSquares<'_, M>,
        parameters: &[Parameter],
    ) -> Result<Minimum>
    where
        M: Fn(&[f64], f64) -> f64,
    {
        let start: Vec<f64> = parameters
            .iter()
            .map(|p| p.scale.to_search(p.initial))
            .collect();
        let mut best = self.run_simplex(*objective, &start)?;
        if !self.config.multi_start {
            return Ok(best);
        }

        for &factor in &self.config.multi_start_scales {
            let restart: Vec<f64> = parameters
                .iter()
                .map(|p| match p.scale {
                    Scale::Log10 => {
                        let scaled = (p.initial * factor).clamp(p.lower, p.upper);
                        p.scale.to_search(scaled)
                    }
                    Scale::Linear => p.initial,
                })
                .collect();
            let candidate = self.run_simplex(*objective, &restart)?;
            debug!(
                factor,
                value = candidate.value,
                converged = candidate.converged,
                "multi-start candidate"
            );
            // Prefer converged candidates, then the lower objective
            let better = (candidate.converged && !best.converged)
                || (candidate.converged == best.converged && candidate.value < best.value);
            if better {
                best = candidate;
            }
        }
        Ok(best)
    }

    /// Nelder-Mead simplex minimisation of `f` from `start` (search space).
    ///
    /// The initial simplex perturbs each coordinate by 5 % (0.00025 for a
    /// zero coordinate). Converged once the standard deviation of the vertex
    /// costs drops below `f_tolerance`.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Result<Minimum>
    where
        F: Fn(&[f64]) -> f64,
    {
        if start.is_empty() {
            return Ok(Minimum {
                x: Vec::new(),
                value: f(&[]),
                iterations: 0,
                converged: true,
            });
        }
        self.run_simplex(SimplexCost(f), start)
    }

    fn run_simplex<O>(&self, problem: O, start: &[f64]) -> Result<Minimum>
    where
        O: CostFunction<Param = Vec<f64>, Output = f64>,
    {
        let solver = NelderMead::new(initial_simplex(start))
            .with_sd_tolerance(self.config.f_tolerance)
            .map_err(solver_error)?;
        let max_iters = self.max_iters();
        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(max_iters))
            .run()
            .map_err(solver_error)?;

        let state = result.state();
        Ok(Minimum {
            x: state
                .get_best_param()
                .cloned()
                .unwrap_or_else(|| start.to_vec()),
            value: state.get_best_cost(),
            iterations: iteration_count(state.get_iter()),
            converged: solver_converged(state.get_termination_reason()),
        })
    }

    /// Brent's bounded scalar minimisation of `f` over `[lower, upper]`
    /// (golden-section steps with parabolic interpolation).
    pub fn minimize_scalar<F>(&self, f: F, lower: f64, upper: f64) -> Result<Minimum>
    where
        F: Fn(f64) -> f64,
    {
        let (a, b) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        let solver = BrentOpt::new(a, b).set_tolerance(f64::EPSILON.sqrt(), self.config.x_tolerance);
        let max_iters = self.max_iters();
        let result = Executor::new(ScalarCost(f), solver)
            .configure(|state| state.max_iters(max_iters))
            .run()
            .map_err(solver_error)?;

        let state = result.state();
        Ok(Minimum {
            x: vec![state.get_best_param().copied().unwrap_or(0.5 * (a + b))],
            value: state.get_best_cost(),
            iterations: iteration_count(state.get_iter()),
            converged: solver_converged(state.get_termination_reason()),
        })
    }

    fn max_iters(&self) -> u64 {
        u64::try_from(self.config.max_iterations).unwrap_or(u64::MAX)
    }
}

fn initial_simplex(start: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(start.len() + 1);
    simplex.push(start.to_vec());
    for i in 0..start.len() {
        let mut vertex = start.to_vec();
        vertex[i] = if vertex[i] == 0.0 {
            0.00025
        } else {
            1.05 * vertex[i]
        };
        simplex.push(vertex);
    }
    simplex
}

fn solver_converged(reason: Option<&TerminationReason>) -> bool {
    matches!(reason, Some(TerminationReason::SolverConverged))
}

fn iteration_count(iter: u64) -> usize {
    usize::try_from(iter).unwrap_or(usize::MAX)
}

fn solver_error(err: ArgminError) -> InversionError {
    InversionError::convergence("optimizer", err.to_string())
}

/// Σ (y − model(params, x))², or `None` if any prediction is non-finite.
fn sum_of_squares<M>(model: &M, params: &[f64], x: &[f64], y: &[f64]) -> Option<f64>
where
    M: Fn(&[f64], f64) -> f64,
{
    let mut sse = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let predicted = model(params, xi);
        if !predicted.is_finite() {
            return None;
        }
        sse += (yi - predicted).powi(2);
    }
    sse.is_finite().then_some(sse)
}

/// NaN sorts as +∞ so it can never be selected as the best vertex.
fn sanitize(value: f64) -> f64 {
    if value.is_nan() {
        f64::INFINITY
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nelder_mead_rosenbrock() {
        let fitter = NonlinearFitter::default();
        let rosen = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let min = fitter.minimize(rosen, &[-1.2, 1.0]).unwrap();
        assert!(min.converged);
        assert!((min.x[0] - 1.0).abs() < 1e-3, "x = {:?}", min.x);
        assert!((min.x[1] - 1.0).abs() < 1e-3, "x = {:?}", min.x);
    }

    #[test]
    fn test_brent_parabola() {
        let fitter = NonlinearFitter::default();
        let min = fitter
            .minimize_scalar(|x| (x - 0.3).powi(2) + 2.0, -1.0, 4.0)
            .unwrap();
        assert!(min.converged);
        assert!((min.x[0] - 0.3).abs() < 1e-7);
        assert!((min.value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_least_squares_exponential_log_scale() {
        let fitter = NonlinearFitter::default();
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 5.0).collect();
        let y: Vec<f64> = x.iter().map(|t| 3.0 * (-t / 25.0).exp()).collect();
        let model = |p: &[f64], t: f64| p[0] * (-t / p[1]).exp();
        let params = [
            Parameter::free("a", 2.0),
            Parameter::positive("tau", 10.0, 0.0, f64::INFINITY),
        ];
        let fit = fitter
            .least_squares(model, &params, &x, &y)
            .unwrap()
            .ensure_converged("exp")
            .unwrap();
        assert!((fit.parameters[0] - 3.0).abs() < 1e-4, "{:?}", fit.parameters);
        assert!((fit.parameters[1] - 25.0).abs() < 1e-3, "{:?}", fit.parameters);
        assert!(fit.rmse < 1e-5);
    }

    #[test]
    fn test_single_bounded_parameter_uses_brent() {
        let fitter = NonlinearFitter::default();
        let x = [1.0, 2.0, 3.0];
        let y = [2e-4, 4e-4, 6e-4];
        let params = [Parameter::positive("k", 1e-3, 1e-6, 1e-2)];
        let fit = fitter
            .least_squares(|p, t| p[0] * t, &params, &x, &y)
            .unwrap()
            .ensure_converged("linear")
            .unwrap();
        assert!((fit.parameters[0] - 2e-4).abs() / 2e-4 < 1e-5);
    }

    #[test]
    fn test_invalid_region_is_penalised_not_nan() {
        let fitter = NonlinearFitter::default();
        // sqrt of a negative argument for p < 2: the fitter must stay finite
        let model = |p: &[f64], t: f64| (p[0] - 2.0).sqrt() * t;
        let x = [1.0, 2.0];
        let y = [1.0, 2.0];
        let fit = fitter
            .least_squares(model, &[Parameter::free("p", 5.0)], &x, &y)
            .unwrap();
        assert!(fit.sse.is_finite());
        assert!((fit.parameters[0] - 3.0).abs() < 1e-4, "p = {}", fit.parameters[0]);
    }

    #[test]
    fn test_all_penalty_is_convergence_error() {
        let fitter = NonlinearFitter::default();
        let model = |_: &[f64], _: f64| f64::NAN;
        let params = [Parameter::positive("k", 1e-4, 1e-7, 1e-2)];
        let result = fitter
            .least_squares(model, &params, &[1.0], &[1.0])
            .unwrap()
            .ensure_converged("nan");
        assert!(matches!(result, Err(InversionError::FitConvergence { .. })));
    }

    #[test]
    fn test_deterministic() {
        let fitter = NonlinearFitter::default();
        let f = |x: &[f64]| (x[0] - 1.5).powi(2) + (x[1] + 0.5).powi(4);
        let a = fitter.minimize(f, &[0.0, 0.0]).unwrap();
        let b = fitter.minimize(f, &[0.0, 0.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_multi_start_keeps_best_candidate() {
        let config = FittingConfig {
            multi_start: true,
            ..FittingConfig::default()
        };
        let fitter = NonlinearFitter::new(config);
        let x: Vec<f64> = (1..=10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|t| 4e-3 * t).collect();
        let params = [
            Parameter::positive("slope", 1e-5, 1e-9, 1.0),
            Parameter::free("offset", 0.0),
        ];
        let fit = fitter
            .least_squares(|p, t| p[0] * t + p[1], &params, &x, &y)
            .unwrap()
            .ensure_converged("line")
            .unwrap();
        assert!((fit.parameters[0] - 4e-3).abs() / 4e-3 < 1e-3, "{:?}", fit.parameters);
    }
}
