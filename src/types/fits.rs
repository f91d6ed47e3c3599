//! Fit results produced by the inverters
//!
//! Each record is created by one `fit`-style call and is read-only afterwards.
//! A new fit produces a new record; nothing here is mutated in place.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DecayGeometry;

/// Seconds per day, for m/s → m/day conversions.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert a conductivity from m/s to m/day.
pub fn ms_to_m_per_day(k_ms: f64) -> f64 {
    k_ms * SECONDS_PER_DAY
}

// ============================================================================
// Theis
// ============================================================================

/// Result of a Theis (T, S) inversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheisFit {
    /// Transmissivity T (m²/s)
    pub transmissivity: f64,
    /// Storativity S (-)
    pub storativity: f64,
    /// Root-mean-square residual (m)
    pub rmse: f64,
    /// Sum of squared residuals (m²)
    pub sse: f64,
    /// RMSE below `success_rmse_ratio × mean(drawdown)`
    pub success: bool,
    /// True when S was fixed by the caller and only T was optimised
    pub storativity_fixed: bool,
    pub iterations: usize,
    pub pumping_rate: f64,
    pub distance: f64,
    pub num_points: usize,
    /// Modelled drawdown at each observed time (m)
    pub fitted: Vec<f64>,
    /// observed − modelled (m)
    pub residuals: Vec<f64>,
}

impl fmt::Display for TheisFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Theis results")?;
        writeln!(f, "=============")?;
        writeln!(f, "Pumping rate (Q):     {:.2e} m³/s", self.pumping_rate)?;
        writeln!(f, "Distance (r):         {:.2} m", self.distance)?;
        writeln!(f, "Transmissivity (T):   {:.2e} m²/s", self.transmissivity)?;
        writeln!(
            f,
            "Storativity (S):      {:.2e}{}",
            self.storativity,
            if self.storativity_fixed { " (fixed)" } else { "" }
        )?;
        writeln!(f, "RMSE:                 {:.4} m", self.rmse)?;
        write!(f, "Points:               {}", self.num_points)
    }
}

/// Theoretical Theis curve for plotting and residual diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheisCurve {
    pub transmissivity: f64,
    pub storativity: f64,
    pub time: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub u: Vec<f64>,
    pub w_u: Vec<f64>,
}

// ============================================================================
// Cooper-Jacob
// ============================================================================

/// Result of a Cooper-Jacob semi-log straight-line fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooperJacobFit {
    pub transmissivity: f64,
    pub storativity: f64,
    /// Δs per log10 cycle of time (m)
    pub slope: f64,
    /// Drawdown of the fitted line at t = 1 s (m)
    pub intercept: f64,
    /// Time where the fitted line crosses zero drawdown (s)
    pub t0: f64,
    /// RMSE against the straight line, not the Theis curve (m)
    pub rmse: f64,
    pub r_squared: f64,
    /// Share of observed times with u below the validity limit (%)
    pub validity_percent: f64,
    /// Min/max observed time inside the valid subset, if any (s)
    pub validity_window: Option<(f64, f64)>,
    /// u recomputed at every observed time with the fitted T, S
    pub u_values: Vec<f64>,
    /// Set when the validity percentage is below the configured minimum
    pub validity_warning: Option<String>,
    pub pumping_rate: f64,
    pub distance: f64,
    pub num_points: usize,
}

impl CooperJacobFit {
    /// True when enough points satisfy the small-u assumption.
    pub fn is_valid(&self) -> bool {
        self.validity_warning.is_none()
    }
}

impl fmt::Display for CooperJacobFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cooper-Jacob results")?;
        writeln!(f, "====================")?;
        writeln!(f, "Pumping rate (Q):     {:.2e} m³/s", self.pumping_rate)?;
        writeln!(f, "Distance (r):         {:.2} m", self.distance)?;
        writeln!(f, "Transmissivity (T):   {:.2e} m²/s", self.transmissivity)?;
        writeln!(f, "Storativity (S):      {:.2e}", self.storativity)?;
        writeln!(f, "Slope (Δs/Δlog10 t):  {:.4} m", self.slope)?;
        writeln!(f, "Intercept time (t0):  {:.2e} s", self.t0)?;
        writeln!(f, "RMSE:                 {:.4} m", self.rmse)?;
        match self.validity_window {
            Some((lo, hi)) => write!(
                f,
                "Validity (u<limit):   {:.1}% of points, {lo:.2e} - {hi:.2e} s",
                self.validity_percent
            ),
            None => write!(f, "Validity (u<limit):   no valid point"),
        }
    }
}

/// Straight-line Cooper-Jacob curve evaluated over a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooperJacobCurve {
    pub time: Vec<f64>,
    pub log10_time: Vec<f64>,
    pub drawdown: Vec<f64>,
    pub u: Vec<f64>,
}

// ============================================================================
// Lefranc / Porchet
// ============================================================================

/// Result of a Lefranc exponential-decay fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LefrancFit {
    pub geometry: DecayGeometry,
    /// Hydraulic conductivity K (m/s)
    pub hydraulic_conductivity: f64,
    /// Decay time constant τ (s)
    pub tau: f64,
    /// Fitted initial head h0 (m)
    pub h0: f64,
    /// Fitted equilibrium head h∞ (m)
    pub h_infinity: f64,
    pub rmse: f64,
    pub iterations: usize,
    pub radius: f64,
    pub segment_length: f64,
    pub num_points: usize,
}

impl fmt::Display for LefrancFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lefranc test results")?;
        writeln!(f, "====================")?;
        writeln!(f, "Geometry:             {}", self.geometry)?;
        writeln!(f, "Time constant (τ):    {:.2} s", self.tau)?;
        writeln!(f, "Conductivity (K):     {:.2e} m/s", self.hydraulic_conductivity)?;
        writeln!(
            f,
            "Conductivity:         {:.2e} m/day",
            ms_to_m_per_day(self.hydraulic_conductivity)
        )?;
        writeln!(f, "RMSE:                 {:.4} m", self.rmse)?;
        write!(f, "Points:               {}", self.num_points)
    }
}

/// Result of a Porchet falling-head fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PorchetFit {
    /// Hydraulic conductivity K (m/s)
    pub hydraulic_conductivity: f64,
    pub rmse: f64,
    pub radius: f64,
    pub initial_head: f64,
    pub iterations: usize,
    pub num_points: usize,
}

impl fmt::Display for PorchetFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Porchet test results")?;
        writeln!(f, "====================")?;
        writeln!(f, "Hole radius (r):      {:.3} m", self.radius)?;
        writeln!(f, "Initial head (H0):    {:.3} m", self.initial_head)?;
        writeln!(f, "Conductivity (K):     {:.2e} m/s", self.hydraulic_conductivity)?;
        writeln!(
            f,
            "Conductivity:         {:.2e} m/day",
            ms_to_m_per_day(self.hydraulic_conductivity)
        )?;
        writeln!(f, "RMSE:                 {:.4} m", self.rmse)?;
        write!(f, "Points:               {}", self.num_points)
    }
}

/// Result of a recovery-curve fit `h(t) = h_final·(1 − e^{−αt})`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryFit {
    pub h_final: f64,
    /// Recovery rate α (1/s)
    pub alpha: f64,
    /// Characteristic recovery time 1/α (s)
    pub tau_recovery: f64,
    pub rmse: f64,
}

// ============================================================================
// Lugeon
// ============================================================================

/// Reproducibility band of a Lugeon test, from the CV of per-step K.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LugeonQuality {
    /// CV < 0.15
    Excellent,
    /// 0.15 <= CV < 0.30
    Good,
    /// 0.30 <= CV < 0.50
    Fair,
    /// CV >= 0.50
    Poor,
}

impl LugeonQuality {
    pub fn label(&self) -> &'static str {
        match self {
            LugeonQuality::Excellent => "Excellent - highly reproducible",
            LugeonQuality::Good => "Good - reproducible",
            LugeonQuality::Fair => "Fair - acceptable",
            LugeonQuality::Poor => "Poor - too variable (check the test)",
        }
    }
}

impl fmt::Display for LugeonQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-step Lugeon evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LugeonStepResult {
    pub pressure_bar: f64,
    pub discharge_lpm: f64,
    /// Lugeon value normalised to the reference pressure (UL)
    pub lugeon: f64,
    /// Equivalent conductivity (m/s)
    pub conductivity: f64,
}

/// Aggregated Lugeon test result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LugeonResult {
    pub segment_length: f64,
    pub steps: Vec<LugeonStepResult>,
    /// Mean K (m/s) over the reference-pressure steps, or all steps as fallback
    pub k_mean: f64,
    pub lugeon_mean: f64,
    /// Population standard deviation of per-step K over all steps (m/s)
    pub k_std: f64,
    /// Coefficient of variation k_std / k_mean (0 when k_mean is 0)
    pub cv: f64,
    pub quality: LugeonQuality,
    /// True when the mean came from steps near the reference pressure
    pub used_reference_steps: bool,
}

impl LugeonResult {
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for LugeonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lugeon test results")?;
        writeln!(f, "===================")?;
        writeln!(f, "Segment length (L):   {:.2} m", self.segment_length)?;
        writeln!(f, "Mean conductivity:    {:.2e} m/s", self.k_mean)?;
        writeln!(f, "Mean conductivity:    {:.2e} m/day", ms_to_m_per_day(self.k_mean))?;
        writeln!(f, "Mean Lugeon (UL):     {:.2}", self.lugeon_mean)?;
        writeln!(f, "Coeff. of variation:  {:.1}%", self.cv * 100.0)?;
        writeln!(f, "Quality:              {}", self.quality)?;
        writeln!(f, "Steps:                {}", self.steps.len())?;
        for s in &self.steps {
            writeln!(
                f,
                "  P={:.0} bar: Q={:.1} L/min, UL={:.2}, K={:.2e} m/s",
                s.pressure_bar, s.discharge_lpm, s.lugeon, s.conductivity
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Piezometry
// ============================================================================

/// Descriptive statistics of a level series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStatistics {
    pub n_points: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation (m)
    pub std: f64,
    /// max − min (m)
    pub amplitude: f64,
}

/// Qualitative long-term trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Stable,
    Rising,
    Falling,
}

/// Least-squares trend of level against elapsed days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub slope_m_per_day: f64,
    pub slope_m_per_year: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Two-sided p-value of the slope (Student t, n − 2 dof)
    pub p_value: f64,
    /// Standard error of the slope (m/day)
    pub std_error: f64,
    pub direction: TrendDirection,
    /// e.g. "Stable", "Rising (0.120 m/yr)"
    pub interpretation: String,
    /// Fitted level at each elapsed day
    pub trend_line: Vec<f64>,
}

/// Amplitude band of the level series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmplitudeBand {
    /// amplitude > 1.0 m
    High,
    /// 0.3 m < amplitude <= 1.0 m
    Moderate,
    /// amplitude <= 0.3 m
    Low,
}

impl AmplitudeBand {
    pub fn label(&self) -> &'static str {
        match self {
            AmplitudeBand::High => "High amplitude - unconfined / semi-unconfined aquifer",
            AmplitudeBand::Moderate => "Moderate amplitude - confined/unconfined aquifer",
            AmplitudeBand::Low => "Low amplitude - confined / deep aquifer",
        }
    }
}

/// Reactivity band from the coefficient of variation of the levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reactivity {
    /// CV > 0.10
    VeryReactive,
    /// 0.05 < CV <= 0.10
    Reactive,
    /// CV <= 0.05
    Sluggish,
}

impl Reactivity {
    pub fn label(&self) -> &'static str {
        match self {
            Reactivity::VeryReactive => "Very reactive - aquifer close to the surface",
            Reactivity::Reactive => "Reactive - shallow aquifer",
            Reactivity::Sluggish => "Slow to react - deep/confined aquifer",
        }
    }
}

/// Heuristic aquifer classification from a level series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AquiferBehavior {
    pub behavior: AmplitudeBand,
    pub reactivity: Reactivity,
    pub amplitude_m: f64,
    /// std / mean of the levels (0 when the mean is not positive)
    pub std_normalized: f64,
}

/// Complete piezometric analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiezometryReport {
    pub statistics: LevelStatistics,
    pub trend: TrendReport,
    pub behavior: AquiferBehavior,
}

impl fmt::Display for PiezometryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.statistics;
        writeln!(f, "Piezometric analysis")?;
        writeln!(f, "====================")?;
        writeln!(f, "Points:               {}", s.n_points)?;
        writeln!(f, "Min / max level:      {:.3} / {:.3} m", s.min, s.max)?;
        writeln!(f, "Mean level:           {:.3} m", s.mean)?;
        writeln!(f, "Std deviation:        {:.3} m", s.std)?;
        writeln!(f, "Amplitude:            {:.3} m", s.amplitude)?;
        writeln!(f, "Slope:                {:.4} m/yr", self.trend.slope_m_per_year)?;
        writeln!(f, "R²:                   {:.3}", self.trend.r_squared)?;
        writeln!(f, "Trend:                {}", self.trend.interpretation)?;
        writeln!(f, "Behavior:             {}", self.behavior.behavior.label())?;
        write!(f, "Reactivity:           {}", self.behavior.reactivity.label())
    }
}

// ============================================================================
// FittedModel
// ============================================================================

/// Any inverter output, for callers that handle methods uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FittedModel {
    Theis(TheisFit),
    CooperJacob(CooperJacobFit),
    Lefranc(LefrancFit),
    Porchet(PorchetFit),
    Lugeon(LugeonResult),
}

impl FittedModel {
    pub fn method(&self) -> &'static str {
        match self {
            FittedModel::Theis(_) => "Theis",
            FittedModel::CooperJacob(_) => "Cooper-Jacob",
            FittedModel::Lefranc(_) => "Lefranc",
            FittedModel::Porchet(_) => "Porchet",
            FittedModel::Lugeon(_) => "Lugeon",
        }
    }

    /// RMSE of the fit; Lugeon has no time series and reports none.
    pub fn rmse(&self) -> Option<f64> {
        match self {
            FittedModel::Theis(f) => Some(f.rmse),
            FittedModel::CooperJacob(f) => Some(f.rmse),
            FittedModel::Lefranc(f) => Some(f.rmse),
            FittedModel::Porchet(f) => Some(f.rmse),
            FittedModel::Lugeon(_) => None,
        }
    }

    pub fn transmissivity(&self) -> Option<f64> {
        match self {
            FittedModel::Theis(f) => Some(f.transmissivity),
            FittedModel::CooperJacob(f) => Some(f.transmissivity),
            _ => None,
        }
    }

    pub fn storativity(&self) -> Option<f64> {
        match self {
            FittedModel::Theis(f) => Some(f.storativity),
            FittedModel::CooperJacob(f) => Some(f.storativity),
            _ => None,
        }
    }

    pub fn hydraulic_conductivity(&self) -> Option<f64> {
        match self {
            FittedModel::Lefranc(f) => Some(f.hydraulic_conductivity),
            FittedModel::Porchet(f) => Some(f.hydraulic_conductivity),
            FittedModel::Lugeon(r) => Some(r.k_mean),
            _ => None,
        }
    }

    /// Method-specific validity: Theis RMSE heuristic, Cooper-Jacob validity
    /// window, Lugeon reproducibility. Decay fits are valid once they exist.
    pub fn is_valid(&self) -> bool {
        match self {
            FittedModel::Theis(f) => f.success,
            FittedModel::CooperJacob(f) => f.is_valid(),
            FittedModel::Lefranc(_) | FittedModel::Porchet(_) => true,
            FittedModel::Lugeon(r) => r.quality != LugeonQuality::Poor,
        }
    }
}

impl fmt::Display for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FittedModel::Theis(fit) => fmt::Display::fmt(fit, f),
            FittedModel::CooperJacob(fit) => fmt::Display::fmt(fit, f),
            FittedModel::Lefranc(fit) => fmt::Display::fmt(fit, f),
            FittedModel::Porchet(fit) => fmt::Display::fmt(fit, f),
            FittedModel::Lugeon(result) => fmt::Display::fmt(result, f),
        }
    }
}

impl From<TheisFit> for FittedModel {
    fn from(fit: TheisFit) -> Self {
        FittedModel::Theis(fit)
    }
}

impl From<CooperJacobFit> for FittedModel {
    fn from(fit: CooperJacobFit) -> Self {
        FittedModel::CooperJacob(fit)
    }
}

impl From<LefrancFit> for FittedModel {
    fn from(fit: LefrancFit) -> Self {
        FittedModel::Lefranc(fit)
    }
}

impl From<PorchetFit> for FittedModel {
    fn from(fit: PorchetFit) -> Self {
        FittedModel::Porchet(fit)
    }
}

impl From<LugeonResult> for FittedModel {
    fn from(result: LugeonResult) -> Self {
        FittedModel::Lugeon(result)
    }
}
