//! Analysis Configuration - every inversion and advisory threshold as a TOML value
//!
//! Each section implements `Default` with the reference constants, so an
//! absent file (or an absent key) reproduces the stock behavior exactly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults::{CONFIG_ENV_VAR, CONFIG_FILE_NAME};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an analysis session.
///
/// Load with `AnalysisConfig::load()` which searches:
/// 1. `$HYDRO_CONFIG` env var
/// 2. `./hydro_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Nelder-Mead / Brent optimizer settings shared by the nonlinear fits
    #[serde(default)]
    pub fitting: FittingConfig,

    #[serde(default)]
    pub theis: TheisConfig,

    #[serde(default)]
    pub cooper_jacob: CooperJacobConfig,

    #[serde(default)]
    pub lefranc: LefrancConfig,

    #[serde(default)]
    pub porchet: PorchetConfig,

    #[serde(default)]
    pub lugeon: LugeonConfig,

    #[serde(default)]
    pub piezometry: PiezometryConfig,

    /// Outlier detector thresholds and contamination bands
    #[serde(default)]
    pub anomaly: AnomalyConfig,

    /// Rule thresholds of the validation engine
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl AnalysisConfig {
    /// Load configuration using the standard search order:
    /// 1. `$HYDRO_CONFIG` environment variable
    /// 2. `./hydro_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded analysis config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded analysis config from ./{CONFIG_FILE_NAME}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{CONFIG_FILE_NAME}, using defaults");
                }
            }
        }

        info!("No {CONFIG_FILE_NAME} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::parse_toml(&contents, path)
    }

    /// Parse a TOML document that did not come from disk (tests, embedded presets).
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse_toml(contents, Path::new("<inline>"))
    }

    fn parse_toml(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        // Two-pass: unknown keys only warn, serde then fills defaults
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(origin.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Write the config to a file, e.g. to seed an editable `hydro_config.toml`.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Analysis config saved");
        Ok(())
    }

    /// Validate all thresholds for internal consistency.
    ///
    /// Rules:
    /// - Banded thresholds must be ordered (CV bands, contamination bands, ...)
    /// - Search bounds must satisfy lower < upper
    /// - Tolerances, iteration limits and minimum point counts must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let fit = &self.fitting;
        if fit.max_iterations == 0 {
            errors.push("fitting.max_iterations must be > 0".to_string());
        }
        if fit.x_tolerance <= 0.0 {
            errors.push("fitting.x_tolerance must be > 0".to_string());
        }
        if fit.f_tolerance <= 0.0 {
            errors.push("fitting.f_tolerance must be > 0".to_string());
        }
        if fit.penalty <= 0.0 {
            errors.push("fitting.penalty must be > 0".to_string());
        }
        if fit.multi_start_scales.iter().any(|s| *s <= 0.0) {
            errors.push("fitting.multi_start_scales must all be > 0".to_string());
        }

        let th = &self.theis;
        Self::check_bounds(th.t_min, th.t_max, "theis.t", &mut errors);
        Self::check_bounds(th.s_min, th.s_max, "theis.s", &mut errors);
        Self::check_bounds(th.fixed_s_t_min, th.fixed_s_t_max, "theis.fixed_s_t", &mut errors);
        if th.min_points < 2 {
            errors.push("theis.min_points must be >= 2".to_string());
        }
        if th.success_rmse_ratio <= 0.0 {
            errors.push("theis.success_rmse_ratio must be > 0".to_string());
        }

        if self.cooper_jacob.min_points < 2 {
            errors.push("cooper_jacob.min_points must be >= 2".to_string());
        }
        if !(0.0..=100.0).contains(&self.cooper_jacob.min_validity_percent) {
            errors.push("cooper_jacob.min_validity_percent must be within [0, 100]".to_string());
        }

        if self.lefranc.min_points < 3 {
            errors.push("lefranc.min_points must be >= 3 (three free parameters)".to_string());
        }
        if self.lefranc.initial_tau_fraction <= 0.0 {
            errors.push("lefranc.initial_tau_fraction must be > 0".to_string());
        }

        Self::check_bounds(self.porchet.k_min, self.porchet.k_max, "porchet.k", &mut errors);
        if self.porchet.min_points == 0 {
            errors.push("porchet.min_points must be > 0".to_string());
        }

        let lu = &self.lugeon;
        Self::check_escalation(lu.cv_excellent, lu.cv_good, "lugeon.cv_excellent/cv_good", &mut errors);
        Self::check_escalation(lu.cv_good, lu.cv_fair, "lugeon.cv_good/cv_fair", &mut errors);
        if lu.pressure_tolerance_bar < 0.0 {
            errors.push("lugeon.pressure_tolerance_bar cannot be negative".to_string());
        }

        let pz = &self.piezometry;
        Self::check_escalation(
            pz.amplitude_moderate_m,
            pz.amplitude_high_m,
            "piezometry.amplitude",
            &mut errors,
        );
        Self::check_escalation(
            pz.reactivity_moderate,
            pz.reactivity_high,
            "piezometry.reactivity",
            &mut errors,
        );
        if pz.days_per_year <= 0.0 {
            errors.push("piezometry.days_per_year must be > 0".to_string());
        }
        if pz.min_points < 3 {
            errors.push("piezometry.min_points must be >= 3".to_string());
        }

        let an = &self.anomaly;
        Self::check_escalation(
            an.status_excellent_rate,
            an.status_good_rate,
            "anomaly.status_excellent_rate/status_good_rate",
            &mut errors,
        );
        Self::check_escalation(
            an.status_good_rate,
            an.status_attention_rate,
            "anomaly.status_good_rate/status_attention_rate",
            &mut errors,
        );
        if an.zscore_threshold <= 0.0 || an.comprehensive_zscore_threshold <= 0.0 {
            errors.push("anomaly z-score thresholds must be > 0".to_string());
        }
        if an.iqr_multiplier < 0.0 {
            errors.push("anomaly.iqr_multiplier cannot be negative".to_string());
        }
        if an.spatial_neighbors == 0 {
            errors.push("anomaly.spatial_neighbors must be > 0".to_string());
        }

        let va = &self.validation;
        Self::check_escalation(va.u_low, va.u_high, "validation.u_low/u_high", &mut errors);
        Self::check_escalation(
            va.captive_ratio,
            va.free_ratio,
            "validation.captive_ratio/free_ratio",
            &mut errors,
        );
        if va.issue_penalty < 0.0 || va.warning_penalty < 0.0 {
            errors.push("validation penalties cannot be negative".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // Reject NaN/Inf in any value (sweep all f64 fields via serialization)
        if let Ok(s) = toml::to_string(self) {
            if s.contains("nan") || s.contains("inf") {
                errors.push(
                    "Config contains NaN or Inf values, all thresholds must be finite numbers"
                        .to_string(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_escalation(lower: f64, upper: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !lower.is_finite() || !upper.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got {lower}, {upper})"
            ));
            return;
        }
        if upper < lower {
            errors.push(format!(
                "{name}: upper band ({upper:.3}) must be >= lower band ({lower:.3})"
            ));
        }
    }

    fn check_bounds(min: f64, max: f64, name: &str, errors: &mut Vec<String>) {
        if !(min > 0.0 && max.is_finite() && min < max) {
            errors.push(format!(
                "{name}_min ({min:e}) must be > 0 and < {name}_max ({max:e})"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Fitting
// ============================================================================

/// Optimizer settings shared by the Theis, Lefranc, Porchet and recovery fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingConfig {
    /// Iteration cap handed to the argmin executor for both solvers.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Absolute tolerance of the Brent scalar search (search-space units).
    #[serde(default = "default_x_tolerance")]
    pub x_tolerance: f64,

    /// Nelder-Mead stops once the standard deviation of the simplex costs
    /// falls below this value.
    #[serde(default = "default_f_tolerance")]
    pub f_tolerance: f64,

    /// Objective value returned for invalid trial parameters.
    #[serde(default = "default_penalty")]
    pub penalty: f64,

    /// Restart the nonlinear fits from a fixed grid of scaled initial guesses.
    /// Off by default: single-guess behavior is the reference behavior.
    #[serde(default)]
    pub multi_start: bool,

    /// Multipliers applied to the primary initial guess when `multi_start` is on.
    #[serde(default = "default_multi_start_scales")]
    pub multi_start_scales: Vec<f64>,
}

fn default_max_iterations() -> usize { 5000 }
fn default_x_tolerance() -> f64 { 1e-10 }
fn default_f_tolerance() -> f64 { 1e-12 }
fn default_penalty() -> f64 { 1e10 }
fn default_multi_start_scales() -> Vec<f64> { vec![0.01, 0.1, 10.0, 100.0] }

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            x_tolerance: default_x_tolerance(),
            f_tolerance: default_f_tolerance(),
            penalty: default_penalty(),
            multi_start: false,
            multi_start_scales: default_multi_start_scales(),
        }
    }
}

// ============================================================================
// Theis
// ============================================================================

/// Theis inversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheisConfig {
    /// Initial transmissivity guess (m²/s).
    #[serde(default = "default_initial_transmissivity")]
    pub initial_transmissivity: f64,

    /// Initial storativity guess (-).
    #[serde(default = "default_initial_storativity")]
    pub initial_storativity: f64,

    /// Lower bound of the 1-D T search when S is fixed (m²/s).
    #[serde(default = "default_fixed_s_t_min")]
    pub fixed_s_t_min: f64,

    /// Upper bound of the 1-D T search when S is fixed (m²/s).
    #[serde(default = "default_fixed_s_t_max")]
    pub fixed_s_t_max: f64,

    /// Joint fit: admissible T range (m²/s), outside which the objective is penalised.
    #[serde(default = "default_theis_t_min")]
    pub t_min: f64,
    #[serde(default = "default_theis_t_max")]
    pub t_max: f64,

    /// Joint fit: admissible S range (-).
    #[serde(default = "default_theis_s_min")]
    pub s_min: f64,
    #[serde(default = "default_theis_s_max")]
    pub s_max: f64,

    /// Fit is flagged successful when RMSE < ratio × mean(drawdown).
    #[serde(default = "default_success_rmse_ratio")]
    pub success_rmse_ratio: f64,

    #[serde(default = "default_theis_min_points")]
    pub min_points: usize,
}

fn default_initial_transmissivity() -> f64 { 1e-3 }
fn default_initial_storativity() -> f64 { 1e-4 }
fn default_fixed_s_t_min() -> f64 { 1e-6 }
fn default_fixed_s_t_max() -> f64 { 1.0 }
fn default_theis_t_min() -> f64 { 1e-9 }
fn default_theis_t_max() -> f64 { 10.0 }
fn default_theis_s_min() -> f64 { 1e-9 }
fn default_theis_s_max() -> f64 { 0.5 }
fn default_success_rmse_ratio() -> f64 { 0.1 }
fn default_theis_min_points() -> usize { 2 }

impl Default for TheisConfig {
    fn default() -> Self {
        Self {
            initial_transmissivity: default_initial_transmissivity(),
            initial_storativity: default_initial_storativity(),
            fixed_s_t_min: default_fixed_s_t_min(),
            fixed_s_t_max: default_fixed_s_t_max(),
            t_min: default_theis_t_min(),
            t_max: default_theis_t_max(),
            s_min: default_theis_s_min(),
            s_max: default_theis_s_max(),
            success_rmse_ratio: default_success_rmse_ratio(),
            min_points: default_theis_min_points(),
        }
    }
}

// ============================================================================
// Cooper-Jacob
// ============================================================================

/// Cooper-Jacob straight-line settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooperJacobConfig {
    /// Points with u below this satisfy the semi-log approximation.
    #[serde(default = "default_u_limit")]
    pub u_limit: f64,

    /// Below this validity share (%) the fit carries a warning.
    #[serde(default = "default_min_validity_percent")]
    pub min_validity_percent: f64,

    #[serde(default = "default_cj_min_points")]
    pub min_points: usize,
}

fn default_u_limit() -> f64 { 0.05 }
fn default_min_validity_percent() -> f64 { 50.0 }
fn default_cj_min_points() -> usize { 2 }

impl Default for CooperJacobConfig {
    fn default() -> Self {
        Self {
            u_limit: default_u_limit(),
            min_validity_percent: default_min_validity_percent(),
            min_points: default_cj_min_points(),
        }
    }
}

// ============================================================================
// Lefranc / Porchet
// ============================================================================

/// Lefranc decay settings and default cavity dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LefrancConfig {
    /// Cavity / packer radius used when the series carries none (m).
    #[serde(default = "default_lefranc_radius")]
    pub default_radius_m: f64,

    /// Cavity length for the cylinder geometry when the series carries none (m).
    #[serde(default = "default_cylinder_length")]
    pub default_cylinder_length_m: f64,

    /// Segment length for the packer geometry when the series carries none (m).
    #[serde(default = "default_packer_length")]
    pub default_packer_length_m: f64,

    /// Initial τ guess as a fraction of the last observation time.
    #[serde(default = "default_initial_tau_fraction")]
    pub initial_tau_fraction: f64,

    #[serde(default = "default_lefranc_min_points")]
    pub min_points: usize,
}

fn default_lefranc_radius() -> f64 { 0.025 }
fn default_cylinder_length() -> f64 { 2.0 }
fn default_packer_length() -> f64 { 1.0 }
fn default_initial_tau_fraction() -> f64 { 0.1 }
fn default_lefranc_min_points() -> usize { 3 }

impl Default for LefrancConfig {
    fn default() -> Self {
        Self {
            default_radius_m: default_lefranc_radius(),
            default_cylinder_length_m: default_cylinder_length(),
            default_packer_length_m: default_packer_length(),
            initial_tau_fraction: default_initial_tau_fraction(),
            min_points: default_lefranc_min_points(),
        }
    }
}

/// Porchet falling-head settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PorchetConfig {
    /// Initial K guess (m/s).
    #[serde(default = "default_porchet_initial_k")]
    pub initial_k: f64,

    /// Admissible K range (m/s); the forward model is meaningless outside it.
    #[serde(default = "default_porchet_k_min")]
    pub k_min: f64,
    #[serde(default = "default_porchet_k_max")]
    pub k_max: f64,

    #[serde(default = "default_porchet_min_points")]
    pub min_points: usize,
}

fn default_porchet_initial_k() -> f64 { 1e-4 }
fn default_porchet_k_min() -> f64 { 1e-7 }
fn default_porchet_k_max() -> f64 { 1e-2 }
fn default_porchet_min_points() -> usize { 2 }

impl Default for PorchetConfig {
    fn default() -> Self {
        Self {
            initial_k: default_porchet_initial_k(),
            k_min: default_porchet_k_min(),
            k_max: default_porchet_k_max(),
            min_points: default_porchet_min_points(),
        }
    }
}

// ============================================================================
// Lugeon
// ============================================================================

/// Lugeon normalisation and reproducibility bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LugeonConfig {
    /// Reference injection pressure the Lugeon unit is normalised to (bar).
    #[serde(default = "default_reference_pressure")]
    pub reference_pressure_bar: f64,

    /// Steps within this distance of the reference pressure drive the mean (bar).
    #[serde(default = "default_pressure_tolerance")]
    pub pressure_tolerance_bar: f64,

    /// CV below this is "excellent".
    #[serde(default = "default_cv_excellent")]
    pub cv_excellent: f64,

    /// CV below this is "good".
    #[serde(default = "default_cv_good")]
    pub cv_good: f64,

    /// CV below this is "fair"; at or above it the test is "poor".
    #[serde(default = "default_cv_fair")]
    pub cv_fair: f64,
}

fn default_reference_pressure() -> f64 { 10.0 }
fn default_pressure_tolerance() -> f64 { 1.0 }
fn default_cv_excellent() -> f64 { 0.15 }
fn default_cv_good() -> f64 { 0.30 }
fn default_cv_fair() -> f64 { 0.50 }

impl Default for LugeonConfig {
    fn default() -> Self {
        Self {
            reference_pressure_bar: default_reference_pressure(),
            pressure_tolerance_bar: default_pressure_tolerance(),
            cv_excellent: default_cv_excellent(),
            cv_good: default_cv_good(),
            cv_fair: default_cv_fair(),
        }
    }
}

// ============================================================================
// Piezometry
// ============================================================================

/// Trend and behavior breakpoints for level series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiezometryConfig {
    /// |slope| below this is "stable" (m/yr).
    #[serde(default = "default_stable_slope")]
    pub stable_slope_m_per_year: f64,

    /// Amplitude above this is "high" (m).
    #[serde(default = "default_amplitude_high")]
    pub amplitude_high_m: f64,

    /// Amplitude above this is "moderate" (m).
    #[serde(default = "default_amplitude_moderate")]
    pub amplitude_moderate_m: f64,

    /// std/mean above this is "very reactive".
    #[serde(default = "default_reactivity_high")]
    pub reactivity_high: f64,

    /// std/mean above this is "reactive".
    #[serde(default = "default_reactivity_moderate")]
    pub reactivity_moderate: f64,

    #[serde(default = "default_days_per_year")]
    pub days_per_year: f64,

    #[serde(default = "default_piezo_min_points")]
    pub min_points: usize,
}

fn default_stable_slope() -> f64 { 0.01 }
fn default_amplitude_high() -> f64 { 1.0 }
fn default_amplitude_moderate() -> f64 { 0.3 }
fn default_reactivity_high() -> f64 { 0.10 }
fn default_reactivity_moderate() -> f64 { 0.05 }
fn default_days_per_year() -> f64 { 365.25 }
fn default_piezo_min_points() -> usize { 3 }

impl Default for PiezometryConfig {
    fn default() -> Self {
        Self {
            stable_slope_m_per_year: default_stable_slope(),
            amplitude_high_m: default_amplitude_high(),
            amplitude_moderate_m: default_amplitude_moderate(),
            reactivity_high: default_reactivity_high(),
            reactivity_moderate: default_reactivity_moderate(),
            days_per_year: default_days_per_year(),
            min_points: default_piezo_min_points(),
        }
    }
}

// ============================================================================
// Anomaly Detection
// ============================================================================

/// Outlier detector thresholds and contamination → status bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Default |z| threshold of the stand-alone z-score detector.
    #[serde(default = "default_zscore_threshold")]
    pub zscore_threshold: f64,

    /// |z| threshold used inside `comprehensive_check`.
    #[serde(default = "default_comprehensive_zscore")]
    pub comprehensive_zscore_threshold: f64,

    /// Tukey fence multiplier.
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,

    /// Number of spatial neighbors (k).
    #[serde(default = "default_spatial_neighbors")]
    pub spatial_neighbors: usize,

    /// Deviation from the neighbor mean, in neighbor standard deviations.
    #[serde(default = "default_spatial_sigma")]
    pub spatial_sigma: f64,

    /// Contamination rate below this is EXCELLENT.
    #[serde(default = "default_status_excellent_rate")]
    pub status_excellent_rate: f64,

    /// Contamination rate below this is BON.
    #[serde(default = "default_status_good_rate")]
    pub status_good_rate: f64,

    /// Contamination rate below this is ATTENTION; at or above it RÉVISER.
    #[serde(default = "default_status_attention_rate")]
    pub status_attention_rate: f64,

    #[serde(default = "default_confidence_excellent")]
    pub confidence_excellent: f64,
    #[serde(default = "default_confidence_good")]
    pub confidence_good: f64,
    #[serde(default = "default_confidence_attention")]
    pub confidence_attention: f64,
    #[serde(default = "default_confidence_review")]
    pub confidence_review: f64,
}

fn default_zscore_threshold() -> f64 { 3.0 }
fn default_comprehensive_zscore() -> f64 { 2.5 }
fn default_iqr_multiplier() -> f64 { 1.5 }
fn default_spatial_neighbors() -> usize { 5 }
fn default_spatial_sigma() -> f64 { 3.0 }
fn default_status_excellent_rate() -> f64 { 0.05 }
fn default_status_good_rate() -> f64 { 0.10 }
fn default_status_attention_rate() -> f64 { 0.20 }
fn default_confidence_excellent() -> f64 { 95.0 }
fn default_confidence_good() -> f64 { 85.0 }
fn default_confidence_attention() -> f64 { 70.0 }
fn default_confidence_review() -> f64 { 50.0 }

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            zscore_threshold: default_zscore_threshold(),
            comprehensive_zscore_threshold: default_comprehensive_zscore(),
            iqr_multiplier: default_iqr_multiplier(),
            spatial_neighbors: default_spatial_neighbors(),
            spatial_sigma: default_spatial_sigma(),
            status_excellent_rate: default_status_excellent_rate(),
            status_good_rate: default_status_good_rate(),
            status_attention_rate: default_status_attention_rate(),
            confidence_excellent: default_confidence_excellent(),
            confidence_good: default_confidence_good(),
            confidence_attention: default_confidence_attention(),
            confidence_review: default_confidence_review(),
        }
    }
}

// ============================================================================
// Validation Engine
// ============================================================================

/// Rule thresholds of the parameter validation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// T above this warns "very high transmissivity" (m²/s).
    #[serde(default = "default_t_high")]
    pub t_high: f64,

    /// S below this warns "very low storativity".
    #[serde(default = "default_s_low")]
    pub s_low: f64,

    /// u at the last observation time below this warns (late-time only data).
    #[serde(default = "default_u_low")]
    pub u_low: f64,

    /// u at the last observation time above this warns (early-time only data).
    #[serde(default = "default_u_high")]
    pub u_high: f64,

    /// K above this is physically impossible (m/s).
    #[serde(default = "default_k_max")]
    pub k_max: f64,

    /// S/porosity below this suggests a strongly confined aquifer.
    #[serde(default = "default_captive_ratio")]
    pub captive_ratio: f64,

    /// S/porosity above this suggests a very free (unconfined) aquifer.
    #[serde(default = "default_free_ratio")]
    pub free_ratio: f64,

    /// Confidence points removed per blocking issue.
    #[serde(default = "default_issue_penalty")]
    pub issue_penalty: f64,

    /// Confidence points removed per warning.
    #[serde(default = "default_warning_penalty")]
    pub warning_penalty: f64,
}

fn default_t_high() -> f64 { 1e-2 }
fn default_s_low() -> f64 { 1e-6 }
fn default_u_low() -> f64 { 1e-4 }
fn default_u_high() -> f64 { 10.0 }
fn default_k_max() -> f64 { 1.0 }
fn default_captive_ratio() -> f64 { 1e-6 }
fn default_free_ratio() -> f64 { 0.1 }
fn default_issue_penalty() -> f64 { 20.0 }
fn default_warning_penalty() -> f64 { 5.0 }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            t_high: default_t_high(),
            s_low: default_s_low(),
            u_low: default_u_low(),
            u_high: default_u_high(),
            k_max: default_k_max(),
            captive_ratio: default_captive_ratio(),
            free_ratio: default_free_ratio(),
            issue_penalty: default_issue_penalty(),
            warning_penalty: default_warning_penalty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok(), "defaults must pass validation");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
[theis]
initial_transmissivity = 5e-4
"#,
        )
        .unwrap();
        assert_eq!(config.theis.initial_transmissivity, 5e-4);
        assert_eq!(config.theis.initial_storativity, 1e-4);
        assert_eq!(config.lugeon.cv_fair, 0.50);
        assert!(!config.fitting.multi_start);
    }

    #[test]
    fn test_unordered_cv_bands_rejected() {
        let mut config = AnalysisConfig::default();
        config.lugeon.cv_good = 0.10;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("lugeon.cv_excellent")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut config = AnalysisConfig::default();
        config.porchet.k_min = 1e-1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_rejected() {
        let mut config = AnalysisConfig::default();
        config.validation.t_high = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_serialization_roundtrip() {
        let config = AnalysisConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = AnalysisConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
