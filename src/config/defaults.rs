//! System-wide default constants.
//!
//! Numbers that are not operator-tunable: config discovery, numeric floors,
//! and physical unit factors. Grouped by subsystem for easy discovery.

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable holding an explicit config path.
pub const CONFIG_ENV_VAR: &str = "HYDRO_CONFIG";

/// Config file looked up in the current working directory.
pub const CONFIG_FILE_NAME: &str = "hydro_config.toml";

// ============================================================================
// Numerical floors
// ============================================================================

/// Standard deviations below this are treated as zero spread.
pub const MIN_STD_FLOOR: f64 = 1e-10;

/// Regression denominators (Σ(x − x̄)²) below this mean x has no spread.
pub const MIN_VARIANCE_FLOOR: f64 = 1e-10;

// ============================================================================
// Well function
// ============================================================================

/// Below this argument E1 uses the power series, above it the continued fraction.
pub const WELL_FUNCTION_SERIES_LIMIT: f64 = 1.0;

/// Relative truncation tolerance for both E1 expansions.
pub const WELL_FUNCTION_TOLERANCE: f64 = 1e-15;

/// Hard iteration cap for both E1 expansions.
pub const WELL_FUNCTION_MAX_TERMS: usize = 500;

// ============================================================================
// Units
// ============================================================================

/// One Lugeon unit expressed as a hydraulic conductivity (m/s).
pub const LUGEON_TO_MS: f64 = 1e-7;
