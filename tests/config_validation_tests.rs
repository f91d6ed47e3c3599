//! Config Validation Tests
//!
//! Typo detection, range validation and file loading of the analysis config,
//! exercised independently from the inverters.

use std::io::Write;

use hydro_inversion::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use hydro_inversion::config::{AnalysisConfig, ConfigError};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_lugeon_band_warns_with_suggestion() {
    let toml_str = r#"
[lugeon]
cv_excelent = 0.15
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("cv_excelent"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("lugeon.cv_excellent"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn misspelled_section_warns() {
    let warnings = validate_unknown_keys("[anomally]\nzscore_threshold = 3.0\n");
    assert!(warnings.iter().any(|w| w.field == "anomally"));
    let section = warnings
        .iter()
        .find(|w| w.field == "anomally")
        .and_then(|w| w.suggestion.clone());
    assert_eq!(section.as_deref(), Some("anomaly"));
}

#[test]
fn valid_document_has_no_warnings() {
    let toml_str = r#"
[theis]
initial_transmissivity = 5e-4
min_points = 4

[cooper_jacob]
u_limit = 0.01

[piezometry]
days_per_year = 365.0
"#;
    assert!(validate_unknown_keys(toml_str).is_empty());
}

#[test]
fn suggestion_requires_small_edit_distance() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("porchet.k_mx", &known).as_deref(),
        Some("porchet.k_max")
    );
    assert!(suggest_correction("geostatistics.variogram", &known).is_none());
}

// ============================================================================
// Range and Consistency Validation
// ============================================================================

#[test]
fn defaults_are_valid() {
    let config = AnalysisConfig::default();
    assert!(config.validate().is_ok());
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn reversed_cv_bands_rejected() {
    let result = AnalysisConfig::from_toml_str("[lugeon]\ncv_good = 0.6\ncv_fair = 0.4\n");
    match result {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("lugeon.cv_good/cv_fair")), "{errors:?}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn inverted_search_bounds_rejected() {
    let result = AnalysisConfig::from_toml_str("[porchet]\nk_min = 1e-2\nk_max = 1e-7\ninitial_k = 1e-4\n");
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn initial_storativity_outside_unit_interval_rejected() {
    let mut config = AnalysisConfig::default();
    config.theis.initial_storativity = 1.2;
    let (errors, _) = validate_physical_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("theis.initial_storativity")));
    assert!(config.validate().is_err());
}

#[test]
fn low_zscore_threshold_only_warns() {
    let mut config = AnalysisConfig::default();
    config.anomaly.zscore_threshold = 1.5;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "anomaly.zscore_threshold"));
    assert!(config.validate().is_ok());
}

#[test]
fn malformed_toml_is_parse_error() {
    let result = AnalysisConfig::from_toml_str("[theis\nmin_points = 3");
    assert!(matches!(result, Err(ConfigError::Parse(_, _))));
}

// ============================================================================
// File Loading
// ============================================================================

#[test]
fn partial_file_keeps_defaults_for_missing_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[validation]\nt_high = 0.05\n\n[fitting]\nmulti_start = true").unwrap();

    let config = AnalysisConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.validation.t_high, 0.05);
    assert!(config.fitting.multi_start);
    assert_eq!(config.validation.s_low, 1e-6);
    assert_eq!(config.theis, AnalysisConfig::default().theis);
}

#[test]
fn save_then_load_preserves_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hydro_config.toml");

    let mut config = AnalysisConfig::default();
    config.cooper_jacob.u_limit = 0.01;
    config.anomaly.spatial_neighbors = 8;
    config.save_to_file(&path).unwrap();

    let loaded = AnalysisConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AnalysisConfig::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_, _))));
}
