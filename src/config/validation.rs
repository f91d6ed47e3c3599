//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for AnalysisConfig.
///
/// Maintained by hand to match the struct hierarchy in analysis_config.rs.
/// Any new field added there must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [fitting]
        "fitting",
        "fitting.max_iterations",
        "fitting.x_tolerance",
        "fitting.f_tolerance",
        "fitting.penalty",
        "fitting.multi_start",
        "fitting.multi_start_scales",
        // [theis]
        "theis",
        "theis.initial_transmissivity",
        "theis.initial_storativity",
        "theis.fixed_s_t_min",
        "theis.fixed_s_t_max",
        "theis.t_min",
        "theis.t_max",
        "theis.s_min",
        "theis.s_max",
        "theis.success_rmse_ratio",
        "theis.min_points",
        // [cooper_jacob]
        "cooper_jacob",
        "cooper_jacob.u_limit",
        "cooper_jacob.min_validity_percent",
        "cooper_jacob.min_points",
        // [lefranc]
        "lefranc",
        "lefranc.default_radius_m",
        "lefranc.default_cylinder_length_m",
        "lefranc.default_packer_length_m",
        "lefranc.initial_tau_fraction",
        "lefranc.min_points",
        // [porchet]
        "porchet",
        "porchet.initial_k",
        "porchet.k_min",
        "porchet.k_max",
        "porchet.min_points",
        // [lugeon]
        "lugeon",
        "lugeon.reference_pressure_bar",
        "lugeon.pressure_tolerance_bar",
        "lugeon.cv_excellent",
        "lugeon.cv_good",
        "lugeon.cv_fair",
        // [piezometry]
        "piezometry",
        "piezometry.stable_slope_m_per_year",
        "piezometry.amplitude_high_m",
        "piezometry.amplitude_moderate_m",
        "piezometry.reactivity_high",
        "piezometry.reactivity_moderate",
        "piezometry.days_per_year",
        "piezometry.min_points",
        // [anomaly]
        "anomaly",
        "anomaly.zscore_threshold",
        "anomaly.comprehensive_zscore_threshold",
        "anomaly.iqr_multiplier",
        "anomaly.spatial_neighbors",
        "anomaly.spatial_sigma",
        "anomaly.status_excellent_rate",
        "anomaly.status_good_rate",
        "anomaly.status_attention_rate",
        "anomaly.confidence_excellent",
        "anomaly.confidence_good",
        "anomaly.confidence_attention",
        "anomaly.confidence_review",
        // [validation]
        "validation",
        "validation.t_high",
        "validation.s_low",
        "validation.u_low",
        "validation.u_high",
        "validation.k_max",
        "validation.captive_ratio",
        "validation.free_ratio",
        "validation.issue_penalty",
        "validation.warning_penalty",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so the suggestion does
/// not depend on `HashSet` iteration order.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

fn range_warning(field: &str, message: String) -> ValidationWarning {
    ValidationWarning {
        field: field.to_string(),
        message,
        suggestion: None,
    }
}

/// Validate physical ranges on a parsed AnalysisConfig.
///
/// Returns (errors, warnings): errors are impossible values that must reject
/// the config; warnings are suspicious but usable.
pub fn validate_physical_ranges(
    config: &super::AnalysisConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Storativity is a fraction: S >= 1 is not a storage coefficient
    let th = &config.theis;
    if th.s_max >= 1.0 {
        errors.push(format!(
            "theis.s_max = {} must be < 1 (storativity is a fraction)",
            th.s_max
        ));
    }
    if th.initial_storativity <= 0.0 || th.initial_storativity >= 1.0 {
        errors.push(format!(
            "theis.initial_storativity = {:e} is outside (0, 1)",
            th.initial_storativity
        ));
    }
    if th.initial_transmissivity <= 0.0 {
        errors.push(format!(
            "theis.initial_transmissivity = {:e} must be > 0",
            th.initial_transmissivity
        ));
    }

    // u limit: the semi-log approximation is only defined for small u
    let u = config.cooper_jacob.u_limit;
    if u <= 0.0 || u >= 1.0 {
        errors.push(format!("cooper_jacob.u_limit = {u} is outside (0, 1)"));
    } else if u > 0.1 {
        warnings.push(range_warning(
            "cooper_jacob.u_limit",
            format!("cooper_jacob.u_limit = {u} is above 0.1, the straight-line approximation degrades"),
        ));
    }

    // Geometry defaults divide K formulas
    let lf = &config.lefranc;
    for (name, value) in [
        ("lefranc.default_radius_m", lf.default_radius_m),
        ("lefranc.default_cylinder_length_m", lf.default_cylinder_length_m),
        ("lefranc.default_packer_length_m", lf.default_packer_length_m),
    ] {
        if value <= 0.0 {
            errors.push(format!("{name} = {value} must be > 0 (used as divisor)"));
        }
    }
    if lf.default_radius_m > 1.0 {
        warnings.push(range_warning(
            "lefranc.default_radius_m",
            format!(
                "lefranc.default_radius_m = {} m is unusually large for a borehole",
                lf.default_radius_m
            ),
        ));
    }

    let pc = &config.porchet;
    if pc.initial_k < pc.k_min || pc.initial_k > pc.k_max {
        errors.push(format!(
            "porchet.initial_k = {:e} lies outside [k_min, k_max] = [{:e}, {:e}]",
            pc.initial_k, pc.k_min, pc.k_max
        ));
    }
    if pc.k_max > 1.0 {
        warnings.push(range_warning(
            "porchet.k_max",
            format!("porchet.k_max = {:e} m/s exceeds any natural formation", pc.k_max),
        ));
    }

    if config.lugeon.reference_pressure_bar <= 0.0 {
        errors.push(format!(
            "lugeon.reference_pressure_bar = {} must be > 0",
            config.lugeon.reference_pressure_bar
        ));
    }

    if config.validation.k_max <= 0.0 {
        errors.push(format!(
            "validation.k_max = {} must be > 0",
            config.validation.k_max
        ));
    }

    let an = &config.anomaly;
    if an.zscore_threshold < 2.0 {
        warnings.push(range_warning(
            "anomaly.zscore_threshold",
            format!(
                "anomaly.zscore_threshold = {} will flag ordinary scatter as outliers",
                an.zscore_threshold
            ),
        ));
    }
    if an.spatial_neighbors < 3 {
        warnings.push(range_warning(
            "anomaly.spatial_neighbors",
            format!(
                "anomaly.spatial_neighbors = {} gives an unstable neighbor spread",
                an.spatial_neighbors
            ),
        ));
    }
    for (name, value) in [
        ("anomaly.confidence_excellent", an.confidence_excellent),
        ("anomaly.confidence_good", an.confidence_good),
        ("anomaly.confidence_attention", an.confidence_attention),
        ("anomaly.confidence_review", an.confidence_review),
    ] {
        if !(0.0..=100.0).contains(&value) {
            errors.push(format!("{name} = {value} is outside [0, 100]"));
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("theis", "theis"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("storativty", "storativity"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [lugeon]
            cv_good = 0.3
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"lugeon".to_string()));
        assert!(keys.contains(&"lugeon.cv_good".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[theis]
initial_storativty = 1e-4
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("initial_storativty"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("theis.initial_storativity")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[fitting]
multi_start = true

[anomaly]
zscore_threshold = 3.5

[validation]
issue_penalty = 25.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[kriging]\nrange = 42\n");
        assert!(warnings.iter().any(|w| w.field == "kriging"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_serialize_to_known_keys_only() {
        let text = AnalysisConfig::default().to_toml().unwrap();
        let warnings = validate_unknown_keys(&text);
        assert!(warnings.is_empty(), "known_config_keys is stale: {:?}", warnings);
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let (errors, warnings) = validate_physical_ranges(&AnalysisConfig::default());
        assert!(errors.is_empty(), "Defaults should produce no errors: {:?}", errors);
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {:?}", warnings);
    }

    #[test]
    fn test_physical_range_storativity_fraction() {
        let mut config = AnalysisConfig::default();
        config.theis.s_max = 1.5;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("theis.s_max")));
    }

    #[test]
    fn test_physical_range_u_limit_suspicious() {
        let mut config = AnalysisConfig::default();
        config.cooper_jacob.u_limit = 0.2;
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "cooper_jacob.u_limit"));
    }

    #[test]
    fn test_physical_range_zero_radius() {
        let mut config = AnalysisConfig::default();
        config.lefranc.default_radius_m = 0.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("default_radius_m")));
    }
}
