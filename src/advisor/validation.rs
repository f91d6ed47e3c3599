//! Rule-based plausibility checks before a parameter set is trusted
//!
//! Rules produce findings, never errors: an `issue` blocks the computation,
//! a `warning` only lowers confidence.
//!
//! Confidence = 100 − 20·issues − 5·warnings, floored at 0.

use tracing::{debug, info};

use super::recommender::lookup_lithology;
use crate::config::ValidationConfig;
use crate::inversion::theis_u;
use crate::types::{AnomalyReport, AnomalyStatus, Finding, ValidationReport};

/// Theis-style parameter bundle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TheisParameters {
    /// Pumping rate Q (m³/s)
    pub pumping_rate: f64,
    /// T (m²/s)
    pub transmissivity: f64,
    pub storativity: f64,
    /// Observation distance r (m)
    pub distance: f64,
    /// Last observation time (s)
    pub time_max: f64,
}

/// Geology parameter bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct GeologyParameters {
    /// K (m/s)
    pub hydraulic_conductivity: f64,
    pub porosity: f64,
    pub storativity: f64,
    pub lithology: Option<String>,
}

/// Stateless rule evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationEngine {
    config: ValidationConfig,
}

impl ValidationEngine {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Check a Theis parameter set.
    ///
    /// Issues: Q <= 0, T <= 0, S outside (0, 1), r <= 0.
    /// Warnings: T above `t_high`, S below `s_low`, and u at `time_max`
    /// outside `[u_low, u_high]` (only evaluated when T, S, r and the time are positive).
    pub fn validate_theis_parameters(
        &self,
        pumping_rate: f64,
        transmissivity: f64,
        storativity: f64,
        distance: f64,
        time_max: f64,
    ) -> ValidationReport {
        let c = &self.config;
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        if !is_positive(pumping_rate) {
            issues.push(Finding::new("theis.pumping_rate", "❌ Pumping rate Q must be positive"));
        }
        if !is_positive(transmissivity) {
            issues.push(Finding::new(
                "theis.transmissivity",
                "❌ Transmissivity T must be positive",
            ));
        }
        if !(is_positive(storativity) && storativity < 1.0) {
            issues.push(Finding::new(
                "theis.storativity",
                "❌ Storage coefficient S must lie between 0 and 1",
            ));
        }
        if !is_positive(distance) {
            issues.push(Finding::new("theis.distance", "❌ Distance r must be positive"));
        }

        if transmissivity > c.t_high {
            warnings.push(Finding::new(
                "theis.transmissivity_high",
                format!("⚠ Very high transmissivity: T={transmissivity:.2e} (atypical)"),
            ));
        }
        if storativity < c.s_low {
            warnings.push(Finding::new(
                "theis.storativity_low",
                format!("⚠ Very low storativity: S={storativity:.2e} (deep confined aquifer?)"),
            ));
        }

        let u_defined = transmissivity > 0.0 && storativity > 0.0 && distance > 0.0 && time_max > 0.0;
        if u_defined {
            let u = theis_u(transmissivity, storativity, distance, time_max);
            if u > c.u_high {
                warnings.push(Finding::new(
                    "theis.u_high",
                    format!("⚠ u={u:.2} >> 1: observation time too short?"),
                ));
            } else if u < c.u_low {
                warnings.push(Finding::new(
                    "theis.u_low",
                    format!("⚠ u={u:.2e} << 1: very long observation time"),
                ));
            }
        }

        self.report("theis", issues, warnings)
    }

    /// Check a [`TheisParameters`] bundle.
    pub fn validate_theis(&self, params: &TheisParameters) -> ValidationReport {
        self.validate_theis_parameters(
            params.pumping_rate,
            params.transmissivity,
            params.storativity,
            params.distance,
            params.time_max,
        )
    }

    /// Check a geology parameter set.
    ///
    /// Issues: K outside (0, `k_max`], porosity outside (0, 1), S outside (0, porosity).
    /// Warnings: K outside the lithology's tabulated range (unknown lithologies
    /// are not checked), S/porosity below `captive_ratio` or above `free_ratio`.
    pub fn validate_geology(
        &self,
        conductivity: f64,
        porosity: f64,
        storativity: f64,
        lithology: Option<&str>,
    ) -> ValidationReport {
        let c = &self.config;
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        if !(is_positive(conductivity) && conductivity <= c.k_max) {
            issues.push(Finding::new(
                "geology.conductivity",
                format!("❌ Conductivity K out of bounds (0 < K <= {} m/s)", c.k_max),
            ));
        }
        if !(is_positive(porosity) && porosity < 1.0) {
            issues.push(Finding::new("geology.porosity", "❌ Porosity out of bounds (0 < φ < 1)"));
        }
        if !(is_positive(storativity) && storativity < porosity) {
            issues.push(Finding::new(
                "geology.storativity",
                "❌ Inconsistent storage coefficient (0 < S < φ)",
            ));
        }

        if let Some(entry) = lithology.and_then(lookup_lithology) {
            if !entry.k_range.contains(conductivity) {
                warnings.push(Finding::new(
                    "geology.conductivity_lithology",
                    format!(
                        "⚠ K={conductivity:.2e} outside the {} range ({:.2e}-{:.2e})",
                        entry.key,
                        entry.k_range.lower(),
                        entry.k_range.upper()
                    ),
                ));
            }
        }

        if porosity > 0.0 {
            let ratio = storativity / porosity;
            if ratio < c.captive_ratio {
                warnings.push(Finding::new(
                    "geology.very_confined",
                    format!("⚠ Strongly confined aquifer (S/φ={ratio:.2e})"),
                ));
            } else if ratio > c.free_ratio {
                warnings.push(Finding::new(
                    "geology.very_unconfined",
                    format!("⚠ Strongly unconfined aquifer (S/φ={ratio:.2})"),
                ));
            }
        }

        self.report("geology", issues, warnings)
    }

    /// Check a [`GeologyParameters`] bundle.
    pub fn validate_geology_parameters(&self, params: &GeologyParameters) -> ValidationReport {
        self.validate_geology(
            params.hydraulic_conductivity,
            params.porosity,
            params.storativity,
            params.lithology.as_deref(),
        )
    }

    /// Data-quality findings from an anomaly report: one warning when points
    /// were flagged, confidence capped at the report's own confidence.
    pub fn validate_anomalies(&self, anomalies: &AnomalyReport) -> ValidationReport {
        let mut warnings = Vec::new();
        if !anomalies.anomalies.is_empty() {
            warnings.push(Finding::new(
                "data.anomalies",
                format!(
                    "⚠ {} anomalous point(s) in the input data ({:.1}%, {})",
                    anomalies.num_anomalies(),
                    anomalies.contamination_percent(),
                    anomalies.status
                ),
            ));
        }
        if anomalies.status == AnomalyStatus::Review {
            warnings.push(Finding::new(
                "data.contamination",
                "⚠ Heavy contamination: review the field campaign before trusting a fit",
            ));
        }
        self.report("data", Vec::new(), warnings)
            .capped(anomalies.confidence_score)
    }

    /// Combined check of whichever bundles are supplied. Confidence is the
    /// minimum of the parts; an empty check is OK with confidence 100.
    pub fn global_check(
        &self,
        theis: Option<&TheisParameters>,
        geology: Option<&GeologyParameters>,
        anomalies: Option<&AnomalyReport>,
    ) -> ValidationReport {
        let parts = [
            theis.map(|p| self.validate_theis(p)),
            geology.map(|p| self.validate_geology_parameters(p)),
            anomalies.map(|a| self.validate_anomalies(a)),
        ];
        let report = ValidationReport::combine(parts.into_iter().flatten());
        info!(
            severity = %report.severity,
            confidence = report.confidence_score,
            "{}",
            report.summary()
        );
        report
    }

    fn report(&self, scope: &str, issues: Vec<Finding>, warnings: Vec<Finding>) -> ValidationReport {
        for finding in issues.iter().chain(&warnings) {
            debug!(scope, code = %finding.code, "{}", finding.message);
        }
        ValidationReport::from_findings(
            issues,
            warnings,
            self.config.issue_penalty,
            self.config.warning_penalty,
        )
    }
}

/// False for NaN as well as for values <= 0.
fn is_positive(value: f64) -> bool {
    value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    #[test]
    fn test_theis_ok() {
        let report = ValidationEngine::default().validate_theis_parameters(0.001, 1e-3, 1e-4, 50.0, 10_000.0);
        assert_eq!(report.severity, Severity::Ok);
        assert!(report.issues.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.confidence_score, 100.0);
        assert!(report.can_proceed);
    }

    #[test]
    fn test_theis_blocked() {
        let report = ValidationEngine::default().validate_theis_parameters(-0.001, 0.0, 1.5, 50.0, 10_000.0);
        assert_eq!(report.severity, Severity::Blocked);
        assert!(report.issues.len() >= 3);
        assert!(!report.can_proceed);
        let codes: Vec<&str> = report.issues.iter().map(|f| f.code.as_str()).collect();
        assert!(codes.contains(&"theis.pumping_rate"));
        assert!(codes.contains(&"theis.transmissivity"));
        assert!(codes.contains(&"theis.storativity"));
    }

    #[test]
    fn test_theis_u_warnings() {
        let engine = ValidationEngine::default();
        // u = 2500·0.1 / (4·1e-4·10) = 62500
        let short = engine.validate_theis_parameters(1e-3, 1e-4, 0.1, 50.0, 10.0);
        assert_eq!(short.severity, Severity::Attention);
        assert!(short.warnings.iter().any(|w| w.code == "theis.u_high"));
        // u = 1·1e-4 / (4·1e-3·1e6) = 2.5e-8
        let long = engine.validate_theis_parameters(1e-3, 1e-3, 1e-4, 1.0, 1e6);
        assert!(long.warnings.iter().any(|w| w.code == "theis.u_low"));
        assert_eq!(long.confidence_score, 95.0);
    }

    #[test]
    fn test_geology_rules() {
        let engine = ValidationEngine::default();
        let ok = engine.validate_geology(1e-4, 0.30, 0.01, Some("sables"));
        assert_eq!(ok.severity, Severity::Ok);

        let off_range = engine.validate_geology(1e-2, 0.30, 0.01, Some("sables"));
        assert_eq!(off_range.severity, Severity::Attention);

        let blocked = engine.validate_geology(2.0, 0.30, 0.5, None);
        assert_eq!(blocked.issues.len(), 2);
        // S/φ = 1.67 is also a very-unconfined warning
        assert_eq!(blocked.confidence_score, 55.0);
    }

    #[test]
    fn test_geology_silt_alias() {
        let engine = ValidationEngine::default();
        let report = engine.validate_geology(1e-3, 0.4, 1e-3, Some("silt"));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.code == "geology.conductivity_lithology"));
    }

    #[test]
    fn test_global_check() {
        let engine = ValidationEngine::default();
        let theis = TheisParameters {
            pumping_rate: 1e-3,
            transmissivity: 1e-3,
            storativity: 1e-4,
            distance: 50.0,
            time_max: 1e4,
        };
        let geology = GeologyParameters {
            hydraulic_conductivity: 1e-2,
            porosity: 0.3,
            storativity: 0.01,
            lithology: Some("sables".into()),
        };
        let report = engine.global_check(Some(&theis), Some(&geology), None);
        assert_eq!(report.severity, Severity::Attention);
        assert_eq!(report.confidence_score, 95.0);
        assert!(report.summary().starts_with("[ATTENTION]"));

        let empty = engine.global_check(None, None, None);
        assert_eq!(empty.severity, Severity::Ok);
    }
}
