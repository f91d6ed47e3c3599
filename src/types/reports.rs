//! Explanation-layer outputs: validation verdicts, anomaly reports, recommendations

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Validation
// ============================================================================

/// Verdict severity, ordered OK < ATTENTION < BLOCKED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Ok,
    Attention,
    Blocked,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => write!(f, "OK"),
            Severity::Attention => write!(f, "ATTENTION"),
            Severity::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// One rule outcome: a stable code for programmatic use plus the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Dotted rule identifier, e.g. `theis.pumping_rate`
    pub code: String,
    pub message: String,
}

impl Finding {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Severity-ranked verdict on a proposed parameter set.
///
/// Built through [`ValidationReport::from_findings`] or
/// [`ValidationReport::combine`], so the severity always equals the maximum
/// severity implied by the findings and the confidence score always stays
/// in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub severity: Severity,
    /// Blocking problems, in rule order
    pub issues: Vec<Finding>,
    /// Advisory remarks, in rule order
    pub warnings: Vec<Finding>,
    /// 0-100
    pub confidence_score: f64,
    /// True iff there are no issues
    pub can_proceed: bool,
}

impl ValidationReport {
    /// Aggregate findings: any issue ⇒ BLOCKED, else any warning ⇒ ATTENTION, else OK.
    /// Confidence is `100 − issue_penalty×issues − warning_penalty×warnings`, clamped to [0, 100].
    pub fn from_findings(
        issues: Vec<Finding>,
        warnings: Vec<Finding>,
        issue_penalty: f64,
        warning_penalty: f64,
    ) -> Self {
        let severity = if !issues.is_empty() {
            Severity::Blocked
        } else if !warnings.is_empty() {
            Severity::Attention
        } else {
            Severity::Ok
        };
        let raw = 100.0
            - issue_penalty * issues.len() as f64
            - warning_penalty * warnings.len() as f64;
        Self {
            severity,
            can_proceed: issues.is_empty(),
            confidence_score: raw.clamp(0.0, 100.0),
            issues,
            warnings,
        }
    }

    /// Merge sub-reports: findings concatenated in order, confidence is the
    /// minimum of the parts (100 when there are none).
    pub fn combine(reports: impl IntoIterator<Item = ValidationReport>) -> Self {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let mut confidence: f64 = 100.0;
        for report in reports {
            confidence = confidence.min(report.confidence_score);
            issues.extend(report.issues);
            warnings.extend(report.warnings);
        }
        let mut combined = Self::from_findings(issues, warnings, 0.0, 0.0);
        combined.confidence_score = confidence.clamp(0.0, 100.0);
        combined
    }

    /// Lower the confidence to `cap` if it is above it.
    pub fn capped(mut self, cap: f64) -> Self {
        self.confidence_score = self.confidence_score.min(cap).clamp(0.0, 100.0);
        self
    }

    /// One-line summary, e.g. `[ATTENTION] 0 blocking issue(s), 2 warning(s)`.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} blocking issue(s), {} warning(s)",
            self.severity,
            self.issues.len(),
            self.warnings.len()
        )
    }
}

// ============================================================================
// Anomaly detection
// ============================================================================

/// Which detector flagged a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    ZScore,
    Iqr,
    SpatialNeighbors,
}

/// Flagged indices from a single detector over a single series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierSet {
    pub indices: Vec<usize>,
    /// One explanation per flagged index, same order
    pub explanations: Vec<String>,
}

impl OutlierSet {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

/// One flagged point in a multi-series check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedPoint {
    pub variable: String,
    pub index: usize,
    pub method: DetectionMethod,
    pub explanation: String,
}

/// Per-point anomaly score on a 0-100 scale (0 normal, 100 certain anomaly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointScore {
    pub index: usize,
    /// |z| against the mean and population std of the whole series
    pub z_score: f64,
    /// min(100·|z|/3, 100)
    pub score: f64,
    pub explanation: String,
}

/// Data-quality band derived from the contamination rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyStatus {
    /// < 5 % flagged
    Excellent,
    /// 5-10 %
    Good,
    /// 10-20 %
    Attention,
    /// >= 20 %
    Review,
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyStatus::Excellent => write!(f, "EXCELLENT"),
            AnomalyStatus::Good => write!(f, "BON"),
            AnomalyStatus::Attention => write!(f, "ATTENTION"),
            AnomalyStatus::Review => write!(f, "RÉVISER"),
        }
    }
}

/// Aggregated anomaly report across one or more named series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Deduplicated by (variable, index), in detection order
    pub anomalies: Vec<FlaggedPoint>,
    pub total_points: usize,
    /// flagged / total, as a fraction in [0, 1]
    pub contamination_rate: f64,
    pub confidence_score: f64,
    pub status: AnomalyStatus,
}

impl AnomalyReport {
    pub fn num_anomalies(&self) -> usize {
        self.anomalies.len()
    }

    pub fn contamination_percent(&self) -> f64 {
        self.contamination_rate * 100.0
    }

    pub fn explanations(&self) -> impl Iterator<Item = &str> {
        self.anomalies.iter().map(|a| a.explanation.as_str())
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// A range exactly as tabulated: the two bounds may appear in either order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange(pub f64, pub f64);

impl ValueRange {
    pub fn lower(&self) -> f64 {
        self.0.min(self.1)
    }

    pub fn upper(&self) -> f64 {
        self.0.max(self.1)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower() && value <= self.upper()
    }

    /// Geometric mean of the bounds, the "typical" value for log-distributed quantities.
    pub fn geometric_mean(&self) -> f64 {
        (self.0 * self.1).sqrt()
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.0, self.1)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0 * factor, self.1 * factor)
    }
}

/// Plausible parameter ranges for a lithology with a pedagogical explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub lithology: String,
    pub description: String,
    /// Hydraulic conductivity (m/s), as tabulated
    pub k_range: ValueRange,
    /// Geometric mean of the K bounds (m/s)
    pub k_typical: f64,
    /// Same range in m/day
    pub k_range_m_per_day: ValueRange,
    /// Porosity (fraction)
    pub porosity_range: ValueRange,
    /// Storage coefficient (-)
    pub storage_range: ValueRange,
    pub explanation: String,
    pub confidence: f64,
}

/// Partial field knowledge used to infer the missing parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasuredValues {
    /// Measured hydraulic conductivity (m/s)
    pub hydraulic_conductivity: Option<f64>,
    pub porosity: Option<f64>,
    pub lithology: Option<String>,
}

/// Inferences drawn from [`MeasuredValues`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuredRecommendation {
    /// Lithology key guessed from K (may be outside the table, e.g. `roche_massive`)
    pub lithology_guess: Option<String>,
    pub porosity_guess: Option<f64>,
    pub from_lithology: Option<RecommendationSet>,
    pub explanations: Vec<String>,
    /// 85 with a measured K, 70 with a lithology name, 40 otherwise
    pub confidence: f64,
}
