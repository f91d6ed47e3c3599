//! Explainable outlier detection over raw field series
//!
//! Three independent detectors, each returning the flagged indices with one
//! human-readable explanation per index:
//!
//! - **Z-score**: |x_i − mean| / std above a threshold, where mean and
//!   population std are taken over the *other* points (leave-one-out), so a
//!   single gross error cannot inflate its own yardstick.
//! - **IQR**: outside `[Q1 − m·IQR, Q3 + m·IQR]` with linearly interpolated
//!   quartiles.
//! - **Spatial k-NN**: deviation from the values of the k nearest (x, y)
//!   neighbors, in neighbor standard deviations.
//!
//! `comprehensive_check` runs z-score and IQR over several named series and
//! maps the overall contamination rate to a quality status.
//!
//! ## Usage
//!
//! ```ignore
//! let detector = AnomalyDetector::default();
//! let flagged = detector.zscore_outliers(&[1.0, 1.05, 0.98, 1.1, 15.0, 1.02]);
//! assert_eq!(flagged.indices, vec![4]);
//!
//! let report = detector.comprehensive_check([("drawdown", &drawdown[..])]);
//! println!("{} ({:.1}%)", report.status, report.contamination_percent());
//! ```

use std::collections::HashSet;

use tracing::{debug, info};

use crate::config::defaults::MIN_STD_FLOOR;
use crate::config::AnomalyConfig;
use crate::types::{
    AnomalyReport, AnomalyStatus, DetectionMethod, FlaggedPoint, OutlierSet, PointScore,
    SpatialSample,
};

/// Statistical outlier detector. Never fails: bad data is the output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    // ========================================================================
    // Z-score
    // ========================================================================

    /// Z-score outliers at the configured threshold (default 3.0).
    pub fn zscore_outliers(&self, data: &[f64]) -> OutlierSet {
        self.zscore_outliers_with(data, self.config.zscore_threshold)
    }

    /// Z-score outliers at an explicit threshold.
    ///
    /// Needs at least 3 points and some spread in the series; otherwise
    /// nothing is flagged. A point that differs from an otherwise constant
    /// series is flagged with an infinite z-score.
    pub fn zscore_outliers_with(&self, data: &[f64], threshold: f64) -> OutlierSet {
        let mut set = OutlierSet::default();
        if data.len() < 3 || population_std(data) < MIN_STD_FLOOR {
            return set;
        }

        let n = data.len() as f64;
        let others = n - 1.0;
        let full_mean = data.iter().sum::<f64>() / n;
        let full_m2: f64 = data.iter().map(|v| (v - full_mean).powi(2)).sum();

        for (i, &value) in data.iter().enumerate() {
            // Remove the point from the centred sums
            let mean = (n * full_mean - value) / others;
            let m2 = (full_m2 - n * (value - full_mean).powi(2) / others).max(0.0);
            let std = (m2 / others).sqrt();
            let deviation = (value - mean).abs();

            let z = if std < MIN_STD_FLOOR {
                if deviation > MIN_STD_FLOOR {
                    f64::INFINITY
                } else {
                    0.0
                }
            } else {
                deviation / std
            };

            if z > threshold {
                let explanation = if z.is_finite() {
                    format!(
                        "Point {i}: value={value:.2}, z-score={z:.2} ({z:.1}σ from the mean {mean:.2} of the other points)"
                    )
                } else {
                    format!(
                        "Point {i}: value={value:.2} differs from an otherwise constant series ({mean:.2})"
                    )
                };
                debug!(index = i, value, z, "z-score outlier");
                set.indices.push(i);
                set.explanations.push(explanation);
            }
        }
        set
    }

    // ========================================================================
    // IQR
    // ========================================================================

    /// Tukey-fence outliers with the configured multiplier (default 1.5).
    pub fn iqr_outliers(&self, data: &[f64]) -> OutlierSet {
        let mut set = OutlierSet::default();
        if data.is_empty() {
            return set;
        }
        let mut sorted = data.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = percentile_sorted(&sorted, 25.0);
        let q3 = percentile_sorted(&sorted, 75.0);
        let iqr = q3 - q1;
        let lower = q1 - self.config.iqr_multiplier * iqr;
        let upper = q3 + self.config.iqr_multiplier * iqr;

        for (i, &value) in data.iter().enumerate() {
            if value < lower || value > upper {
                debug!(index = i, value, lower, upper, "IQR outlier");
                set.indices.push(i);
                set.explanations.push(format!(
                    "Point {i}: value={value:.2} outside [{lower:.2}, {upper:.2}]"
                ));
            }
        }
        set
    }

    // ========================================================================
    // Spatial
    // ========================================================================

    /// Points whose value deviates more than `spatial_sigma` neighbor standard
    /// deviations from the mean of their `spatial_neighbors` nearest neighbors.
    ///
    /// Neighbors are ranked by Euclidean (x, y) distance, ties by index.
    /// Points whose neighbors have no spread are never flagged.
    pub fn spatial_outliers(&self, samples: &[SpatialSample]) -> OutlierSet {
        let mut set = OutlierSet::default();
        let k = self.config.spatial_neighbors;
        if k == 0 {
            return set;
        }

        for (i, point) in samples.iter().enumerate() {
            let mut neighbors: Vec<(f64, usize)> = samples
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, other)| ((other.x - point.x).hypot(other.y - point.y), j))
                .collect();
            neighbors.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let values: Vec<f64> = neighbors
                .iter()
                .take(k)
                .map(|(_, j)| samples[*j].value)
                .collect();
            if values.is_empty() {
                continue;
            }

            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let std = population_std(&values);
            if std <= MIN_STD_FLOOR {
                continue;
            }
            let deviation = (point.value - mean).abs() / std;
            if deviation > self.config.spatial_sigma {
                set.indices.push(i);
                set.explanations.push(format!(
                    "Point {i} (x={:.1}, y={:.1}): value={:.2} vs neighbor mean={mean:.2} (deviation: {deviation:.1}σ)",
                    point.x, point.y, point.value
                ));
            }
        }
        set
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// Z-score (at `comprehensive_zscore_threshold`) and IQR over several named
    /// series, deduplicated by (variable, index), scored by contamination rate.
    ///
    /// Empty series are skipped but an all-empty input still yields a report
    /// (EXCELLENT, no anomalies).
    pub fn comprehensive_check<'a, I>(&self, series: I) -> AnomalyReport
    where
        I: IntoIterator<Item = (&'a str, &'a [f64])>,
    {
        let mut anomalies: Vec<FlaggedPoint> = Vec::new();
        let mut seen: HashSet<(String, usize)> = HashSet::new();
        let mut total_points = 0usize;

        for (variable, data) in series {
            if data.is_empty() {
                continue;
            }
            total_points += data.len();

            let zscore = self.zscore_outliers_with(data, self.config.comprehensive_zscore_threshold);
            let iqr = self.iqr_outliers(data);
            let flagged = [(DetectionMethod::ZScore, zscore), (DetectionMethod::Iqr, iqr)];

            for (method, set) in flagged {
                for (index, explanation) in set.indices.into_iter().zip(set.explanations) {
                    if seen.insert((variable.to_string(), index)) {
                        anomalies.push(FlaggedPoint {
                            variable: variable.to_string(),
                            index,
                            method,
                            explanation,
                        });
                    }
                }
            }
        }

        let contamination_rate = anomalies.len() as f64 / total_points.max(1) as f64;
        let (status, confidence_score) = self.status_for(contamination_rate);

        info!(
            anomalies = anomalies.len(),
            total_points,
            contamination_rate,
            %status,
            "Anomaly check complete"
        );

        AnomalyReport {
            anomalies,
            total_points,
            contamination_rate,
            confidence_score,
            status,
        }
    }

    /// Quality status and confidence for a contamination rate (fraction).
    pub fn status_for(&self, contamination_rate: f64) -> (AnomalyStatus, f64) {
        let c = &self.config;
        if contamination_rate < c.status_excellent_rate {
            (AnomalyStatus::Excellent, c.confidence_excellent)
        } else if contamination_rate < c.status_good_rate {
            (AnomalyStatus::Good, c.confidence_good)
        } else if contamination_rate < c.status_attention_rate {
            (AnomalyStatus::Attention, c.confidence_attention)
        } else {
            (AnomalyStatus::Review, c.confidence_review)
        }
    }

    /// Advice lines for a report.
    pub fn recommendations(&self, report: &AnomalyReport) -> Vec<String> {
        let mut lines = Vec::new();
        if report.anomalies.is_empty() {
            lines.push("✓ No anomaly detected - data are consistent".to_string());
        } else {
            lines.push(format!("⚠ {} anomaly(ies) detected", report.num_anomalies()));
            lines.push("  → Check these points, then exclude or correct them".to_string());
        }
        if report.contamination_rate > self.config.status_good_rate {
            lines.push("  → Heavy contamination: review the quality of the field campaign".to_string());
        }
        lines
    }
}

/// 0-100 anomaly score per point: min(100·|z|/3, 100), z against the whole series.
pub fn simple_anomaly_scores(data: &[f64]) -> Vec<PointScore> {
    if data.is_empty() {
        return Vec::new();
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let std = population_std(data) + MIN_STD_FLOOR;
    data.iter()
        .enumerate()
        .map(|(index, value)| {
            let z_score = ((value - mean) / std).abs();
            let score = (100.0 * z_score / 3.0).min(100.0);
            PointScore {
                index,
                z_score,
                score,
                explanation: format!(
                    "Point {index}: z-score={z_score:.2}, anomaly score={score:.0}/100"
                ),
            }
        })
        .collect()
}

fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    (data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Linearly interpolated percentile of sorted data (numpy's default method).
fn percentile_sorted(sorted: &[f64], percent: f64) -> f64 {
    let position = percent / 100.0 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zscore_flags_single_gross_error() {
        let data = [1.0, 1.05, 0.98, 1.1, 15.0, 1.02];
        let set = AnomalyDetector::default().zscore_outliers(&data);
        assert_eq!(set.indices, vec![4]);
        assert_eq!(set.explanations.len(), 1);
        assert!(set.explanations[0].starts_with("Point 4: value=15.00"));
    }

    #[test]
    fn test_zscore_constant_series() {
        let detector = AnomalyDetector::default();
        assert!(detector.zscore_outliers(&[2.0; 10]).is_empty());
        assert!(detector.zscore_outliers(&[1.0, 9.0]).is_empty());
    }

    #[test]
    fn test_zscore_lone_deviation_from_constant() {
        let set = AnomalyDetector::default().zscore_outliers(&[1.0, 1.0, 1.0, 1.0, 5.0]);
        assert_eq!(set.indices, vec![4]);
    }

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile_sorted(&sorted, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile_sorted(&sorted, 75.0) - 3.25).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[7.0], 25.0), 7.0);
    }

    #[test]
    fn test_iqr_outliers() {
        // Q1 = 2.0, Q3 = 4.0 → fences [-1, 7]
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 3.0, 2.0, 4.0, 20.0];
        let set = AnomalyDetector::default().iqr_outliers(&data);
        assert_eq!(set.indices, vec![8]);
        assert!(set.explanations[0].contains("outside"));
    }

    #[test]
    fn test_spatial_outlier() {
        let mut samples: Vec<SpatialSample> = (0..9)
            .map(|i| {
                let (x, y) = (f64::from(i % 3), f64::from(i / 3));
                SpatialSample::new(x, y, 10.0 + 0.1 * f64::from(i % 2))
            })
            .collect();
        // centre of the grid
        samples[4].value = 25.0;
        let set = AnomalyDetector::default().spatial_outliers(&samples);
        assert!(set.indices.contains(&4));
        assert!(!set.indices.contains(&0));
    }

    #[test]
    fn test_comprehensive_deduplicates() {
        let data = [1.0, 1.05, 0.98, 1.1, 15.0, 1.02, 1.01, 0.99, 1.03, 1.0];
        let report = AnomalyDetector::default().comprehensive_check([("level", &data[..])]);
        // index 4 flagged by both detectors, reported once
        let hits = report.anomalies.iter().filter(|a| a.index == 4).count();
        assert_eq!(hits, 1);
        assert_eq!(report.total_points, 10);
    }

    #[test]
    fn test_status_bands() {
        let detector = AnomalyDetector::default();
        assert_eq!(detector.status_for(0.0), (AnomalyStatus::Excellent, 95.0));
        assert_eq!(detector.status_for(0.05), (AnomalyStatus::Good, 85.0));
        assert_eq!(detector.status_for(0.15), (AnomalyStatus::Attention, 70.0));
        assert_eq!(detector.status_for(0.20), (AnomalyStatus::Review, 50.0));
    }

    #[test]
    fn test_recommendations() {
        let detector = AnomalyDetector::default();
        let clean = detector.comprehensive_check([("q", &[1.0, 1.0, 1.0][..])]);
        assert_eq!(detector.recommendations(&clean).len(), 1);
        assert_eq!(clean.status, AnomalyStatus::Excellent);
    }

    #[test]
    fn test_simple_scores() {
        let scores = simple_anomaly_scores(&[0.0, 0.0, 0.0, 10.0]);
        assert_eq!(scores.len(), 4);
        assert!(scores[3].score > scores[0].score);
        assert!(scores.iter().all(|s| (0.0..=100.0).contains(&s.score)));
    }
}
