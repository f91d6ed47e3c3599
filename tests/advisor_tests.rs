//! Advisor Integration Tests
//!
//! Anomaly screening, recommendations and validation verdicts chained the way
//! a caller uses them: screen the raw data, then judge a parameter set.

use hydro_inversion::advisor::{
    simple_anomaly_scores, GeologyParameters, RecommendationError, TheisParameters,
};
use hydro_inversion::types::{AnomalyStatus, DetectionMethod, MeasuredValues, Severity};
use hydro_inversion::{AnalysisConfig, AnalysisToolkit, SpatialSample};

const SPIKED: [f64; 6] = [1.0, 1.05, 0.98, 1.1, 15.0, 1.02];

fn clean_series() -> Vec<f64> {
    (0..10).map(|i| 10.0 + 0.1 * f64::from(i)).collect()
}

fn ok_theis() -> TheisParameters {
    TheisParameters {
        pumping_rate: 0.001,
        transmissivity: 1e-3,
        storativity: 1e-4,
        distance: 50.0,
        time_max: 10_000.0,
    }
}

// ============================================================================
// Anomaly detection
// ============================================================================

#[test]
fn zscore_flags_only_the_spike() {
    let toolkit = AnalysisToolkit::default();
    let flagged = toolkit.anomaly().zscore_outliers(&SPIKED);
    assert_eq!(flagged.indices, vec![4]);
    assert!(flagged.explanations[0].starts_with("Point 4: value=15.00"));
}

#[test]
fn iqr_flags_only_the_spike() {
    let flagged = AnalysisToolkit::default().anomaly().iqr_outliers(&SPIKED);
    assert_eq!(flagged.indices, vec![4]);
}

#[test]
fn comprehensive_check_deduplicates_and_scores() {
    let toolkit = AnalysisToolkit::default();
    let clean = clean_series();
    let report = toolkit
        .anomaly()
        .comprehensive_check([("spiked", &SPIKED[..]), ("clean", &clean[..])]);

    assert_eq!(report.total_points, 16);
    assert_eq!(report.num_anomalies(), 1, "z-score and IQR hits on the same point count once");
    assert_eq!(report.anomalies[0].variable, "spiked");
    assert_eq!(report.anomalies[0].method, DetectionMethod::ZScore);
    assert!((report.contamination_rate - 1.0 / 16.0).abs() < 1e-12);
    assert_eq!(report.status, AnomalyStatus::Good);
    assert_eq!(report.confidence_score, 85.0);

    let advice = toolkit.anomaly().recommendations(&report);
    assert!(advice[0].contains("1 anomaly"));
}

#[test]
fn heavy_contamination_needs_review() {
    let toolkit = AnalysisToolkit::default();
    let data = [1.0, 1.0, 1.0, 1.0, 9.0, 1.0, 1.0, 1.0, 1.0, 9.0];
    let report = toolkit.anomaly().comprehensive_check([("level", &data[..])]);
    assert_eq!(report.num_anomalies(), 2);
    assert_eq!(report.status, AnomalyStatus::Review);
    assert!(toolkit
        .anomaly()
        .recommendations(&report)
        .iter()
        .any(|line| line.contains("Heavy contamination")));
}

#[test]
fn empty_input_is_excellent() {
    let report = AnalysisToolkit::default()
        .anomaly()
        .comprehensive_check(std::iter::empty::<(&str, &[f64])>());
    assert_eq!(report.total_points, 0);
    assert_eq!(report.status, AnomalyStatus::Excellent);
}

#[test]
fn spatial_outlier_on_grid() {
    let values = [1.0, 1.1, 0.9, 1.05, 10.0, 0.95, 1.0, 1.1, 0.9];
    let samples: Vec<SpatialSample> = values
        .iter()
        .enumerate()
        .map(|(i, v)| SpatialSample::new((i % 3) as f64, (i / 3) as f64, *v))
        .collect();
    let flagged = AnalysisToolkit::default().anomaly().spatial_outliers(&samples);
    assert_eq!(flagged.indices, vec![4]);
    assert!(flagged.explanations[0].contains("neighbor mean"));
}

#[test]
fn simple_scores_rank_the_spike_highest() {
    let scores = simple_anomaly_scores(&SPIKED);
    assert_eq!(scores.len(), SPIKED.len());
    let top = scores
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .unwrap();
    assert_eq!(top.index, 4);
    assert!(scores.iter().all(|s| (0.0..=100.0).contains(&s.score)));
}

// ============================================================================
// Recommendations
// ============================================================================

#[test]
fn recommended_typical_values_validate_cleanly() {
    let toolkit = AnalysisToolkit::default();
    let set = toolkit.recommender().recommend_from_lithology("Sables").unwrap();
    assert_eq!(set.lithology, "sables");
    assert_eq!(set.confidence, 70.0);

    let report = toolkit.validation().validate_geology(
        set.k_typical,
        0.30,
        set.storage_range.geometric_mean(),
        Some(&set.lithology),
    );
    assert_eq!(report.severity, Severity::Ok, "{:?}", report.warnings);
}

#[test]
fn unknown_lithology_lists_alternatives() {
    let err = AnalysisToolkit::default()
        .recommender()
        .recommend_from_lithology("basalte")
        .unwrap_err();
    assert!(err.to_string().contains("graviers"));
    assert!(matches!(err, RecommendationError::UnknownLithology { .. }));
}

#[test]
fn measured_conductivity_guesses_lithology_and_porosity() {
    let toolkit = AnalysisToolkit::default();
    let rec = toolkit.recommender().recommend_from_measurements(&MeasuredValues {
        hydraulic_conductivity: Some(1e-4),
        porosity: None,
        lithology: None,
    });
    assert_eq!(rec.lithology_guess.as_deref(), Some("sables"));
    assert_eq!(rec.porosity_guess, Some(0.32));
    assert_eq!(rec.confidence, 85.0);

    let none = toolkit
        .recommender()
        .recommend_from_measurements(&MeasuredValues::default());
    assert_eq!(none.confidence, 40.0);
    assert!(none.from_lithology.is_none());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn canonical_theis_examples() {
    let engine = AnalysisToolkit::default();
    let ok = engine.validation().validate_theis(&ok_theis());
    assert_eq!(ok.severity, Severity::Ok);
    assert_eq!(ok.confidence_score, 100.0);

    let blocked = engine
        .validation()
        .validate_theis_parameters(-0.001, 0.0, 1.5, 50.0, 10_000.0);
    assert_eq!(blocked.severity, Severity::Blocked);
    assert!(blocked.issues.len() >= 3);
    assert!(!blocked.can_proceed);
    assert_eq!(blocked.confidence_score, 40.0);
}

#[test]
fn global_check_carries_data_quality() {
    let toolkit = AnalysisToolkit::default();
    let clean = clean_series();
    let anomalies = toolkit
        .anomaly()
        .comprehensive_check([("spiked", &SPIKED[..]), ("clean", &clean[..])]);
    let geology = GeologyParameters {
        hydraulic_conductivity: 1e-4,
        porosity: 0.3,
        storativity: 0.01,
        lithology: Some("sables".into()),
    };

    let report = toolkit
        .validation()
        .global_check(Some(&ok_theis()), Some(&geology), Some(&anomalies));
    assert_eq!(report.severity, Severity::Attention);
    assert!(report.warnings.iter().any(|w| w.code == "data.anomalies"));
    assert_eq!(report.confidence_score, 85.0);
    assert!(report.can_proceed);
}

#[test]
fn validation_thresholds_follow_config() {
    let mut config = AnalysisConfig::default();
    config.validation.t_high = 1e-4;
    let report = AnalysisToolkit::new(config)
        .validation()
        .validate_theis(&ok_theis());
    assert!(report.warnings.iter().any(|w| w.code == "theis.transmissivity_high"));
    assert_eq!(report.confidence_score, 95.0);
}
