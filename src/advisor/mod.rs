//! Explanation layer
//!
//! Characterises data and parameter quality instead of failing on it:
//!
//! - `anomaly`: statistical outlier detection over raw series
//! - `recommender`: lithology-indexed plausible parameter ranges
//! - `validation`: rule-based verdict (OK / ATTENTION / BLOCKED) on a parameter set
//!
//! None of these depend on a fit; a caller typically runs the anomaly check
//! on the raw series, fits, then validates the estimate before trusting it.

pub mod anomaly;
pub mod recommender;
pub mod validation;

pub use anomaly::{simple_anomaly_scores, AnomalyDetector};
pub use recommender::{
    estimate_porosity, guess_lithology, lithology_list, lookup_lithology, LithologyEntry,
    ParameterRecommender, RecommendationError, LITHOLOGY_TABLE,
};
pub use validation::{GeologyParameters, TheisParameters, ValidationEngine};
