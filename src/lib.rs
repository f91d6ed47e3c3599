//! hydro-inversion: Hydrogeological Parameter Inversion
//!
//! Estimates aquifer parameters from field-test measurements and explains how
//! far the estimates can be trusted.
//!
//! ## Architecture
//!
//! - **Inversion**: Theis and Cooper-Jacob pumping tests, Lefranc and Porchet
//!   decay tests, Lugeon stepped injection, piezometric trend analysis
//! - **Advisor**: outlier detection, lithology-based recommendations, rule-based
//!   validation verdicts (OK / ATTENTION / BLOCKED)
//! - **Ingest**: delimited-text and JSON series parsers behind a format registry
//! - **Config**: every threshold as a TOML value, passed explicitly via `AnalysisToolkit`
//!
//! The core is pure and synchronous. Independent analyses can be run on
//! worker threads by the caller; the `hydro-inversion` binary does so with rayon.

pub mod config;
pub mod error;
pub mod types;
pub mod inversion;
pub mod advisor;
pub mod ingest;
pub mod synthetic;
pub mod toolkit;

// Re-export configuration
pub use config::{AnalysisConfig, ConfigError};

// Re-export errors
pub use error::{InversionError, Result};

// Re-export commonly used types
pub use types::{
    AnomalyReport, AnomalyStatus, CooperJacobFit, DecayGeometry, FittedModel, InjectionTest,
    LefrancFit, LevelSeries, LugeonQuality, LugeonResult, PiezometryReport, PorchetFit,
    RecommendationSet, Severity, SpatialSample, TestMeasurementSeries, TestParameters, TheisFit,
    ValidationReport,
};

// Re-export inverters
pub use inversion::{
    CooperJacobInverter, LefrancInverter, LugeonAverager, NonlinearFitter, PorchetInverter,
    TheisInverter, TrendAnalyzer,
};

// Re-export advisor components
pub use advisor::{AnomalyDetector, ParameterRecommender, ValidationEngine};

// Re-export ingestion
pub use ingest::{FormatRegistry, IngestError, SeriesParser};

pub use synthetic::SyntheticGenerator;
pub use toolkit::{AnalysisMethod, AnalysisToolkit};
