//! Analysis toolkit - configured components handed out from one value
//!
//! `AnalysisToolkit::new(config)` builds every inverter and advisor from its
//! config section once. Callers hold the toolkit (or clone it into worker
//! threads); nothing reads configuration from global state.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::advisor::{AnomalyDetector, ParameterRecommender, ValidationEngine};
use crate::config::AnalysisConfig;
use crate::error::{InversionError, Result};
use crate::ingest::FormatRegistry;
use crate::inversion::{
    CooperJacobInverter, LefrancInverter, LugeonAverager, NonlinearFitter, PorchetInverter,
    TheisInverter, TrendAnalyzer,
};
use crate::types::{DecayGeometry, FittedModel, TestMeasurementSeries};

/// Time-series method selectable by name (CLI, batch manifests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisMethod {
    Theis,
    CooperJacob,
    Lefranc(DecayGeometry),
    Porchet,
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMethod::Theis => write!(f, "theis"),
            AnalysisMethod::CooperJacob => write!(f, "cooper-jacob"),
            AnalysisMethod::Lefranc(geometry) => write!(f, "lefranc-{geometry}"),
            AnalysisMethod::Porchet => write!(f, "porchet"),
        }
    }
}

impl FromStr for AnalysisMethod {
    type Err = InversionError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        match name.as_str() {
            "theis" => Ok(AnalysisMethod::Theis),
            "cooper-jacob" | "jacob" => Ok(AnalysisMethod::CooperJacob),
            "lefranc" | "lefranc-cylinder" => Ok(AnalysisMethod::Lefranc(DecayGeometry::Cylinder)),
            "lefranc-packer" => Ok(AnalysisMethod::Lefranc(DecayGeometry::Packer)),
            "porchet" => Ok(AnalysisMethod::Porchet),
            other => Err(InversionError::parameter(
                "method",
                format!(
                    "unknown method '{other}' (expected theis, cooper-jacob, lefranc, lefranc-packer or porchet)"
                ),
            )),
        }
    }
}

/// Every component of the engine, built from one [`AnalysisConfig`].
#[derive(Debug, Clone)]
pub struct AnalysisToolkit {
    config: AnalysisConfig,
    fitter: NonlinearFitter,
    theis: TheisInverter,
    cooper_jacob: CooperJacobInverter,
    lefranc: LefrancInverter,
    porchet: PorchetInverter,
    lugeon: LugeonAverager,
    piezometry: TrendAnalyzer,
    anomaly: AnomalyDetector,
    recommender: ParameterRecommender,
    validation: ValidationEngine,
}

impl Default for AnalysisToolkit {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl AnalysisToolkit {
    pub fn new(config: AnalysisConfig) -> Self {
        let fitting = config.fitting.clone();
        info!(
            max_iterations = fitting.max_iterations,
            multi_start = fitting.multi_start,
            "Analysis toolkit initialised"
        );
        Self {
            fitter: NonlinearFitter::new(fitting.clone()),
            theis: TheisInverter::new(config.theis.clone(), fitting.clone()),
            cooper_jacob: CooperJacobInverter::new(config.cooper_jacob.clone()),
            lefranc: LefrancInverter::new(config.lefranc.clone(), fitting.clone()),
            porchet: PorchetInverter::new(config.porchet.clone(), fitting),
            lugeon: LugeonAverager::new(config.lugeon.clone()),
            piezometry: TrendAnalyzer::new(config.piezometry.clone()),
            anomaly: AnomalyDetector::new(config.anomaly.clone()),
            recommender: ParameterRecommender::new(),
            validation: ValidationEngine::new(config.validation.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn fitter(&self) -> &NonlinearFitter {
        &self.fitter
    }

    pub fn theis(&self) -> &TheisInverter {
        &self.theis
    }

    pub fn cooper_jacob(&self) -> &CooperJacobInverter {
        &self.cooper_jacob
    }

    pub fn lefranc(&self) -> &LefrancInverter {
        &self.lefranc
    }

    pub fn porchet(&self) -> &PorchetInverter {
        &self.porchet
    }

    pub fn lugeon(&self) -> &LugeonAverager {
        &self.lugeon
    }

    pub fn piezometry(&self) -> &TrendAnalyzer {
        &self.piezometry
    }

    pub fn anomaly(&self) -> &AnomalyDetector {
        &self.anomaly
    }

    pub fn recommender(&self) -> &ParameterRecommender {
        &self.recommender
    }

    pub fn validation(&self) -> &ValidationEngine {
        &self.validation
    }

    /// Registry with the built-in file formats.
    pub fn formats(&self) -> FormatRegistry {
        FormatRegistry::default()
    }

    /// Run one time-series method and wrap the result.
    pub fn fit(&self, method: AnalysisMethod, series: &TestMeasurementSeries) -> Result<FittedModel> {
        Ok(match method {
            AnalysisMethod::Theis => self.theis.fit(series)?.into(),
            AnalysisMethod::CooperJacob => self.cooper_jacob.fit(series)?.into(),
            AnalysisMethod::Lefranc(geometry) => self.lefranc.fit(series, geometry)?.into(),
            AnalysisMethod::Porchet => self.porchet.fit(series)?.into(),
        })
    }
}
