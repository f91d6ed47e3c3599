//! Shared data structures for hydrogeological parameter inversion
//!
//! - Inputs: `TestMeasurementSeries`, `InjectionTest`, `LevelSeries`, `SpatialSample`
//! - Inverter outputs: `TheisFit`, `CooperJacobFit`, `LefrancFit`, `PorchetFit`,
//!   `LugeonResult`, `PiezometryReport`, wrapped by `FittedModel`
//! - Explanation layer: `ValidationReport`, `AnomalyReport`, `RecommendationSet`

mod series;
mod fits;
mod reports;

pub use series::*;
pub use fits::*;
pub use reports::*;
