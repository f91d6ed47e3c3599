//! Input series: field-test measurements handed to the inverters

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{require_positive, InversionError, Result};

/// Test-specific scalars that accompany a measurement series.
///
/// All values are SI: m³/s for the pumping rate, metres for lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TestParameters {
    /// Pumping rate Q (m³/s)
    pub pumping_rate: Option<f64>,
    /// Radial distance between pumping well and observation point r (m)
    pub distance: Option<f64>,
    /// Borehole, screen or packer radius (m)
    pub radius: Option<f64>,
    /// Length of the tested segment (m)
    pub segment_length: Option<f64>,
    /// Initial head / water height in the hole (m)
    pub initial_head: Option<f64>,
}

/// Ordered (time, observed value) pairs plus the test scalars.
///
/// Times are seconds and must be finite and non-negative; models that take a
/// logarithm or divide by time (Theis, Cooper-Jacob) additionally reject `t = 0`.
/// Strictly increasing times are conventional but not required.
///
/// The series is immutable once built: the `with_*` methods consume it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestMeasurementSeries {
    times: Vec<f64>,
    values: Vec<f64>,
    parameters: TestParameters,
}

impl TestMeasurementSeries {
    /// Build a series from parallel time / value vectors.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(InversionError::parameter(
                "values",
                format!(
                    "length {} does not match {} time stamps",
                    values.len(),
                    times.len()
                ),
            ));
        }
        if let Some((i, t)) = times
            .iter()
            .enumerate()
            .find(|(_, t)| !t.is_finite() || **t < 0.0)
        {
            return Err(InversionError::domain(
                "TestMeasurementSeries",
                format!("time[{i}] = {t} must be finite and >= 0"),
            ));
        }
        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(InversionError::parameter(
                "values",
                format!("value[{i}] = {v} is not finite"),
            ));
        }
        Ok(Self {
            times,
            values,
            parameters: TestParameters::default(),
        })
    }

    pub fn with_parameters(mut self, parameters: TestParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_pumping_rate(mut self, q: f64) -> Self {
        self.parameters.pumping_rate = Some(q);
        self
    }

    pub fn with_distance(mut self, r: f64) -> Self {
        self.parameters.distance = Some(r);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.parameters.radius = Some(radius);
        self
    }

    pub fn with_segment_length(mut self, length: f64) -> Self {
        self.parameters.segment_length = Some(length);
        self
    }

    pub fn with_initial_head(mut self, head: f64) -> Self {
        self.parameters.initial_head = Some(head);
        self
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn parameters(&self) -> &TestParameters {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate over (time, value) pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    /// Pumping rate, required to be present and > 0.
    pub(crate) fn require_pumping_rate(&self) -> Result<f64> {
        let q = self
            .parameters
            .pumping_rate
            .ok_or(InversionError::MissingParameter("pumping_rate"))?;
        require_positive("pumping_rate", q)
    }

    /// Observation distance, required to be present and > 0.
    pub(crate) fn require_distance(&self) -> Result<f64> {
        let r = self
            .parameters
            .distance
            .ok_or(InversionError::MissingParameter("distance"))?;
        require_positive("distance", r)
    }

    /// Reject any `t <= 0` for models that take log(t) or divide by t.
    pub(crate) fn require_positive_times(&self, function: &'static str) -> Result<()> {
        match self.times.iter().enumerate().find(|(_, t)| **t <= 0.0) {
            Some((i, t)) => Err(InversionError::domain(
                function,
                format!("time[{i}] = {t} must be > 0"),
            )),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Lugeon injection steps
// ============================================================================

/// One constant-pressure step of a Lugeon injection test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectionStep {
    /// Effective injection pressure (bar)
    pub pressure_bar: f64,
    /// Stabilised discharge (L/min)
    pub discharge_lpm: f64,
}

/// A multi-step Lugeon injection test on a packed-off borehole segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectionTest {
    segment_length: f64,
    steps: Vec<InjectionStep>,
}

impl InjectionTest {
    /// Start a test over a segment of `segment_length` metres.
    pub fn new(segment_length: f64) -> Result<Self> {
        require_positive("segment_length", segment_length)?;
        Ok(Self {
            segment_length,
            steps: Vec::new(),
        })
    }

    /// Add a pressure step. Pressure must be > 0, discharge >= 0.
    pub fn with_step(mut self, pressure_bar: f64, discharge_lpm: f64) -> Result<Self> {
        require_positive("pressure_bar", pressure_bar)?;
        if !discharge_lpm.is_finite() || discharge_lpm < 0.0 {
            return Err(InversionError::parameter(
                "discharge_lpm",
                format!("must be finite and >= 0 (got {discharge_lpm})"),
            ));
        }
        self.steps.push(InjectionStep {
            pressure_bar,
            discharge_lpm,
        });
        Ok(self)
    }

    /// Build a test from (pressure_bar, discharge_lpm) pairs.
    pub fn from_steps(
        segment_length: f64,
        steps: impl IntoIterator<Item = (f64, f64)>,
    ) -> Result<Self> {
        steps
            .into_iter()
            .try_fold(Self::new(segment_length)?, |test, (p, q)| test.with_step(p, q))
    }

    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    pub fn steps(&self) -> &[InjectionStep] {
        &self.steps
    }
}

// ============================================================================
// Piezometric level series
// ============================================================================

/// Piezometric levels against elapsed days since the first reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSeries {
    elapsed_days: Vec<f64>,
    levels: Vec<f64>,
}

impl LevelSeries {
    pub fn new(elapsed_days: Vec<f64>, levels: Vec<f64>) -> Result<Self> {
        if elapsed_days.len() != levels.len() {
            return Err(InversionError::parameter(
                "levels",
                format!(
                    "length {} does not match {} day offsets",
                    levels.len(),
                    elapsed_days.len()
                ),
            ));
        }
        if elapsed_days
            .iter()
            .chain(levels.iter())
            .any(|v| !v.is_finite())
        {
            return Err(InversionError::parameter(
                "levels",
                "day offsets and levels must be finite",
            ));
        }
        Ok(Self {
            elapsed_days,
            levels,
        })
    }

    /// Build from calendar timestamps. Offsets are whole days (floored) from the first date.
    pub fn from_dates(dates: &[NaiveDateTime], levels: Vec<f64>) -> Result<Self> {
        let Some(first) = dates.first() else {
            return Self::new(Vec::new(), levels);
        };
        let elapsed = dates
            .iter()
            .map(|d| (*d - *first).num_seconds().div_euclid(86_400) as f64)
            .collect();
        Self::new(elapsed, levels)
    }

    pub fn elapsed_days(&self) -> &[f64] {
        &self.elapsed_days
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// A georeferenced scalar observation used by spatial outlier detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialSample {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SpatialSample {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }
}

// ============================================================================
// Lefranc geometry
// ============================================================================

/// Borehole geometry of a Lefranc test; selects the τ → K conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayGeometry {
    /// Open cylindrical cavity at the bottom of the hole: K = ln2·r² / (τ·L)
    Cylinder,
    /// Segment isolated between two packers: K = r / (2·τ·L)
    Packer,
}

impl fmt::Display for DecayGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecayGeometry::Cylinder => write!(f, "cylinder"),
            DecayGeometry::Packer => write!(f, "packer"),
        }
    }
}

impl FromStr for DecayGeometry {
    type Err = InversionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cylinder" | "cylindre" => Ok(DecayGeometry::Cylinder),
            "packer" => Ok(DecayGeometry::Packer),
            other => Err(InversionError::parameter(
                "geometry",
                format!("unknown geometry '{other}' (expected 'cylinder' or 'packer')"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_series_rejects_length_mismatch() {
        let err = TestMeasurementSeries::new(vec![1.0, 2.0], vec![0.1]).unwrap_err();
        assert!(matches!(err, InversionError::InvalidParameter { name: "values", .. }));
    }

    #[test]
    fn test_series_rejects_negative_time() {
        let err = TestMeasurementSeries::new(vec![-1.0, 2.0], vec![0.1, 0.2]).unwrap_err();
        assert!(matches!(err, InversionError::InvalidDomain { .. }));
    }

    #[test]
    fn test_series_builder_keeps_parameters() {
        let series = TestMeasurementSeries::new(vec![60.0, 120.0], vec![0.1, 0.2])
            .unwrap()
            .with_pumping_rate(0.002)
            .with_distance(30.0);
        assert_eq!(series.parameters().pumping_rate, Some(0.002));
        assert_eq!(series.require_distance(), Ok(30.0));
        assert_eq!(series.parameters().radius, None);
    }

    #[test]
    fn test_missing_pumping_rate() {
        let series = TestMeasurementSeries::new(vec![60.0], vec![0.1]).unwrap();
        assert_eq!(
            series.require_pumping_rate(),
            Err(InversionError::MissingParameter("pumping_rate"))
        );
    }

    #[test]
    fn test_injection_test_validates_steps() {
        assert!(InjectionTest::new(0.0).is_err());
        let test = InjectionTest::from_steps(5.0, [(5.0, 10.0), (10.0, 20.0)]).unwrap();
        assert_eq!(test.steps().len(), 2);
        assert!(InjectionTest::new(5.0).unwrap().with_step(0.0, 1.0).is_err());
        assert!(InjectionTest::new(5.0).unwrap().with_step(5.0, -1.0).is_err());
    }

    #[test]
    fn test_level_series_from_dates_floors_days() {
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let series = LevelSeries::from_dates(&[d0, d1], vec![10.0, 10.2]).unwrap();
        // 1 day 18 hours -> 1 whole day
        assert_eq!(series.elapsed_days(), &[0.0, 1.0]);
    }

    #[test]
    fn test_geometry_parsing() {
        assert_eq!("Cylinder".parse::<DecayGeometry>(), Ok(DecayGeometry::Cylinder));
        assert_eq!("packer".parse::<DecayGeometry>(), Ok(DecayGeometry::Packer));
        assert!("sphere".parse::<DecayGeometry>().is_err());
    }
}
