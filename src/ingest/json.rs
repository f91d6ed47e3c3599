//! JSON series documents
//!
//! ```json
//! {
//!   "times": [60, 120, 240],
//!   "values": [0.012, 0.031, 0.055],
//!   "parameters": { "pumping_rate": 0.001, "distance": 50 }
//! }
//! ```
//!
//! Lugeon tests use their own document, read by [`parse_injection_test`]:
//! `{"segment_length": 5, "steps": [{"pressure_bar": 10, "discharge_lpm": 30}]}`.

use serde::Deserialize;

use super::{IngestError, SeriesParser};
use crate::types::{InjectionStep, InjectionTest, TestMeasurementSeries, TestParameters};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeriesDocument {
    times: Vec<f64>,
    values: Vec<f64>,
    #[serde(default)]
    parameters: TestParameters,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InjectionDocument {
    segment_length: f64,
    steps: Vec<InjectionStep>,
}

/// JSON series parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonParser;

impl SeriesParser for JsonParser {
    fn format_name(&self) -> &str {
        "JSON"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'{')
    }

    fn parse(&self, bytes: &[u8]) -> Result<TestMeasurementSeries, IngestError> {
        let doc: SeriesDocument = serde_json::from_slice(bytes)?;
        Ok(TestMeasurementSeries::new(doc.times, doc.values)?.with_parameters(doc.parameters))
    }
}

/// Read a Lugeon injection test document.
pub fn parse_injection_test(bytes: &[u8]) -> Result<InjectionTest, IngestError> {
    let doc: InjectionDocument = serde_json::from_slice(bytes)?;
    let test = InjectionTest::from_steps(
        doc.segment_length,
        doc.steps.iter().map(|s| (s.pressure_bar, s.discharge_lpm)),
    )?;
    Ok(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_series_document() {
        let json = br#"{"times": [60, 120], "values": [0.01, 0.02], "parameters": {"pumping_rate": 0.001, "distance": 50}}"#;
        let series = JsonParser.parse(json).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.parameters().distance, Some(50.0));
        assert_eq!(series.parameters().radius, None);
    }

    #[test]
    fn test_parameters_optional() {
        let series = JsonParser.parse(br#"{"times": [1], "values": [2]}"#).unwrap();
        assert_eq!(series.parameters(), &TestParameters::default());
    }

    #[test]
    fn test_mismatched_lengths() {
        let err = JsonParser
            .parse(br#"{"times": [1, 2], "values": [2]}"#)
            .unwrap_err();
        assert!(matches!(err, IngestError::Series(_)));
    }

    #[test]
    fn test_injection_document() {
        let json = br#"{"segment_length": 5, "steps": [{"pressure_bar": 10, "discharge_lpm": 30}, {"pressure_bar": 5, "discharge_lpm": 14}]}"#;
        let test = parse_injection_test(json).unwrap();
        assert_eq!(test.steps().len(), 2);
        assert_eq!(test.segment_length(), 5.0);
        assert!(parse_injection_test(br#"{"segment_length": 0, "steps": []}"#).is_err());
    }

    #[test]
    fn test_sniff() {
        assert!(JsonParser.sniff(b"  \n{\"times\": []}"));
        assert!(!JsonParser.sniff(b"1,2"));
    }
}
