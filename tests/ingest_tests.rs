//! Ingestion Integration Tests
//!
//! Files written to a temp directory, loaded through the format registry and
//! handed straight to an inverter.

use std::fs;

use hydro_inversion::ingest::{parse_injection_test, DelimitedParser, JsonParser};
use hydro_inversion::inversion::theis_drawdown;
use hydro_inversion::synthetic::log_spaced_times;
use hydro_inversion::{AnalysisMethod, AnalysisToolkit, FormatRegistry, IngestError, SeriesParser};

fn theis_csv(separator: char, decimal_comma: bool) -> String {
    let mut text = String::from("# Pumping test P1\n# pumping_rate = 0.001\n# distance = 50\n");
    text.push_str(&format!("time_s{separator}drawdown_m\n"));
    for t in log_spaced_times(60.0, 86_400.0, 25) {
        let s = theis_drawdown(1e-3, 1e-3, 1e-4, 50.0, t).unwrap();
        let line = format!("{t:.6}{separator}{s:.9}");
        text.push_str(&if decimal_comma { line.replace('.', ",") } else { line });
        text.push('\n');
    }
    text
}

#[test]
fn csv_file_feeds_theis_fit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p1.csv");
    fs::write(&path, theis_csv(',', false)).unwrap();

    let toolkit = AnalysisToolkit::default();
    let series = toolkit.formats().load_file(&path).unwrap();
    assert_eq!(series.len(), 25);
    assert_eq!(series.parameters().pumping_rate, Some(0.001));

    let model = toolkit.fit(AnalysisMethod::Theis, &series).unwrap();
    let t = model.transmissivity().unwrap();
    assert!(((t - 1e-3) / 1e-3).abs() < 0.01, "T = {t:e}");
}

#[test]
fn european_semicolon_file_with_decimal_comma() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p1.txt");
    fs::write(&path, theis_csv(';', true)).unwrap();

    let series = FormatRegistry::default().load_file(&path).unwrap();
    assert_eq!(series.len(), 25);
    assert!((series.times()[0] - 60.0).abs() < 1e-6);
    assert_eq!(series.parameters().distance, Some(50.0));
}

#[test]
fn json_file_round_trips_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slug.json");
    fs::write(
        &path,
        r#"{"times": [0, 30, 60, 90], "values": [2.0, 1.4, 1.0, 0.8],
            "parameters": {"radius": 0.04, "segment_length": 1.0}}"#,
    )
    .unwrap();

    let series = FormatRegistry::default().load_file(&path).unwrap();
    assert_eq!(series.values(), &[2.0, 1.4, 1.0, 0.8]);
    assert_eq!(series.parameters().radius, Some(0.04));
    assert_eq!(series.parameters().segment_length, Some(1.0));
}

#[test]
fn missing_file_reports_path() {
    let err = FormatRegistry::default()
        .load_file(std::path::Path::new("/nonexistent/p9.csv"))
        .unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
    assert!(err.to_string().contains("p9.csv"));
}

#[test]
fn unknown_extension_falls_back_to_sniffing() {
    let registry = FormatRegistry::default();
    let series = registry.parse(Some("log"), b"10;0,5\n20;0,7\n").unwrap();
    assert_eq!(series.values(), &[0.5, 0.7]);
    assert!(matches!(
        registry.parse(None, b"lonely"),
        Err(IngestError::UnsupportedFormat(_))
    ));
}

#[test]
fn custom_parser_can_be_registered() {
    struct Pairs;
    impl SeriesParser for Pairs {
        fn format_name(&self) -> &str {
            "pairs"
        }
        fn extensions(&self) -> &[&'static str] {
            &["pairs"]
        }
        fn sniff(&self, _bytes: &[u8]) -> bool {
            false
        }
        fn parse(&self, bytes: &[u8]) -> Result<hydro_inversion::TestMeasurementSeries, IngestError> {
            let text = std::str::from_utf8(bytes)?;
            let numbers: Vec<f64> = text
                .split_whitespace()
                .filter_map(|w| w.parse().ok())
                .collect();
            let (times, values) = numbers.chunks(2).map(|c| (c[0], c[1])).unzip();
            Ok(hydro_inversion::TestMeasurementSeries::new(times, values)?)
        }
    }

    let mut registry = FormatRegistry::empty();
    registry.register(Box::new(Pairs));
    registry.register(Box::new(JsonParser));
    registry.register(Box::new(DelimitedParser::default()));

    let series = registry.parse(Some("PAIRS"), b"1 2 3 4").unwrap();
    assert_eq!(series.times(), &[1.0, 3.0]);
    assert_eq!(registry.supported_formats().len(), 3);
}

#[test]
fn injection_document_feeds_lugeon() {
    let test = parse_injection_test(
        br#"{"segment_length": 5, "steps": [
            {"pressure_bar": 5, "discharge_lpm": 15},
            {"pressure_bar": 10, "discharge_lpm": 30},
            {"pressure_bar": 5, "discharge_lpm": 15}
        ]}"#,
    )
    .unwrap();
    let result = AnalysisToolkit::default().lugeon().analyze(&test).unwrap();
    assert!((result.lugeon_mean - 6.0).abs() < 1e-12);
    assert!((result.k_mean - 6e-7).abs() < 1e-18);
}
