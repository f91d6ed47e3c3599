//! Measurement file ingestion
//!
//! Parsers are capabilities, not a class hierarchy: anything implementing
//! [`SeriesParser`] turns raw bytes into a [`TestMeasurementSeries`]. A
//! [`FormatRegistry`] picks the parser by file extension, falling back to
//! content sniffing when the extension is unknown or missing.
//!
//! Built-in formats:
//! - delimited text (`.csv`, `.txt`, `.dat`, `.tsv`): `,` `;` tab or
//!   whitespace separated, optional header, decimal comma with `;`/tab
//! - JSON (`.json`): `{"times": [...], "values": [...], "parameters": {...}}`

pub mod delimited;
pub mod json;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::error::InversionError;
use crate::types::TestMeasurementSeries;

pub use delimited::DelimitedParser;
pub use json::{parse_injection_test, JsonParser};

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid series: {0}")]
    Series(#[from] InversionError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Capability interface of a file-format parser.
pub trait SeriesParser: Send + Sync {
    /// Human-readable name for logging (e.g. "delimited", "JSON").
    fn format_name(&self) -> &str;

    /// Lower-case extensions without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Cheap content check used when the extension does not decide.
    fn sniff(&self, bytes: &[u8]) -> bool;

    fn parse(&self, bytes: &[u8]) -> Result<TestMeasurementSeries, IngestError>;
}

/// Parsers keyed by extension, tried in registration order when sniffing.
pub struct FormatRegistry {
    parsers: Vec<Box<dyn SeriesParser>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(JsonParser));
        registry.register(Box::new(DelimitedParser::default()));
        registry
    }
}

impl FormatRegistry {
    /// Registry with no parsers.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    pub fn register(&mut self, parser: Box<dyn SeriesParser>) {
        debug!(format = parser.format_name(), "registered parser");
        self.parsers.push(parser);
    }

    /// `(format, extensions)` for every registered parser.
    pub fn supported_formats(&self) -> Vec<(&str, &[&'static str])> {
        self.parsers
            .iter()
            .map(|p| (p.format_name(), p.extensions()))
            .collect()
    }

    pub fn for_extension(&self, extension: &str) -> Option<&dyn SeriesParser> {
        let extension = extension.trim_start_matches('.').to_lowercase();
        self.parsers
            .iter()
            .find(|p| p.extensions().contains(&extension.as_str()))
            .map(AsRef::as_ref)
    }

    /// First parser whose sniff accepts the content.
    pub fn detect(&self, bytes: &[u8]) -> Option<&dyn SeriesParser> {
        self.parsers
            .iter()
            .find(|p| p.sniff(bytes))
            .map(AsRef::as_ref)
    }

    /// Parse with the parser for `extension` if one is registered, else by sniffing.
    pub fn parse(
        &self,
        extension: Option<&str>,
        bytes: &[u8],
    ) -> Result<TestMeasurementSeries, IngestError> {
        let parser = extension
            .and_then(|ext| self.for_extension(ext))
            .or_else(|| self.detect(bytes))
            .ok_or_else(|| {
                IngestError::UnsupportedFormat(
                    extension.map_or_else(|| "unrecognised content".to_string(), str::to_string),
                )
            })?;
        parser.parse(bytes)
    }

    /// Read and parse a file.
    pub fn load_file(&self, path: &Path) -> Result<TestMeasurementSeries, IngestError> {
        let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let extension = path.extension().and_then(|e| e.to_str());
        let series = self.parse(extension, &bytes)?;
        info!(path = %path.display(), points = series.len(), "Loaded measurement series");
        Ok(series)
    }
}
