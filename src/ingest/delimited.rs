//! Delimited text series (CSV / TXT / DAT)
//!
//! Expected layout, one observation per line:
//!
//! ```text
//! # pumping_rate = 0.001
//! # distance = 50
//! time_s;drawdown_m
//! 60;0,012
//! 120;0,031
//! ```
//!
//! - `#` lines are comments; `# key = value` sets a test parameter
//!   (`pumping_rate`, `distance`, `radius`, `segment_length`, `initial_head`)
//! - the separator is detected from the first data line: `;`, then tab,
//!   then `,`, then whitespace
//! - with `;` or tab separators a decimal comma is accepted
//! - a first data line whose first field is not a number is a header
//! - the first two columns are time (s) and observed value; extra columns are ignored

use tracing::warn;

use super::{IngestError, SeriesParser};
use crate::types::{TestMeasurementSeries, TestParameters};

/// Column separator of a delimited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Semicolon,
    Tab,
    Comma,
    Whitespace,
}

impl Separator {
    fn detect(line: &str) -> Self {
        if line.contains(';') {
            Separator::Semicolon
        } else if line.contains('\t') {
            Separator::Tab
        } else if line.contains(',') {
            Separator::Comma
        } else {
            Separator::Whitespace
        }
    }

    fn split<'a>(self, line: &'a str) -> Vec<&'a str> {
        match self {
            Separator::Semicolon => line.split(';').map(str::trim).collect(),
            Separator::Tab => line.split('\t').map(str::trim).collect(),
            Separator::Comma => line.split(',').map(str::trim).collect(),
            Separator::Whitespace => line.split_whitespace().collect(),
        }
    }

    fn allows_decimal_comma(self) -> bool {
        matches!(self, Separator::Semicolon | Separator::Tab)
    }
}

/// Delimited text parser. The separator is auto-detected unless fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelimitedParser {
    separator: Option<Separator>,
}

impl DelimitedParser {
    pub fn with_separator(separator: Separator) -> Self {
        Self {
            separator: Some(separator),
        }
    }
}

impl SeriesParser for DelimitedParser {
    fn format_name(&self) -> &str {
        "delimited"
    }

    fn extensions(&self) -> &[&'static str] {
        &["csv", "txt", "dat", "tsv"]
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        let Ok(text) = std::str::from_utf8(bytes) else {
            return false;
        };
        text.lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .is_some_and(|line| {
                let separator = self.separator.unwrap_or_else(|| Separator::detect(line));
                separator.split(line).len() >= 2
            })
    }

    fn parse(&self, bytes: &[u8]) -> Result<TestMeasurementSeries, IngestError> {
        let text = std::str::from_utf8(bytes)?;
        let mut parameters = TestParameters::default();
        let mut separator = self.separator;
        let mut times = Vec::new();
        let mut values = Vec::new();
        let mut seen_data_line = false;

        for (index, raw) in text.lines().enumerate() {
            let line_num = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                apply_parameter(&mut parameters, comment, line_num)?;
                continue;
            }

            let sep = *separator.get_or_insert_with(|| Separator::detect(line));
            let fields = sep.split(line);
            if fields.len() < 2 {
                return Err(IngestError::Parse {
                    line: line_num,
                    reason: format!("expected at least 2 columns, got {}", fields.len()),
                });
            }

            let first_line = !seen_data_line;
            seen_data_line = true;
            let time = match parse_number(fields[0], sep) {
                Some(t) => t,
                // Header
                None if first_line => continue,
                None => {
                    return Err(IngestError::Parse {
                        line: line_num,
                        reason: format!("cannot parse time '{}'", fields[0]),
                    })
                }
            };
            let value = parse_number(fields[1], sep).ok_or_else(|| IngestError::Parse {
                line: line_num,
                reason: format!("cannot parse value '{}'", fields[1]),
            })?;
            times.push(time);
            values.push(value);
        }

        Ok(TestMeasurementSeries::new(times, values)?.with_parameters(parameters))
    }
}

fn parse_number(field: &str, separator: Separator) -> Option<f64> {
    let field = field.trim();
    field.parse::<f64>().ok().or_else(|| {
        if separator.allows_decimal_comma() && field.matches(',').count() == 1 {
            field.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })
}

/// Apply a `key = value` comment. Comments that are not assignments are ignored.
fn apply_parameter(
    parameters: &mut TestParameters,
    comment: &str,
    line_num: usize,
) -> Result<(), IngestError> {
    let Some((key, value)) = comment.split_once('=') else {
        return Ok(());
    };
    let key = key.trim().to_lowercase();
    let slot = match key.as_str() {
        "pumping_rate" | "q" => &mut parameters.pumping_rate,
        "distance" | "r" => &mut parameters.distance,
        "radius" => &mut parameters.radius,
        "segment_length" | "length" => &mut parameters.segment_length,
        "initial_head" | "h0" => &mut parameters.initial_head,
        _ => {
            warn!(line = line_num, key = %key, "unknown parameter in header comment");
            return Ok(());
        }
    };
    let value = value.trim();
    let parsed = value
        .parse::<f64>()
        .or_else(|_| value.replace(',', ".").parse::<f64>())
        .map_err(|_| IngestError::Parse {
            line: line_num,
            reason: format!("cannot parse {key} value '{value}'"),
        })?;
    *slot = Some(parsed);
    Ok(())
}
