//! Lithology-indexed parameter recommendations
//!
//! A fixed table of plausible ranges per lithology, looked up forward (by
//! name) or in reverse (lithology and porosity guessed from a measured K).
//! Ranges are kept exactly as tabulated, bounds in either order.

use thiserror::Error;
use tracing::debug;

use crate::types::{
    ms_to_m_per_day, MeasuredRecommendation, MeasuredValues, RecommendationSet, ValueRange,
};

/// Confidence with a measured K.
pub const CONFIDENCE_MEASURED_K: f64 = 85.0;
/// Confidence with only a lithology name.
pub const CONFIDENCE_LITHOLOGY: f64 = 70.0;
/// Confidence with neither.
pub const CONFIDENCE_NONE: f64 = 40.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecommendationError {
    #[error("unknown lithology '{name}' (available: {})", .available.join(", "))]
    UnknownLithology {
        name: String,
        available: Vec<String>,
    },
}

/// One row of the lithology table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LithologyEntry {
    pub key: &'static str,
    /// Hydraulic conductivity (m/s)
    pub k_range: ValueRange,
    pub porosity: ValueRange,
    pub storage: ValueRange,
    pub description: &'static str,
}

/// Typical ranges by lithology.
pub const LITHOLOGY_TABLE: &[LithologyEntry] = &[
    LithologyEntry {
        key: "graviers",
        k_range: ValueRange(1e-2, 1e-3),
        porosity: ValueRange(0.30, 0.45),
        storage: ValueRange(1e-3, 1e-2),
        description: "Highly permeable formation (unconfined aquifer)",
    },
    LithologyEntry {
        key: "sables",
        k_range: ValueRange(1e-3, 1e-5),
        porosity: ValueRange(0.25, 0.40),
        storage: ValueRange(1e-3, 1e-4),
        description: "Typical unconfined aquifer",
    },
    LithologyEntry {
        key: "silt_limon",
        k_range: ValueRange(1e-5, 1e-7),
        porosity: ValueRange(0.35, 0.50),
        storage: ValueRange(1e-4, 1e-5),
        description: "Semi-permeable formation, aquitard",
    },
    LithologyEntry {
        key: "argile",
        k_range: ValueRange(1e-7, 1e-9),
        porosity: ValueRange(0.40, 0.60),
        storage: ValueRange(1e-5, 1e-6),
        description: "Impermeable formation, confining layer",
    },
    LithologyEntry {
        key: "calcaire_fissure",
        k_range: ValueRange(1e-4, 1e-7),
        porosity: ValueRange(0.05, 0.20),
        storage: ValueRange(1e-5, 1e-4),
        description: "Karst or fissured limestone",
    },
    LithologyEntry {
        key: "granite_fissure",
        k_range: ValueRange(1e-6, 1e-9),
        porosity: ValueRange(0.01, 0.05),
        storage: ValueRange(1e-6, 1e-5),
        description: "Hard rock with fissures",
    },
];

/// Find a table row. Case and surrounding whitespace are ignored;
/// `silt` is accepted for `silt_limon`.
pub fn lookup_lithology(name: &str) -> Option<&'static LithologyEntry> {
    let normalized = name.trim().to_lowercase();
    let key = match normalized.as_str() {
        "silt" | "limon" => "silt_limon",
        other => other,
    };
    LITHOLOGY_TABLE.iter().find(|entry| entry.key == key)
}

/// `(key, description)` for every tabulated lithology, in table order.
pub fn lithology_list() -> Vec<(&'static str, &'static str)> {
    LITHOLOGY_TABLE
        .iter()
        .map(|entry| (entry.key, entry.description))
        .collect()
}

/// Probable lithology for a measured K (m/s). Below 1e-9 the answer,
/// `roche_massive`, is outside the table.
pub fn guess_lithology(conductivity: f64) -> &'static str {
    if conductivity > 1e-3 {
        "graviers"
    } else if conductivity > 1e-5 {
        "sables"
    } else if conductivity > 1e-7 {
        "silt_limon"
    } else if conductivity > 1e-9 {
        "argile"
    } else {
        "roche_massive"
    }
}

/// Empirical mean porosity for a measured K (m/s).
pub fn estimate_porosity(conductivity: f64) -> f64 {
    if conductivity > 1e-3 {
        0.38
    } else if conductivity > 1e-5 {
        0.32
    } else if conductivity > 1e-7 {
        0.42
    } else {
        0.05
    }
}

/// Lithology-based parameter recommender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterRecommender;

impl ParameterRecommender {
    pub fn new() -> Self {
        Self
    }

    /// Full ranges and a pedagogical explanation for a lithology.
    pub fn recommend_from_lithology(
        &self,
        lithology: &str,
    ) -> Result<RecommendationSet, RecommendationError> {
        let entry = lookup_lithology(lithology).ok_or_else(|| {
            RecommendationError::UnknownLithology {
                name: lithology.to_string(),
                available: LITHOLOGY_TABLE.iter().map(|e| e.key.to_string()).collect(),
            }
        })?;

        let k_range_m_per_day = entry.k_range.scaled(ms_to_m_per_day(1.0));
        Ok(RecommendationSet {
            lithology: entry.key.to_string(),
            description: entry.description.to_string(),
            k_range: entry.k_range,
            k_typical: entry.k_range.geometric_mean(),
            k_range_m_per_day,
            porosity_range: entry.porosity,
            storage_range: entry.storage,
            explanation: explanation(entry, k_range_m_per_day),
            confidence: CONFIDENCE_LITHOLOGY,
        })
    }

    /// Infer missing parameters from partial measurements.
    ///
    /// A measured K gives a lithology guess and, when porosity was not
    /// measured, a porosity guess. A known lithology adds its table ranges.
    pub fn recommend_from_measurements(&self, measured: &MeasuredValues) -> MeasuredRecommendation {
        let mut explanations = Vec::new();
        let mut lithology_guess = None;
        let mut porosity_guess = None;

        let conductivity = measured
            .hydraulic_conductivity
            .filter(|k| k.is_finite() && *k != 0.0);
        if let Some(k) = conductivity {
            let guess = guess_lithology(k);
            explanations.push(format!("✓ From K={k:.2e} m/s → probable lithology: {guess}"));
            lithology_guess = Some(guess.to_string());

            if measured.porosity.is_none() {
                let porosity = estimate_porosity(k);
                explanations.push(format!("✓ Estimated porosity: {:.1}%", porosity * 100.0));
                porosity_guess = Some(porosity);
            }
        }

        let lithology = measured
            .lithology
            .as_deref()
            .filter(|name| !name.trim().is_empty());
        let from_lithology = lithology.and_then(|name| match self.recommend_from_lithology(name) {
            Ok(set) => {
                explanations.push(format!("✓ Ranges from lithology: {name}"));
                Some(set)
            }
            Err(err) => {
                debug!(%err, "lithology ignored");
                None
            }
        });

        let confidence = if conductivity.is_some() {
            CONFIDENCE_MEASURED_K
        } else if lithology.is_some() {
            CONFIDENCE_LITHOLOGY
        } else {
            CONFIDENCE_NONE
        };

        MeasuredRecommendation {
            lithology_guess,
            porosity_guess,
            from_lithology,
            explanations,
            confidence,
        }
    }
}

fn explanation(entry: &LithologyEntry, k_m_per_day: ValueRange) -> String {
    let k = entry.k_range;
    let title = format!("Recommendation for {}", entry.key.to_uppercase());
    format!(
        "{title}\n{rule}\n\n\
         Aquifer type: {description}\n\n\
         Typical parameters:\n\
         \x20 • Conductivity K: {k0:.2e} - {k1:.2e} m/s\n\
         \x20                   ({d0:.2e} - {d1:.2e} m/day)\n\
         \x20 • Porosity: {p0:.0} - {p1:.0}%\n\
         \x20 • Storage coefficient: {s0:.2e} - {s1:.2e}\n\n\
         Advice:\n\
         \x20 → Use the typical value for preliminary calculations\n\
         \x20 → Test the sensitivity with the min and max\n\
         \x20 → Refine with in-situ measurements (Lefranc, Lugeon, Theis)",
        rule = "=".repeat(40),
        description = entry.description,
        k0 = k.0,
        k1 = k.1,
        d0 = k_m_per_day.0,
        d1 = k_m_per_day.1,
        p0 = entry.porosity.0 * 100.0,
        p1 = entry.porosity.1 * 100.0,
        s0 = entry.storage.0,
        s1 = entry.storage.1,
    )
}
