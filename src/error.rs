//! Error taxonomy for the inversion engine.
//!
//! Inverters validate their inputs eagerly and fail with the specific error
//! kind instead of returning NaN/Inf. The validation and anomaly layers never
//! use these errors for "bad" data; they report it as findings instead.

use thiserror::Error;

/// Errors raised by the well function, the fitter and the inverters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InversionError {
    /// A value lies outside a function's mathematical domain
    /// (e.g. `u = 0` in the well function, a non-positive time under a logarithm).
    #[error("value outside the domain of {function}: {detail}")]
    InvalidDomain {
        function: &'static str,
        detail: String,
    },

    /// A supplied scalar violates a physical invariant (Q <= 0, S outside (0,1), ...).
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A test scalar required by the model was not supplied with the series.
    #[error("missing test parameter: {0}")]
    MissingParameter(&'static str),

    /// Fewer measurement points than the model needs.
    #[error("insufficient data for {model}: need {needed}, have {available}")]
    InsufficientData {
        model: &'static str,
        needed: usize,
        available: usize,
    },

    /// The optimizer did not converge, or converged onto a non-physical result.
    #[error("{model} fit failed: {reason}")]
    FitConvergence { model: &'static str, reason: String },
}

impl InversionError {
    pub(crate) fn domain(function: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidDomain {
            function,
            detail: detail.into(),
        }
    }

    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn convergence(model: &'static str, reason: impl Into<String>) -> Self {
        Self::FitConvergence {
            model,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the inversion engine.
pub type Result<T> = std::result::Result<T, InversionError>;

/// Fail with `InvalidParameter` unless `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InversionError::parameter(
            name,
            format!("must be finite and > 0 (got {value})"),
        ))
    }
}

/// Fail with `InsufficientData` when fewer than `needed` points are available.
pub(crate) fn require_points(model: &'static str, available: usize, needed: usize) -> Result<()> {
    if available < needed {
        Err(InversionError::InsufficientData {
            model,
            needed,
            available,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive() {
        assert_eq!(require_positive("Q", 0.5), Ok(0.5));
        assert!(matches!(
            require_positive("Q", 0.0),
            Err(InversionError::InvalidParameter { name: "Q", .. })
        ));
        assert!(require_positive("Q", f64::NAN).is_err());
        assert!(require_positive("Q", f64::INFINITY).is_err());
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = require_points("Theis", 1, 2).unwrap_err();
        assert_eq!(err.to_string(), "insufficient data for Theis: need 2, have 1");
    }
}
