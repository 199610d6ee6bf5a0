//! Error types for model construction, training and rollout
//!
//! Two failure families exist: configuration problems (shapes, time
//! constants) that are reported before any numeric work starts, and numeric
//! divergence detected after an epoch or a rollout step.

use std::fmt;

/// Result type alias for model operations
pub type CtrnnResult<T> = Result<T, CtrnnError>;

/// Error type for model, trainer and predictor operations
#[derive(Debug, Clone, PartialEq)]
pub enum CtrnnError {
    /// Invalid hyperparameter or constructor argument
    InvalidConfiguration {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Declared dimensionality does not match the data handed in
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    /// Loss or output became NaN or infinite
    NumericDivergence {
        context: String,
        index: usize,
        value: f32,
    },

    /// Operation needs at least one element
    EmptySequence { context: String },
}

impl fmt::Display for CtrnnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtrnnError::InvalidConfiguration {
                parameter,
                value,
                reason,
            } => {
                write!(
                    f,
                    "Invalid configuration for parameter '{}' with value '{}': {}",
                    parameter, value, reason
                )
            }
            CtrnnError::DimensionMismatch {
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch in {}: expected {} dimensions, got {}",
                    context, expected, got
                )
            }
            CtrnnError::NumericDivergence {
                context,
                index,
                value,
            } => {
                write!(
                    f,
                    "Numeric divergence in {} at index {}: value {} is not finite",
                    context, index, value
                )
            }
            CtrnnError::EmptySequence { context } => {
                write!(f, "Empty sequence: {}", context)
            }
        }
    }
}

impl std::error::Error for CtrnnError {}

impl CtrnnError {
    /// Create an invalid configuration error
    pub fn invalid_config(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        CtrnnError::InvalidConfiguration {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, got: usize, context: impl Into<String>) -> Self {
        CtrnnError::DimensionMismatch {
            expected,
            got,
            context: context.into(),
        }
    }

    /// Create a numeric divergence error
    pub fn divergence(context: impl Into<String>, index: usize, value: f32) -> Self {
        CtrnnError::NumericDivergence {
            context: context.into(),
            index,
            value,
        }
    }

    /// Create an empty sequence error
    pub fn empty_sequence(context: impl Into<String>) -> Self {
        CtrnnError::EmptySequence {
            context: context.into(),
        }
    }

    /// True for errors that are raised before any numeric work begins.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CtrnnError::InvalidConfiguration { .. }
                | CtrnnError::DimensionMismatch { .. }
                | CtrnnError::EmptySequence { .. }
        )
    }

    /// True when a loss or output left the finite range.
    pub fn is_divergence(&self) -> bool {
        matches!(self, CtrnnError::NumericDivergence { .. })
    }
}

/// Fails with a shape error unless `got == expected`.
pub(crate) fn ensure_dimension(expected: usize, got: usize, context: &str) -> CtrnnResult<()> {
    if expected != got {
        return Err(CtrnnError::dimension_mismatch(expected, got, context));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = CtrnnError::invalid_config("tau", 0.0, "must be >= 1");
        let msg = err.to_string();
        assert!(msg.contains("tau"));
        assert!(msg.contains("0"));
        assert!(msg.contains("must be >= 1"));
        assert!(err.is_configuration());
        assert!(!err.is_divergence());
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = CtrnnError::dimension_mismatch(5, 3, "hidden state");
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
        assert!(msg.contains("hidden state"));
    }

    #[test]
    fn test_divergence_display() {
        let err = CtrnnError::divergence("training loss", 12, f32::NAN);
        let msg = err.to_string();
        assert!(msg.contains("training loss"));
        assert!(msg.contains("12"));
        assert!(msg.contains("NaN"));
        assert!(err.is_divergence());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_ensure_dimension() {
        assert!(ensure_dimension(2, 2, "input").is_ok());
        let err = ensure_dimension(2, 1, "input").unwrap_err();
        assert_eq!(err, CtrnnError::dimension_mismatch(2, 1, "input"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CtrnnError>();
    }
}
