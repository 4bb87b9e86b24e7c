//! Error types for loss computation.
//!
//! Every failure aborts the current loss evaluation and is returned unchanged
//! to the training loop, which decides whether to skip the step or stop.

use evflow_ops::OpsError;
use thiserror::Error;

/// The error type for unsupervised flow loss computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowLossError {
    /// Input tensors have incompatible shapes (batch size, channel count,
    /// spatial size or rank).
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: String,
        /// The expected shape.
        expected: String,
        /// The shape that was received.
        actual: String,
    },

    /// A spatial axis has fewer than two pixels and cannot be normalized.
    #[error("Degenerate input in {context}: {axis} axis has extent {size}, at least 2 required")]
    DegenerateInput {
        /// Where the degenerate axis was detected.
        context: String,
        /// Name of the offending axis.
        axis: &'static str,
        /// Extent of the offending axis.
        size: usize,
    },

    /// The multi-scale prediction holds no scale at all.
    #[error("Flow prediction contains no scales")]
    EmptyPrediction,

    /// A named prediction skips a scale index.
    #[error("Flow prediction is missing scale {index} (expected key \"flow{index}\")")]
    MissingScale {
        /// The missing scale index.
        index: usize,
    },

    /// A named prediction contains a key outside the `flow{i}` convention.
    #[error("Unexpected flow prediction key: {key}")]
    UnexpectedScaleKey {
        /// The offending key.
        key: String,
    },
}

impl From<OpsError> for FlowLossError {
    fn from(error: OpsError) -> Self {
        match error {
            OpsError::ShapeMismatch {
                context,
                expected,
                actual,
            } => Self::ShapeMismatch {
                context: context.to_owned(),
                expected,
                actual,
            },
            OpsError::DegenerateInput {
                context,
                axis,
                size,
            } => Self::DegenerateInput {
                context: context.to_owned(),
                axis,
                size,
            },
        }
    }
}

/// A specialized `Result` type for loss computation.
pub type FlowLossResult<T> = Result<T, FlowLossError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_errors_keep_their_category() {
        let shape: FlowLossError = OpsError::ShapeMismatch {
            context: "warp flow",
            expected: "[1, 2, H, W]".to_owned(),
            actual: "[1, 3, 4, 4]".to_owned(),
        }
        .into();
        assert!(matches!(shape, FlowLossError::ShapeMismatch { .. }));

        let degenerate: FlowLossError = OpsError::DegenerateInput {
            context: "warp flow",
            axis: "width",
            size: 1,
        }
        .into();
        assert_eq!(
            degenerate.to_string(),
            "Degenerate input in warp flow: width axis has extent 1, at least 2 required"
        );
    }

    #[test]
    fn missing_scale_names_the_expected_key() {
        let error = FlowLossError::MissingScale { index: 2 };
        assert_eq!(
            error.to_string(),
            "Flow prediction is missing scale 2 (expected key \"flow2\")"
        );
    }
}
