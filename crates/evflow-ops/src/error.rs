//! Error types for sampling and warping operations.

use thiserror::Error;

/// Error type for the tensor operations in this crate.
///
/// Shape problems are detected before any tensor work is issued so that a bad
/// input never reaches the backend, where it would surface as a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpsError {
    /// An input tensor does not have the shape required by the operation.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The operation or argument the check belongs to.
        context: &'static str,
        /// The expected shape, in human readable form.
        expected: String,
        /// The shape that was received.
        actual: String,
    },

    /// A spatial axis is too small to be normalized to `[-1, 1]`.
    #[error("Degenerate input in {context}: {axis} axis has extent {size}, at least 2 required")]
    DegenerateInput {
        /// The operation or argument the check belongs to.
        context: &'static str,
        /// Name of the offending axis (`"height"` or `"width"`).
        axis: &'static str,
        /// Extent of the offending axis.
        size: usize,
    },
}

/// A specialized `Result` type for sampling and warping operations.
pub type OpsResult<T> = Result<T, OpsError>;
