//! Rank adapters for single images and image batches.
//!
//! Sampling and warping are implemented once for rank-4 batches. Rank-3 inputs
//! (a single image without batch dimension) gain a leading batch axis of size
//! one on the way in and lose it again on the way out.

use burn::prelude::*;

/// A float tensor that can be viewed as a batch of 2D planes.
///
/// Implemented for `Tensor<B, 3>` (`[C, H, W]`, one item) and
/// `Tensor<B, 4>` (`[N, C, H, W]`).
pub trait Batched<B: Backend>: Sized {
    /// Convert into a rank-4 batch.
    fn into_batch(self) -> Tensor<B, 4>;

    /// Convert a rank-4 batch back into the rank of `Self`.
    fn from_batch(batch: Tensor<B, 4>) -> Self;

    /// Shape of the tensor as it was passed in.
    fn shape_vec(&self) -> Vec<usize>;
}

impl<B: Backend> Batched<B> for Tensor<B, 4> {
    fn into_batch(self) -> Tensor<B, 4> {
        self
    }

    fn from_batch(batch: Tensor<B, 4>) -> Self {
        batch
    }

    fn shape_vec(&self) -> Vec<usize> {
        self.dims().to_vec()
    }
}

impl<B: Backend> Batched<B> for Tensor<B, 3> {
    fn into_batch(self) -> Tensor<B, 4> {
        self.unsqueeze_dim(0)
    }

    fn from_batch(batch: Tensor<B, 4>) -> Self {
        batch.squeeze(0)
    }

    fn shape_vec(&self) -> Vec<usize> {
        self.dims().to_vec()
    }
}
