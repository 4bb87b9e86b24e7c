//! Sampling operations for the Burn deep learning framework
//!
//! This crate provides the image resampling and flow warping operations that
//! unsupervised optical flow training needs but that are not available in the
//! core Burn framework.

use burn::prelude::*;

mod batch;
mod coords;
mod error;
mod grid_sample;
mod warp;

// Convenient re-exports
#[doc(inline)]
pub use batch::Batched;
#[doc(inline)]
pub use coords::{denormalize_coords, normalize_coords};
#[doc(inline)]
pub use error::{OpsError, OpsResult};
#[doc(inline)]
pub use grid_sample::{grid_sample_2d, GridSampleOptions};
#[doc(inline)]
pub use warp::{pixel_grid, warp_images_with_flow, warp_images_with_flow_with_options};

/// Flow warping as a method on image tensors.
pub trait TensorWarpOps<B: Backend>: Batched<B> {
    /// Warp the image (or batch) by the displacement field `flow`.
    fn warp_with_flow(self, flow: Self) -> OpsResult<Self> {
        warp_images_with_flow(self, flow)
    }
}

impl<B: Backend> TensorWarpOps<B> for Tensor<B, 3> {}
impl<B: Backend> TensorWarpOps<B> for Tensor<B, 4> {}
