//! Inverse warping of images through a dense displacement field.
//!
//! Each output pixel reads the input at `pixel_index + displacement`. The
//! displacement channels are paired with the index grid in the channel order
//! the flow networks are trained with: channel 0 shifts the row position and
//! channel 1 shifts the column position.

use burn::prelude::*;

use crate::{
    batch::Batched,
    coords::normalize_coords,
    error::{OpsError, OpsResult},
    grid_sample::{grid_sample_batch, GridSampleOptions},
};

/// Row and column index grids of shape `[1, height, width]`.
pub fn pixel_grid<B: Backend>(
    height: usize,
    width: usize,
    device: &B::Device,
) -> (Tensor<B, 3>, Tensor<B, 3>) {
    let rows = Tensor::<B, 1, Int>::arange(0..height as i64, device)
        .float()
        .reshape([1, height, 1])
        .repeat_dim(2, width);
    let cols = Tensor::<B, 1, Int>::arange(0..width as i64, device)
        .float()
        .reshape([1, 1, width])
        .repeat_dim(1, height);

    (rows, cols)
}

/// Warp `images` with `flow` using aligned-corner bilinear sampling.
///
/// See [`warp_images_with_flow_with_options`].
pub fn warp_images_with_flow<B: Backend, T: Batched<B>>(images: T, flow: T) -> OpsResult<T> {
    warp_images_with_flow_with_options(images, flow, &GridSampleOptions::new())
}

/// Resample `images` at `pixel_index + flow`.
///
/// The image must already have the spatial resolution of the flow field; both
/// spatial axes need at least two pixels so they can be normalized.
///
/// # Shapes
///
/// - images: `[N, C, H, W]` or `[C, H, W]`
/// - flow: `[N, 2, H, W]` or `[2, H, W]`
/// - output: same shape as `images`
pub fn warp_images_with_flow_with_options<B: Backend, T: Batched<B>>(
    images: T,
    flow: T,
    options: &GridSampleOptions,
) -> OpsResult<T> {
    let image_shape = images.shape_vec();
    let flow_shape = flow.shape_vec();
    let images = images.into_batch();
    let flow = flow.into_batch();

    let [batch_size, _, image_height, image_width] = images.dims();
    let [flow_batch, components, height, width] = flow.dims();

    if batch_size == 0 {
        return Err(OpsError::ShapeMismatch {
            context: "warp images",
            expected: "at least one batch item".to_owned(),
            actual: format!("{image_shape:?}"),
        });
    }
    if components != 2 || flow_batch != batch_size {
        return Err(OpsError::ShapeMismatch {
            context: "warp flow",
            expected: format!("[{batch_size}, 2, H, W]"),
            actual: format!("{flow_shape:?}"),
        });
    }
    if image_height != height || image_width != width {
        return Err(OpsError::ShapeMismatch {
            context: "warp images",
            expected: format!("spatial size {height}x{width} of the flow field"),
            actual: format!("{image_shape:?}"),
        });
    }
    for (axis, size) in [("height", height), ("width", width)] {
        if size < 2 {
            return Err(OpsError::DegenerateInput {
                context: "warp flow",
                axis,
                size,
            });
        }
    }

    let (rows, cols) = pixel_grid::<B>(height, width, &flow.device());

    let flow_rows = flow
        .clone()
        .slice([0..batch_size, 0..1, 0..height, 0..width])
        .reshape([batch_size, height, width]);
    let flow_cols = flow
        .slice([0..batch_size, 1..2, 0..height, 0..width])
        .reshape([batch_size, height, width]);

    let pos_rows = normalize_coords(rows.repeat_dim(0, batch_size) + flow_rows, height);
    let pos_cols = normalize_coords(cols.repeat_dim(0, batch_size) + flow_cols, width);

    // The sampler reads (x, y), i.e. (column, row).
    let grid = Tensor::stack::<4>(vec![pos_cols, pos_rows], 3);

    grid_sample_batch(images, grid, options).map(T::from_batch)
}
