//! Bilinear grid sampling with zero padding.
//!
//! For every output location the grid holds a normalized `(x, y)` coordinate in
//! `[-1, 1]`. The output value is the bilinear blend of the four input pixels
//! surrounding that coordinate. Corners that fall outside the input contribute
//! zero, so sampling far outside the image yields zero instead of a clamped or
//! wrapped value.
//!
//! Only gather and elementwise tensor operations are used, so the output is
//! differentiable with respect to both the input and the grid.

use burn::prelude::*;

use crate::{
    batch::Batched,
    coords::denormalize_coords,
    error::{OpsError, OpsResult},
};

/// Configuration for [`grid_sample_2d`].
#[derive(Config, Debug)]
pub struct GridSampleOptions {
    /// Whether `-1`/`+1` refer to the centers of the corner pixels (`true`)
    /// or to their outer edges (`false`). Default: true
    #[config(default = true)]
    pub align_corners: bool,
}

/// Sample `input` at the normalized locations in `grid`.
///
/// # Shapes
///
/// - input: `[N, C, H, W]` or `[C, H, W]`
/// - grid: `[N, H_out, W_out, 2]` or `[H_out, W_out, 2]`, last axis ordered `(x, y)`
/// - output: `[N, C, H_out, W_out]` or `[C, H_out, W_out]`, same rank as `input`
pub fn grid_sample_2d<B: Backend, T: Batched<B>>(
    input: T,
    grid: T,
    options: &GridSampleOptions,
) -> OpsResult<T> {
    grid_sample_batch(input.into_batch(), grid.into_batch(), options).map(T::from_batch)
}

pub(crate) fn grid_sample_batch<B: Backend>(
    input: Tensor<B, 4>,
    grid: Tensor<B, 4>,
    options: &GridSampleOptions,
) -> OpsResult<Tensor<B, 4>> {
    let [batch_size, channels, in_height, in_width] = input.dims();
    let [grid_batch, out_height, out_width, coords] = grid.dims();

    if grid_batch != batch_size || coords != 2 {
        return Err(OpsError::ShapeMismatch {
            context: "grid_sample_2d grid",
            expected: format!("[{batch_size}, H_out, W_out, 2]"),
            actual: format!("{:?}", grid.dims()),
        });
    }
    if input.shape().num_elements() == 0 || grid.shape().num_elements() == 0 {
        return Err(OpsError::ShapeMismatch {
            context: "grid_sample_2d input",
            expected: "non-empty batch, channel and spatial axes".to_owned(),
            actual: format!("input {:?}, grid {:?}", input.dims(), grid.dims()),
        });
    }

    let grid_x = grid
        .clone()
        .slice([0..batch_size, 0..out_height, 0..out_width, 0..1])
        .reshape([batch_size, 1, out_height, out_width]);
    let grid_y = grid
        .slice([0..batch_size, 0..out_height, 0..out_width, 1..2])
        .reshape([batch_size, 1, out_height, out_width]);

    let x = denormalize_coords(grid_x, in_width, options.align_corners);
    let y = denormalize_coords(grid_y, in_height, options.align_corners);

    // Integer corner positions carry no gradient; the blend weights do.
    let x0 = x.clone().detach().floor();
    let y0 = y.clone().detach().floor();
    let x1 = x0.clone().add_scalar(1.0);
    let y1 = y0.clone().add_scalar(1.0);

    let wx1 = x - x0.clone();
    let wx0 = wx1.clone().neg().add_scalar(1.0);
    let wy1 = y - y0.clone();
    let wy0 = wy1.clone().neg().add_scalar(1.0);

    let flat = input.reshape([batch_size, channels, in_height * in_width]);
    let max_x = (in_width - 1) as f32;
    let max_y = (in_height - 1) as f32;

    // Each corner contributes `value * weight`, where the weight vanishes for
    // corners outside the input.
    let corner = |xi: Tensor<B, 4>, yi: Tensor<B, 4>, weight: Tensor<B, 4>| -> Tensor<B, 4> {
        let inside = xi.clone().greater_equal_elem(0.0).float()
            * xi.clone().lower_equal_elem(max_x).float()
            * yi.clone().greater_equal_elem(0.0).float()
            * yi.clone().lower_equal_elem(max_y).float();

        let index = (yi.clamp(0.0, max_y).mul_scalar(in_width as f32) + xi.clamp(0.0, max_x))
            .int()
            .reshape([batch_size, 1, out_height * out_width])
            .repeat_dim(1, channels);

        let values = flat
            .clone()
            .gather(2, index)
            .reshape([batch_size, channels, out_height, out_width]);

        values * (weight * inside).repeat_dim(1, channels)
    };

    let top = corner(x0.clone(), y0.clone(), wx0.clone() * wy0.clone())
        + corner(x1.clone(), y0, wx1.clone() * wy0);
    let bottom = corner(x0, y1.clone(), wx0 * wy1.clone()) + corner(x1, y1, wx1 * wy1);

    Ok(top + bottom)
}
