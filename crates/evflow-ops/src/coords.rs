//! Conversions between pixel indices and normalized sampling coordinates.
//!
//! Normalized coordinates span `[-1, 1]` per axis, with `-1` at the first and
//! `+1` at the last pixel center:
//!
//! ```text
//! norm  = (pixel - (size - 1) / 2) / ((size - 1) / 2)
//! pixel = norm * (size - 1) / 2 + (size - 1) / 2
//! ```

use burn::prelude::*;

/// Map pixel positions along an axis of extent `size` to `[-1, 1]`.
///
/// `size` must be at least 2, otherwise the scale factor is zero.
pub fn normalize_coords<B: Backend, const D: usize>(
    pixels: Tensor<B, D>,
    size: usize,
) -> Tensor<B, D> {
    let half = (size as f64 - 1.0) / 2.0;
    pixels.sub_scalar(half).div_scalar(half)
}

/// Map normalized coordinates back to pixel positions along an axis of extent `size`.
///
/// With `align_corners` the extreme values address the centers of the corner
/// pixels (inverse of [`normalize_coords`]); without it they address the outer
/// edges of the corner pixels.
pub fn denormalize_coords<B: Backend, const D: usize>(
    coords: Tensor<B, D>,
    size: usize,
    align_corners: bool,
) -> Tensor<B, D> {
    if align_corners {
        coords.add_scalar(1.0).mul_scalar((size as f64 - 1.0) / 2.0)
    } else {
        coords
            .add_scalar(1.0)
            .mul_scalar(size as f64 / 2.0)
            .sub_scalar(0.5)
    }
}
