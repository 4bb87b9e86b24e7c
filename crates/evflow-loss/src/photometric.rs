//! Multi-scale photometric consistency loss.
//!
//! For each scale both frames are resized to the resolution of that scale's
//! flow field, the next frame is warped backward into the previous frame with
//! the flow, and the residual is penalized with the
//! [Charbonnier loss](CharbonnierLoss).
//!
//! Per-item means are summed over the batch and the per-scale totals are
//! averaged over the number of scales. The batch is not averaged, so the loss
//! grows with the batch size.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    tensor::{
        backend::Backend,
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
        Tensor,
    },
};
use evflow_ops::{warp_images_with_flow_with_options, GridSampleOptions};

use crate::{
    charbonnier::{CharbonnierLoss, CharbonnierLossConfig},
    error::{FlowLossError, FlowLossResult},
    pyramid::FlowPyramid,
};

/// Configuration for creating a [photometric loss](PhotometricLoss).
#[derive(Config, Debug)]
pub struct PhotometricLossConfig {
    /// Penalty applied to the warping residual.
    #[config(default = "CharbonnierLossConfig::new()")]
    pub charbonnier: CharbonnierLossConfig,

    /// Corner convention of the warp sampler. Default: true
    #[config(default = true)]
    pub align_corners: bool,
}

impl PhotometricLossConfig {
    /// Initialize [photometric loss](PhotometricLoss).
    pub fn init(&self) -> PhotometricLoss {
        PhotometricLoss {
            penalty: self.charbonnier.init(),
            align_corners: self.align_corners,
        }
    }
}

/// Photometric loss over a multi-scale flow prediction.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct PhotometricLoss {
    /// Penalty applied to the warping residual.
    pub penalty: CharbonnierLoss,
    /// Corner convention of the warp sampler.
    pub align_corners: bool,
}

impl Default for PhotometricLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for PhotometricLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("alpha", &self.penalty.alpha)
            .add("epsilon", &self.penalty.epsilon)
            .add("align_corners", &self.align_corners)
            .optional()
    }
}

impl PhotometricLoss {
    /// Create a new photometric loss with default configuration.
    pub fn new() -> Self {
        PhotometricLossConfig::new().init()
    }

    /// Photometric loss averaged over scales.
    ///
    /// The frames are treated as constants: gradients flow to the flow fields
    /// only.
    ///
    /// # Shapes
    ///
    /// - prev_images: `[batch_size, channels, height, width]`
    /// - next_images: `[batch_size, channels, height, width]`
    /// - flows: scale `i` is `[batch_size, 2, h_i, w_i]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        prev_images: Tensor<B, 4>,
        next_images: Tensor<B, 4>,
        flows: &FlowPyramid<B>,
    ) -> FlowLossResult<Tensor<B, 1>> {
        let per_scale = self.forward_per_scale(prev_images, next_images, flows)?;
        let num_scales = per_scale.len();

        let total = Tensor::cat(per_scale, 0).sum();
        Ok(total.div_scalar(num_scales as f64))
    }

    /// Photometric loss of every scale, summed over the batch.
    ///
    /// # Shapes
    ///
    /// - output: one `[1]` tensor per scale, in scale order
    pub fn forward_per_scale<B: Backend>(
        &self,
        prev_images: Tensor<B, 4>,
        next_images: Tensor<B, 4>,
        flows: &FlowPyramid<B>,
    ) -> FlowLossResult<Vec<Tensor<B, 1>>> {
        let image_dims = prev_images.dims();
        if next_images.dims() != image_dims {
            return Err(FlowLossError::ShapeMismatch {
                context: "next images".to_owned(),
                expected: format!("{image_dims:?}"),
                actual: format!("{:?}", next_images.dims()),
            });
        }
        flows.validate(image_dims[0])?;

        let sampling = GridSampleOptions::new().with_align_corners(self.align_corners);

        flows
            .iter()
            .enumerate()
            .map(|(scale, flow)| -> FlowLossResult<Tensor<B, 1>> {
                let [_, _, height, width] = flow.dims();
                tracing::trace!(scale, height, width, "photometric term");

                let prev_resized = resize_to(prev_images.clone(), height, width);
                let next_resized = resize_to(next_images.clone(), height, width);
                let next_warped =
                    warp_images_with_flow_with_options(next_resized, flow.clone(), &sampling)?;

                Ok(self
                    .penalty
                    .forward_per_item(next_warped - prev_resized)
                    .sum())
            })
            .collect()
    }
}

/// Bilinearly resize an image batch, skipping the resize when the size already matches.
fn resize_to<B: Backend>(images: Tensor<B, 4>, height: usize, width: usize) -> Tensor<B, 4> {
    let [_, _, image_height, image_width] = images.dims();
    if (image_height, image_width) == (height, width) {
        return images;
    }
    interpolate(
        images,
        [height, width],
        InterpolateOptions::new(InterpolateMode::Bilinear),
    )
}

#[cfg(test)]
mod tests {
    use burn::tensor::{cast::ToElement, Distribution, TensorData};

    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn identical_frames_with_zero_flow_cost_the_zero_residual_value() {
        let device = Default::default();
        let loss = PhotometricLoss::new();

        let frames = Tensor::<TestBackend, 4>::random([1, 3, 6, 6], Distribution::Default, &device);
        let flows = FlowPyramid::new(vec![Tensor::zeros([1, 2, 6, 6], &device)]);

        let result = loss
            .forward(frames.clone(), frames, &flows)
            .unwrap()
            .into_scalar()
            .to_f64();

        let expected = loss.penalty.zero_residual_value();
        assert!((result - expected).abs() < 1e-6, "{result} != {expected}");
    }

    #[test]
    fn items_are_summed_over_the_batch() {
        let device = Default::default();
        let loss = PhotometricLoss::new();

        let frames = Tensor::<TestBackend, 4>::random([3, 1, 4, 4], Distribution::Default, &device);
        let flows = FlowPyramid::new(vec![Tensor::zeros([3, 2, 4, 4], &device)]);

        let result = loss
            .forward(frames.clone(), frames, &flows)
            .unwrap()
            .into_scalar()
            .to_f64();

        let expected = 3.0 * loss.penalty.zero_residual_value();
        assert!((result - expected).abs() < 1e-5, "{result} != {expected}");
    }

    #[test]
    fn frames_are_resized_to_each_scale() {
        let device = Default::default();
        let loss = PhotometricLoss::new();

        let frames = Tensor::<TestBackend, 4>::full([2, 3, 8, 8], 0.5, &device);
        let flows = FlowPyramid::new(vec![
            Tensor::zeros([2, 2, 8, 8], &device),
            Tensor::zeros([2, 2, 4, 4], &device),
            Tensor::zeros([2, 2, 2, 2], &device),
        ]);

        let per_scale = loss
            .forward_per_scale(frames.clone(), frames, &flows)
            .unwrap();

        assert_eq!(per_scale.len(), 3);
        let expected = 2.0 * loss.penalty.zero_residual_value();
        for term in per_scale {
            let value = term.into_scalar().to_f64();
            assert!((value - expected).abs() < 1e-5, "{value} != {expected}");
        }
    }

    #[test]
    fn brightness_change_is_penalized() {
        let device = Default::default();
        let penalty = CharbonnierLossConfig::new()
            .with_alpha(0.5)
            .with_epsilon(1.0);
        let loss = PhotometricLossConfig::new()
            .with_charbonnier(penalty)
            .init();

        let prev = Tensor::<TestBackend, 4>::zeros([1, 1, 3, 3], &device);
        let next = Tensor::<TestBackend, 4>::from_data(
            TensorData::from([[[[3.0, 3.0, 3.0], [3.0, 3.0, 3.0], [3.0, 3.0, 3.0]]]]),
            &device,
        );
        let flows = FlowPyramid::new(vec![Tensor::zeros([1, 2, 3, 3], &device)]);

        let result = loss
            .forward(prev, next, &flows)
            .unwrap()
            .into_scalar()
            .to_f64();

        // sqrt(3² + 1) at every pixel.
        assert!((result - 10.0_f64.sqrt()).abs() < 1e-5, "{result}");
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let device = Default::default();
        let loss = PhotometricLoss::new();

        let prev = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);
        let next = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 5], &device);
        let flows = FlowPyramid::new(vec![Tensor::zeros([1, 2, 4, 4], &device)]);

        assert!(matches!(
            loss.forward(prev, next, &flows),
            Err(FlowLossError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn flow_batch_must_match_frames() {
        let device = Default::default();
        let loss = PhotometricLoss::new();

        let frames = Tensor::<TestBackend, 4>::zeros([2, 3, 4, 4], &device);
        let flows = FlowPyramid::new(vec![Tensor::zeros([1, 2, 4, 4], &device)]);

        assert!(matches!(
            loss.forward(frames.clone(), frames, &flows),
            Err(FlowLossError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let device = Default::default();
        let loss = PhotometricLoss::new();

        let frames = Tensor::<TestBackend, 4>::zeros([0, 3, 4, 4], &device);
        let flows = FlowPyramid::new(vec![Tensor::zeros([0, 2, 4, 4], &device)]);

        assert!(matches!(
            loss.forward(frames.clone(), frames, &flows),
            Err(FlowLossError::ShapeMismatch { .. })
        ));
    }
}
