//! Total unsupervised training loss.
//!
//! ```text
//! total = weight_decay_weight * Σ_p sum(p²) / 2
//!       + photometric
//!       + smoothness_weight / 4 * Σ_s smoothness(flow_s)
//! ```
//!
//! Each per-scale smoothness term is itself an average over four directions;
//! the additional division by four is part of the weighting.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    tensor::{backend::Backend, cast::ToElement, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::{
    charbonnier::CharbonnierLossConfig,
    error::{FlowLossError, FlowLossResult},
    photometric::{PhotometricLoss, PhotometricLossConfig},
    pyramid::FlowPyramid,
    smoothness::{SmoothnessLoss, SmoothnessLossConfig},
    weight_decay::weight_decay,
};

/// Configuration for creating a [total loss](TotalLoss).
#[derive(Config, Debug)]
pub struct TotalLossConfig {
    /// Weight of the smoothness term.
    pub smoothness_weight: f64,

    /// Weight of the L2 regularization term. Default: 1e-4
    #[config(default = 1e-4)]
    pub weight_decay_weight: f64,

    /// Penalty shared by the photometric and smoothness terms.
    #[config(default = "CharbonnierLossConfig::new()")]
    pub charbonnier: CharbonnierLossConfig,

    /// Corner convention of the warp sampler. Default: true
    #[config(default = true)]
    pub align_corners: bool,
}

impl TotalLossConfig {
    /// Initialize [total loss](TotalLoss).
    pub fn init(&self) -> TotalLoss {
        self.assertions();
        TotalLoss {
            smoothness_weight: self.smoothness_weight,
            weight_decay_weight: self.weight_decay_weight,
            smoothness: SmoothnessLossConfig::new()
                .with_charbonnier(self.charbonnier.clone())
                .init(),
            photometric: PhotometricLossConfig::new()
                .with_charbonnier(self.charbonnier.clone())
                .with_align_corners(self.align_corners)
                .init(),
        }
    }

    fn assertions(&self) {
        assert!(
            self.smoothness_weight >= 0.0,
            "Smoothness weight for TotalLoss must be non-negative, got {}",
            self.smoothness_weight
        );
        assert!(
            self.weight_decay_weight >= 0.0,
            "Weight decay weight for TotalLoss must be non-negative, got {}",
            self.weight_decay_weight
        );
    }
}

/// Individual terms of the total loss, each already weighted.
#[derive(Debug, Clone)]
pub struct LossBreakdown<B: Backend> {
    /// Sum of all terms.
    pub total: Tensor<B, 1>,
    /// Weighted L2 regularization.
    pub weight_decay: Tensor<B, 1>,
    /// Photometric loss averaged over scales.
    pub photometric: Tensor<B, 1>,
    /// Weighted smoothness summed over scales.
    pub smoothness: Tensor<B, 1>,
}

impl<B: Backend> LossBreakdown<B> {
    /// Read every term back to the host.
    ///
    /// This synchronizes with the device and is meant for logging, not for
    /// the training step itself.
    pub fn values(&self) -> LossValues {
        let read = |term: &Tensor<B, 1>| term.clone().into_scalar().to_f64();
        LossValues {
            total: read(&self.total),
            weight_decay: read(&self.weight_decay),
            photometric: read(&self.photometric),
            smoothness: read(&self.smoothness),
        }
    }
}

/// Host-side copy of a [`LossBreakdown`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossValues {
    /// Sum of all terms.
    pub total: f64,
    /// Weighted L2 regularization.
    pub weight_decay: f64,
    /// Photometric loss averaged over scales.
    pub photometric: f64,
    /// Weighted smoothness summed over scales.
    pub smoothness: f64,
}

/// Unsupervised multi-scale optical flow loss.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct TotalLoss {
    /// Weight of the smoothness term.
    pub smoothness_weight: f64,
    /// Weight of the L2 regularization term.
    pub weight_decay_weight: f64,
    /// Smoothness loss applied to each scale.
    pub smoothness: SmoothnessLoss,
    /// Photometric loss over all scales.
    pub photometric: PhotometricLoss,
}

impl ModuleDisplay for TotalLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("smoothness_weight", &self.smoothness_weight)
            .add("weight_decay_weight", &self.weight_decay_weight)
            .optional()
    }
}

impl TotalLoss {
    /// Create a total loss with the given smoothness weight and default settings.
    pub fn new(smoothness_weight: f64) -> Self {
        TotalLossConfig::new(smoothness_weight).init()
    }

    /// Compute the total loss.
    ///
    /// All inputs are moved to `device`, where every intermediate tensor is
    /// created as well.
    ///
    /// # Shapes
    ///
    /// - flows: scale `i` is `[batch_size, 2, h_i, w_i]`
    /// - prev_images: `[batch_size, channels, height, width]`
    /// - next_images: `[batch_size, channels, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend, M: Module<B>>(
        &self,
        flows: FlowPyramid<B>,
        prev_images: Tensor<B, 4>,
        next_images: Tensor<B, 4>,
        model: &M,
        device: &B::Device,
    ) -> FlowLossResult<Tensor<B, 1>> {
        self.forward_with_breakdown(flows, prev_images, next_images, model, device)
            .map(|breakdown| breakdown.total)
    }

    /// Compute the total loss together with its weighted terms.
    pub fn forward_with_breakdown<B: Backend, M: Module<B>>(
        &self,
        flows: FlowPyramid<B>,
        prev_images: Tensor<B, 4>,
        next_images: Tensor<B, 4>,
        model: &M,
        device: &B::Device,
    ) -> FlowLossResult<LossBreakdown<B>> {
        let image_dims = prev_images.dims();
        if next_images.dims() != image_dims {
            return Err(FlowLossError::ShapeMismatch {
                context: "next images".to_owned(),
                expected: format!("{image_dims:?}"),
                actual: format!("{:?}", next_images.dims()),
            });
        }
        flows.validate(image_dims[0])?;
        tracing::debug!(
            num_scales = flows.len(),
            batch_size = image_dims[0],
            "computing total flow loss"
        );

        let flows = flows.to_device(device);
        let prev_images = prev_images.to_device(device);
        let next_images = next_images.to_device(device);

        let weight_decay = weight_decay(model, device).mul_scalar(self.weight_decay_weight);

        let smoothness = flows
            .iter()
            .map(|flow| self.smoothness.forward(flow.clone()))
            .collect::<FlowLossResult<Vec<_>>>()?;
        let smoothness = Tensor::cat(smoothness, 0)
            .sum()
            .mul_scalar(self.smoothness_weight / 4.0);

        let photometric = self.photometric.forward(prev_images, next_images, &flows)?;

        let total = weight_decay.clone() + photometric.clone() + smoothness.clone();

        Ok(LossBreakdown {
            total,
            weight_decay,
            photometric,
            smoothness,
        })
    }
}

#[cfg(test)]
mod tests {
    use burn::{nn::LinearConfig, tensor::Distribution};

    use super::*;
    use crate::tests::TestBackend;

    fn scalar(tensor: Tensor<TestBackend, 1>) -> f64 {
        tensor.into_scalar().to_f64()
    }

    #[test]
    fn total_loss_config_defaults() {
        let config = TotalLossConfig::new(0.5);

        assert_eq!(config.smoothness_weight, 0.5);
        assert_eq!(config.weight_decay_weight, 1e-4);
        assert_eq!(config.charbonnier.alpha, 0.45);
        assert_eq!(config.charbonnier.epsilon, 1e-3);
        assert!(config.align_corners);
    }

    #[test]
    fn total_is_the_sum_of_its_terms() {
        let device = Default::default();
        let loss = TotalLoss::new(0.5);
        let model = LinearConfig::new(4, 4).init::<TestBackend>(&device);

        let prev = Tensor::<TestBackend, 4>::random([2, 3, 8, 8], Distribution::Default, &device);
        let next = Tensor::<TestBackend, 4>::random([2, 3, 8, 8], Distribution::Default, &device);
        let flows = FlowPyramid::new(vec![
            Tensor::random([2, 2, 8, 8], Distribution::Uniform(-1.0, 1.0), &device),
            Tensor::random([2, 2, 4, 4], Distribution::Uniform(-1.0, 1.0), &device),
        ]);

        let breakdown = loss
            .forward_with_breakdown(flows, prev, next, &model, &device)
            .unwrap();

        let values = breakdown.values();
        let parts = values.weight_decay + values.photometric + values.smoothness;
        assert!(
            (values.total - parts).abs() < 1e-5,
            "{} != {parts}",
            values.total
        );
    }

    #[test]
    fn smoothness_term_is_quartered_sum_over_scales() {
        let device = Default::default();
        let loss = TotalLoss::new(2.0);
        let model = LinearConfig::new(2, 2).init::<TestBackend>(&device);

        let frames = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);
        let flows = FlowPyramid::new(vec![
            Tensor::full([1, 2, 4, 4], 1.0, &device),
            Tensor::full([1, 2, 2, 2], -1.0, &device),
        ]);

        let breakdown = loss
            .forward_with_breakdown(flows, frames.clone(), frames, &model, &device)
            .unwrap();

        // Constant fields: each scale contributes ε^(2α).
        let per_scale = loss.smoothness.penalty.zero_residual_value();
        let expected = 2.0 / 4.0 * (2.0 * per_scale);
        let smoothness = scalar(breakdown.smoothness);
        assert!(
            (smoothness - expected).abs() < 1e-7,
            "{smoothness} != {expected}"
        );
    }

    #[test]
    fn zero_weights_leave_only_photometric_term() {
        let device = Default::default();
        let loss = TotalLossConfig::new(0.0)
            .with_weight_decay_weight(0.0)
            .init();
        let model = LinearConfig::new(8, 8).init::<TestBackend>(&device);

        let prev = Tensor::<TestBackend, 4>::random([1, 3, 6, 6], Distribution::Default, &device);
        let next = Tensor::<TestBackend, 4>::random([1, 3, 6, 6], Distribution::Default, &device);
        let flows = FlowPyramid::new(vec![Tensor::random(
            [1, 2, 6, 6],
            Distribution::Uniform(-2.0, 2.0),
            &device,
        )]);

        let breakdown = loss
            .forward_with_breakdown(flows, prev, next, &model, &device)
            .unwrap();

        assert_eq!(scalar(breakdown.weight_decay), 0.0);
        assert_eq!(scalar(breakdown.smoothness), 0.0);
        let photometric = scalar(breakdown.photometric);
        assert!((scalar(breakdown.total) - photometric).abs() < 1e-7);
    }

    #[test]
    fn missing_flow_scales_are_rejected() {
        let device = Default::default();
        let loss = TotalLoss::new(1.0);
        let model = LinearConfig::new(2, 2).init::<TestBackend>(&device);
        let frames = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);

        let result = loss.forward(
            FlowPyramid::new(Vec::new()),
            frames.clone(),
            frames,
            &model,
            &device,
        );

        assert_eq!(result.err(), Some(FlowLossError::EmptyPrediction));
    }

    #[test]
    #[should_panic = "Smoothness weight for TotalLoss must be non-negative"]
    fn negative_smoothness_weight_panics() {
        let _loss = TotalLoss::new(-1.0);
    }

    #[test]
    fn total_loss_display_shows_weights() {
        let loss = TotalLoss::new(0.5);

        assert_eq!(
            format!("{loss}"),
            "TotalLoss {smoothness_weight: 0.5, weight_decay_weight: 0.0001}"
        );
    }
}
