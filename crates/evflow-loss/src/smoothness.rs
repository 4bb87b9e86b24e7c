//! First-order smoothness penalty for flow fields.
//!
//! The field is compared with itself shifted by one pixel along four
//! directions: horizontal, vertical and both diagonals. Each difference map is
//! penalized with the [Charbonnier loss](CharbonnierLoss) (which averages
//! internally) and the four directional means are averaged.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    charbonnier::{CharbonnierLoss, CharbonnierLossConfig},
    error::{FlowLossError, FlowLossResult},
};

/// Configuration for creating a [smoothness loss](SmoothnessLoss).
#[derive(Config, Debug)]
pub struct SmoothnessLossConfig {
    /// Penalty applied to each directional difference.
    #[config(default = "CharbonnierLossConfig::new()")]
    pub charbonnier: CharbonnierLossConfig,
}

impl SmoothnessLossConfig {
    /// Initialize [smoothness loss](SmoothnessLoss).
    pub fn init(&self) -> SmoothnessLoss {
        SmoothnessLoss {
            penalty: self.charbonnier.init(),
        }
    }
}

/// Smoothness loss of a single scale.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct SmoothnessLoss {
    /// Penalty applied to each directional difference.
    pub penalty: CharbonnierLoss,
}

impl Default for SmoothnessLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for SmoothnessLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("alpha", &self.penalty.alpha)
            .add("epsilon", &self.penalty.epsilon)
            .optional()
    }
}

impl SmoothnessLoss {
    /// Create a new smoothness loss with default configuration.
    pub fn new() -> Self {
        SmoothnessLossConfig::new().init()
    }

    /// Average directional penalty of `flow`.
    ///
    /// # Shapes
    ///
    /// - flow: `[batch_size, channels, height, width]`, height and width ≥ 2
    /// - output: `[1]`
    pub fn forward<B: Backend>(&self, flow: Tensor<B, 4>) -> FlowLossResult<Tensor<B, 1>> {
        let [batch_size, channels, height, width] = flow.dims();
        for (axis, size) in [("height", height), ("width", width)] {
            if size < 2 {
                return Err(FlowLossError::DegenerateInput {
                    context: "smoothness flow".to_owned(),
                    axis,
                    size,
                });
            }
        }

        tracing::trace!(height, width, "smoothness term");

        let crop = |rows: core::ops::Range<usize>, cols: core::ops::Range<usize>| {
            flow.clone().slice([0..batch_size, 0..channels, rows, cols])
        };
        let (h, w) = (height - 1, width - 1);

        let [horizontal, vertical, diagonal, anti_diagonal] = [
            crop(0..height, 1..width) - crop(0..height, 0..w),
            crop(1..height, 0..width) - crop(0..h, 0..width),
            crop(1..height, 1..width) - crop(0..h, 0..w),
            crop(0..h, 1..width) - crop(1..height, 0..w),
        ]
        .map(|delta| self.penalty.forward(delta, Reduction::Mean));

        Ok((horizontal + vertical + diagonal + anti_diagonal).div_scalar(4.0))
    }
}
