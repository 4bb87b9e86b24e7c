//! Generalized Charbonnier penalty.
//!
//! A smooth, robust distance applied elementwise to a residual tensor:
//!
//! ```text
//! l_n = (x_n² + ε²)^α
//! ```
//!
//! With `α < 0.5` the penalty grows sub-linearly for large residuals, which
//! keeps occlusions and brightness changes from dominating the loss. The value
//! at zero is `ε^(2α)`, not zero.
//!
//! When reduction is applied:
//! - `'mean'`: `mean(L)`
//! - `'sum'`: `sum(L)`

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::Reduction,
    tensor::{backend::Backend, Tensor},
};

/// Configuration for creating a [Charbonnier loss](CharbonnierLoss).
#[derive(Config, Debug)]
pub struct CharbonnierLossConfig {
    /// Exponent of the penalty. Default: 0.45
    #[config(default = 0.45)]
    pub alpha: f64,

    /// Smoothing constant that keeps the penalty differentiable at zero. Default: 1e-3
    #[config(default = 1e-3)]
    pub epsilon: f64,
}

impl CharbonnierLossConfig {
    /// Initialize [Charbonnier loss](CharbonnierLoss).
    pub fn init(&self) -> CharbonnierLoss {
        self.assertions();
        CharbonnierLoss {
            alpha: self.alpha,
            epsilon: self.epsilon,
        }
    }

    fn assertions(&self) {
        assert!(
            self.alpha > 0.0,
            "Alpha for CharbonnierLoss must be positive, got {}",
            self.alpha
        );
        assert!(
            self.epsilon > 0.0,
            "Epsilon for CharbonnierLoss must be positive, got {}",
            self.epsilon
        );
    }
}

/// Generalized Charbonnier loss over a residual tensor.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct CharbonnierLoss {
    /// Exponent of the penalty.
    pub alpha: f64,
    /// Smoothing constant.
    pub epsilon: f64,
}

impl Default for CharbonnierLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for CharbonnierLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("alpha", &self.alpha)
            .add("epsilon", &self.epsilon)
            .optional()
    }
}

impl CharbonnierLoss {
    /// Create a new Charbonnier loss with default configuration.
    pub fn new() -> Self {
        CharbonnierLossConfig::new().init()
    }

    /// Penalty of a zero residual, `ε^(2α)`.
    pub fn zero_residual_value(&self) -> f64 {
        self.epsilon.powf(2.0 * self.alpha)
    }

    /// Compute the penalty on the residual with reduction.
    ///
    /// # Shapes
    ///
    /// - delta: `[...dims]` (any shape)
    /// - output: `[1]`
    pub fn forward<const D: usize, B: Backend>(
        &self,
        delta: Tensor<B, D>,
        reduction: Reduction,
    ) -> Tensor<B, 1> {
        let loss = self.forward_no_reduction(delta);
        match reduction {
            Reduction::Mean | Reduction::Auto => loss.mean(),
            Reduction::Sum => loss.sum(),
        }
    }

    /// Compute the penalty on the residual without reduction.
    ///
    /// # Shapes
    ///
    /// - delta: `[...dims]` (any shape)
    /// - output: `[...dims]` (same shape as input)
    pub fn forward_no_reduction<const D: usize, B: Backend>(
        &self,
        delta: Tensor<B, D>,
    ) -> Tensor<B, D> {
        delta
            .powi_scalar(2)
            .add_scalar(self.epsilon * self.epsilon)
            .powf_scalar(self.alpha)
    }

    /// Mean penalty of every batch item.
    ///
    /// # Shapes
    ///
    /// - delta: `[batch_size, channels, height, width]`
    /// - output: `[batch_size]`
    pub fn forward_per_item<B: Backend>(&self, delta: Tensor<B, 4>) -> Tensor<B, 1> {
        let [batch_size, _, _, _] = delta.dims();
        self.forward_no_reduction(delta)
            .reshape([batch_size as i32, -1])
            .mean_dim(1)
            .squeeze(1)
    }
}
