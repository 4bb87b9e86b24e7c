//! Unsupervised loss functions for multi-scale optical flow training.
//!
//! Flow networks that predict a displacement field at several resolutions can
//! be trained without ground truth flow by asking the prediction to explain
//! how one video frame turns into the next. This crate provides those losses
//! on top of the Burn deep learning framework.
//!
//! ## Loss Terms
//!
//! - **[`CharbonnierLoss`]**: Robust elementwise penalty `(x² + ε²)^α` shared by all terms
//! - **[`PhotometricLoss`]**: Warps the next frame back with each scale's flow and penalizes
//!   the difference to the previous frame
//! - **[`SmoothnessLoss`]**: Penalizes first-order flow differences in four directions
//! - **[`weight_decay`]**: Half the squared L2 norm of the model parameters
//! - **[`TotalLoss`]**: Weighted combination of the three terms above
//!
//! ## Usage Example
//!
//! ```rust
//! use burn::{backend::NdArray, nn::LinearConfig, prelude::*};
//! use evflow_loss::{FlowPyramid, TotalLossConfig};
//!
//! type B = NdArray;
//!
//! let device = Default::default();
//! let model = LinearConfig::new(4, 4).init::<B>(&device);
//! let loss = TotalLossConfig::new(0.5).init();
//!
//! let prev = Tensor::<B, 4>::zeros([1, 3, 16, 16], &device);
//! let next = Tensor::<B, 4>::zeros([1, 3, 16, 16], &device);
//! let flows = FlowPyramid::new(vec![
//!     Tensor::zeros([1, 2, 16, 16], &device),
//!     Tensor::zeros([1, 2, 8, 8], &device),
//! ]);
//!
//! let total = loss.forward(flows, prev, next, &model, &device).unwrap();
//! assert_eq!(total.dims(), [1]);
//! ```
//!
//! All entry points validate tensor shapes up front and report problems through
//! [`FlowLossError`] instead of panicking inside the backend.

mod charbonnier;
mod error;
mod photometric;
mod pyramid;
mod smoothness;
mod total;
mod weight_decay;

pub use charbonnier::{CharbonnierLoss, CharbonnierLossConfig};
pub use error::{FlowLossError, FlowLossResult};
#[doc(inline)]
pub use evflow_ops as ops;
pub use photometric::{PhotometricLoss, PhotometricLossConfig};
pub use pyramid::{scale_key, FlowPyramid, SCALE_KEY_PREFIX};
pub use smoothness::{SmoothnessLoss, SmoothnessLossConfig};
pub use total::{LossBreakdown, LossValues, TotalLoss, TotalLossConfig};
pub use weight_decay::{weight_decay, WeightDecay};
