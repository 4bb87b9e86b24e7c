//! Multi-scale flow predictions.

use std::collections::HashMap;

use burn::prelude::*;

use crate::error::{FlowLossError, FlowLossResult};

/// Prefix of the scale keys produced by named flow predictions.
pub const SCALE_KEY_PREFIX: &str = "flow";

/// Flow fields predicted at several resolutions, indexed by scale.
///
/// Scale `i` holds a `[batch_size, 2, h_i, w_i]` tensor of per-pixel
/// displacements in pixel units of that scale. Channel 0 displaces rows and
/// channel 1 displaces columns.
#[derive(Debug, Clone)]
pub struct FlowPyramid<B: Backend> {
    scales: Vec<Tensor<B, 4>>,
}

impl<B: Backend> FlowPyramid<B> {
    /// Create a pyramid from flow fields ordered by scale index.
    pub const fn new(scales: Vec<Tensor<B, 4>>) -> Self {
        Self { scales }
    }

    /// Create a pyramid from a map keyed `"flow0"`, `"flow1"`, ...
    ///
    /// Every index from zero up to the number of entries must be present.
    pub fn from_named(mut named: HashMap<String, Tensor<B, 4>>) -> FlowLossResult<Self> {
        if let Some(key) = named.keys().find(|key| parse_scale_key(key).is_none()) {
            return Err(FlowLossError::UnexpectedScaleKey { key: key.clone() });
        }

        let scales = (0..named.len())
            .map(|index| {
                named
                    .remove(&scale_key(index))
                    .ok_or(FlowLossError::MissingScale { index })
            })
            .collect::<FlowLossResult<Vec<_>>>()?;

        Ok(Self::new(scales))
    }

    /// Number of scales.
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    /// Whether the pyramid holds no scale.
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Flow fields in increasing scale order.
    pub fn iter(&self) -> impl Iterator<Item = &Tensor<B, 4>> {
        self.scales.iter()
    }

    /// Move every scale to `device`.
    pub fn to_device(self, device: &B::Device) -> Self {
        let scales = self
            .scales
            .into_iter()
            .map(|flow| flow.to_device(device))
            .collect();
        Self::new(scales)
    }

    /// Check that every scale is a two channel field for `batch_size` items
    /// with at least two pixels along each spatial axis.
    pub fn validate(&self, batch_size: usize) -> FlowLossResult<()> {
        if self.is_empty() {
            return Err(FlowLossError::EmptyPrediction);
        }
        if batch_size == 0 {
            return Err(FlowLossError::ShapeMismatch {
                context: "flow prediction".to_owned(),
                expected: "at least one batch item".to_owned(),
                actual: "batch size 0".to_owned(),
            });
        }

        for (index, flow) in self.scales.iter().enumerate() {
            let [flow_batch, components, height, width] = flow.dims();
            if flow_batch != batch_size || components != 2 {
                return Err(FlowLossError::ShapeMismatch {
                    context: scale_key(index),
                    expected: format!("[{batch_size}, 2, H, W]"),
                    actual: format!("{:?}", flow.dims()),
                });
            }
            for (axis, size) in [("height", height), ("width", width)] {
                if size < 2 {
                    return Err(FlowLossError::DegenerateInput {
                        context: scale_key(index),
                        axis,
                        size,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Key of scale `index` in a named prediction.
pub fn scale_key(index: usize) -> String {
    format!("{SCALE_KEY_PREFIX}{index}")
}

fn parse_scale_key(key: &str) -> Option<usize> {
    let digits = key.strip_prefix(SCALE_KEY_PREFIX)?;
    // "flow01" or "flow+1" would alias "flow1".
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || (digits.len() > 1 && digits.starts_with('0'))
    {
        return None;
    }
    digits.parse().ok()
}
