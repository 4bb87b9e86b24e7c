//! L2 regularization of model parameters.

use burn::{
    module::{Module, ModuleVisitor, ParamId},
    tensor::{backend::Backend, Tensor},
};

/// Visitor accumulating `Σ sum(p²) / 2` over the float parameters of a module.
///
/// Parameter values are only read, never modified. Gradients flow back to
/// every visited parameter when the backend is an autodiff backend.
pub struct WeightDecay<'a, B: Backend> {
    device: &'a B::Device,
    sum: Option<Tensor<B, 1>>,
    num_params: usize,
}

impl<'a, B: Backend> WeightDecay<'a, B> {
    /// Create an empty accumulator producing its result on `device`.
    pub const fn new(device: &'a B::Device) -> Self {
        Self {
            device,
            sum: None,
            num_params: 0,
        }
    }

    /// Number of scalar parameters visited so far.
    pub const fn num_params(&self) -> usize {
        self.num_params
    }

    /// Half the sum of squares of every visited parameter; zero if none was visited.
    ///
    /// # Shapes
    ///
    /// - output: `[1]`
    pub fn finish(self) -> Tensor<B, 1> {
        self.sum
            .map(|sum| sum.div_scalar(2.0))
            .unwrap_or_else(|| Tensor::zeros([1], self.device))
    }
}

impl<B: Backend> ModuleVisitor<B> for WeightDecay<'_, B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.num_params += tensor.shape().num_elements();
        let squares = tensor.clone().powi_scalar(2).sum().to_device(self.device);
        self.sum = Some(match self.sum.take() {
            Some(acc) => acc + squares,
            None => squares,
        });
    }
}

/// Half the squared L2 norm of all float parameters of `model`.
///
/// # Shapes
///
/// - output: `[1]`
pub fn weight_decay<B: Backend, M: Module<B>>(model: &M, device: &B::Device) -> Tensor<B, 1> {
    let mut visitor = WeightDecay::new(device);
    model.visit(&mut visitor);
    tracing::trace!(num_params = visitor.num_params(), "weight decay term");
    visitor.finish()
}
