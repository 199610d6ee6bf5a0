//! Hidden-to-output readout: `y = tanh(W h + b)`.

use ndarray::Array1;
use rand::Rng;

use crate::error::{CtrnnError, CtrnnResult};
use crate::neural::activation::{squash, squash_derivative_from_output};
use crate::neural::gradient::ReadoutGradients;
use crate::neural::linear::Linear;

/// Affine map followed by the bounded squashing nonlinearity.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    affine: Linear,
}

impl Readout {
    pub fn new<R: Rng + ?Sized>(n_hidden: usize, n_out: usize, rng: &mut R) -> CtrnnResult<Self> {
        Self::from_linear(Linear::new(n_hidden, n_out, rng))
    }

    pub fn from_linear(affine: Linear) -> CtrnnResult<Self> {
        if affine.out_features() == 0 {
            return Err(CtrnnError::invalid_config(
                "n_out",
                0,
                "at least one output is required",
            ));
        }
        Ok(Self { affine })
    }

    /// Maps an observable hidden state to an output.
    pub fn apply(&self, hidden: &Array1<f32>) -> Array1<f32> {
        squash(&self.affine.forward(hidden))
    }

    /// Adds `dL/dW` and `dL/db` for one step into `grads`, given the
    /// readout's own `output` for `hidden` and `output_grad = dL/dy`.
    pub fn accumulate_gradient(
        &self,
        hidden: &Array1<f32>,
        output: &Array1<f32>,
        output_grad: &Array1<f32>,
        grads: &mut ReadoutGradients,
    ) {
        let pre_activation_grad = output_grad * &squash_derivative_from_output(output);
        grads.accumulate(&pre_activation_grad, hidden);
    }

    /// Zeroed gradient buffer shaped like this readout.
    pub fn zero_gradients(&self) -> ReadoutGradients {
        ReadoutGradients::zeros(self.n_hidden(), self.n_out())
    }

    pub fn n_hidden(&self) -> usize {
        self.affine.in_features()
    }

    pub fn n_out(&self) -> usize {
        self.affine.out_features()
    }

    pub fn affine(&self) -> &Linear {
        &self.affine
    }

    pub fn affine_mut(&mut self) -> &mut Linear {
        &mut self.affine
    }
}
