//! Gradient buffers for the trainable readout.
//!
//! Only the hidden-to-output map ever receives a gradient: the cell hands the
//! readout a detached copy of its state, so the loss has no path back into the
//! input-to-hidden or hidden-to-hidden maps.

use ndarray::{Array1, Array2, Axis};

/// Accumulated `dL/dW` and `dL/db` for the readout, summed over a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutGradients {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl ReadoutGradients {
    pub fn zeros(n_hidden: usize, n_out: usize) -> Self {
        Self {
            weight: Array2::zeros((n_out, n_hidden)),
            bias: Array1::zeros(n_out),
        }
    }

    /// Adds the contribution of one step: `dW += dz ⊗ h`, `db += dz`.
    pub fn accumulate(&mut self, pre_activation_grad: &Array1<f32>, hidden: &Array1<f32>) {
        let column = pre_activation_grad.view().insert_axis(Axis(1));
        let row = hidden.view().insert_axis(Axis(0));
        self.weight += &column.dot(&row);
        self.bias += pre_activation_grad;
    }

    /// Euclidean norm over all entries.
    pub fn norm(&self) -> f32 {
        self.weight
            .iter()
            .chain(self.bias.iter())
            .map(|g| g * g)
            .sum::<f32>()
            .sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.weight.iter().chain(self.bias.iter()).all(|g| g.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn accumulate_sums_outer_products() {
        let mut grads = ReadoutGradients::zeros(3, 1);
        grads.accumulate(&array![2.0], &array![1.0, 0.0, -1.0]);
        grads.accumulate(&array![1.0], &array![1.0, 1.0, 1.0]);
        assert_eq!(grads.weight, array![[3.0, 1.0, -1.0]]);
        assert_eq!(grads.bias, array![3.0]);
    }

    #[test]
    fn norm_and_finiteness() {
        let mut grads = ReadoutGradients::zeros(2, 1);
        assert_eq!(grads.norm(), 0.0);
        grads.accumulate(&array![1.0], &array![3.0, 0.0]);
        assert!((grads.norm() - 10.0_f32.sqrt()).abs() < 1e-6);
        assert!(grads.is_finite());

        grads.accumulate(&array![f32::INFINITY], &array![1.0, 0.0]);
        assert!(!grads.is_finite());
    }
}
