//! Bounded squashing nonlinearity shared by the cell and the readout.

use ndarray::Array1;

/// Slope applied before `tanh`. Fixed; not a hyperparameter.
pub const SQUASH_GAIN: f32 = 1.0;

/// Element-wise `tanh(gain * x)`.
pub fn squash(x: &Array1<f32>) -> Array1<f32> {
    x.mapv(|v| (SQUASH_GAIN * v).tanh())
}

/// Derivative of [`squash`] expressed through its output `y = tanh(gain * x)`.
pub fn squash_derivative_from_output(y: &Array1<f32>) -> Array1<f32> {
    y.mapv(|v| SQUASH_GAIN * (1.0 - v * v))
}
