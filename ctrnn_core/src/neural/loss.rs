//! Squared-error loss for one prediction step.

use ndarray::Array1;

/// Computes the mean squared error over output components together with its
/// gradient with respect to `predicted`.
///
/// For a single output this is the plain squared error `(y - t)^2`.
///
/// # Returns
///
/// Tuple of (loss value, gradient w.r.t. predicted)
pub fn squared_error_with_gradient(
    predicted: &Array1<f32>,
    target: &Array1<f32>,
) -> (f32, Array1<f32>) {
    let diff = predicted - target;
    let n = diff.len().max(1) as f32;

    let loss = diff.mapv(|d| d * d).sum() / n;
    let gradient = diff * (2.0 / n);

    (loss, gradient)
}

/// Loss value only.
pub fn squared_error(predicted: &Array1<f32>, target: &Array1<f32>) -> f32 {
    squared_error_with_gradient(predicted, target).0
}
