//! Affine maps `y = W x + b` used for all three parameter blocks.

use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CtrnnError, CtrnnResult};

/// Dense affine transform with weight `[out_features, in_features]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Linear {
    /// Uniform initialization in `[-1/sqrt(fan_in), 1/sqrt(fan_in)]` for both
    /// weight and bias.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = Array2::from_shape_fn((out_features, in_features), |_| {
            rng.gen_range(-bound..=bound)
        });
        let bias = Array1::from_shape_fn(out_features, |_| rng.gen_range(-bound..=bound));
        Self { weight, bias }
    }

    /// Builds a map from explicit arrays, checking that bias and weight agree.
    pub fn from_parts(weight: Array2<f32>, bias: Array1<f32>) -> CtrnnResult<Self> {
        if weight.nrows() != bias.len() {
            return Err(CtrnnError::dimension_mismatch(
                weight.nrows(),
                bias.len(),
                "affine bias length",
            ));
        }
        Ok(Self { weight, bias })
    }

    /// Drops the bias to zero, keeping the weight.
    pub fn without_bias(mut self) -> Self {
        self.bias.fill(0.0);
        self
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, x: &Array1<f32>) -> Array1<f32> {
        self.weight.dot(x) + &self.bias
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }

    pub fn is_finite(&self) -> bool {
        self.weight.iter().chain(self.bias.iter()).all(|v| v.is_finite())
    }
}
