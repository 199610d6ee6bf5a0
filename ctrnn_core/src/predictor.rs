//! Closed-loop generation from a trained model.

use ndarray::Array1;
use serde::Serialize;

use crate::data::Sequence;
use crate::error::{ensure_dimension, CtrnnError, CtrnnResult};
use crate::neural::SequenceModel;

/// Outputs of a rollout, in generation order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Rollout {
    outputs: Vec<Array1<f32>>,
}

impl Rollout {
    pub fn from_outputs(outputs: Vec<Array1<f32>>) -> Self {
        Self { outputs }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Array1<f32>> {
        self.outputs.iter()
    }

    pub fn outputs(&self) -> &[Array1<f32>] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<Array1<f32>> {
        self.outputs
    }

    /// First component of every output; convenient for scalar series.
    pub fn scalars(&self) -> Vec<f32> {
        self.outputs
            .iter()
            .filter_map(|output| output.first().copied())
            .collect()
    }
}

impl<'a> IntoIterator for &'a Rollout {
    type Item = &'a Array1<f32>;
    type IntoIter = std::slice::Iter<'a, Array1<f32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.iter()
    }
}

/// Teacher-forced replay scored against the sequence targets.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub rollout: Rollout,
    /// Summed per-step squared error against the targets
    pub squared_error: f32,
}

/// Drives a model on its own predictions.
pub struct Predictor<'m> {
    model: &'m mut SequenceModel,
}

impl<'m> Predictor<'m> {
    pub fn new(model: &'m mut SequenceModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &SequenceModel {
        self.model
    }

    /// Feeds `seed` once, then each output back as the next input, collecting
    /// exactly `steps` outputs.
    ///
    /// The model is not reset first: callers wanting a cold start call
    /// [`SequenceModel::reset`] themselves. Requires `n_in == n_out`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use ctrnn_core::{ModelConfig, Predictor, SequenceModel};
    ///
    /// let mut model = SequenceModel::new(ModelConfig::new(1, 5, 1, 2.0)).unwrap();
    /// let rollout = Predictor::new(&mut model).rollout(&array![0.0], 10).unwrap();
    /// assert_eq!(rollout.len(), 10);
    /// ```
    pub fn rollout(&mut self, seed: &Array1<f32>, steps: usize) -> CtrnnResult<Rollout> {
        ensure_dimension(self.model.n_in(), self.model.n_out(), "closed-loop feedback")?;
        self.model.check_input(seed, "rollout seed")?;
        if let Some(&value) = seed.iter().find(|v| !v.is_finite()) {
            return Err(CtrnnError::invalid_config("rollout seed", value, "must be finite"));
        }

        let mut outputs = Vec::with_capacity(steps);
        let mut input = seed.clone();
        for step in 0..steps {
            let output = self.model.step(&input);
            check_step(self.model, &output, step)?;
            input = output.clone();
            outputs.push(output);
        }

        tracing::debug!("Rollout produced {} steps", outputs.len());
        Ok(Rollout::from_outputs(outputs))
    }

    /// Runs `sequence` from a reset model, feeding
    /// `(1 - feedback) * x_t + feedback * y_{t-1}` at every step after the
    /// first. `feedback = 0` is plain teacher forcing; `feedback = 1` matches
    /// a rollout seeded with the first input.
    pub fn replay(&mut self, sequence: &Sequence, feedback: f32) -> CtrnnResult<ReplayReport> {
        if !(0.0..=1.0).contains(&feedback) {
            return Err(CtrnnError::invalid_config(
                "feedback",
                feedback,
                "must lie in [0, 1]",
            ));
        }
        ensure_dimension(self.model.n_in(), sequence.dimension(), "replay input")?;
        ensure_dimension(self.model.n_out(), sequence.dimension(), "replay target")?;

        self.model.reset();
        let mut outputs: Vec<Array1<f32>> = Vec::with_capacity(sequence.len());
        let mut squared_error = 0.0_f32;

        for (step, pair) in sequence.iter().enumerate() {
            let input = match outputs.last() {
                Some(previous) if feedback > 0.0 => {
                    &pair.input * (1.0 - feedback) + previous * feedback
                }
                _ => pair.input.clone(),
            };
            let output = self.model.step(&input);
            check_step(self.model, &output, step)?;
            squared_error += (&output - &pair.target).mapv(|d| d * d).sum();
            outputs.push(output);
        }

        Ok(ReplayReport {
            rollout: Rollout::from_outputs(outputs),
            squared_error,
        })
    }
}

/// Output and internal hidden state must both stay finite.
fn check_step(model: &SequenceModel, output: &Array1<f32>, step: usize) -> CtrnnResult<()> {
    let result = match output.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(CtrnnError::divergence("rollout output", step, value)),
        None => model.check_state(step),
    };
    if result.is_err() {
        tracing::error!("Rollout diverged at step {}", step);
    }
    result
}
