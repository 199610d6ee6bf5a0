//! Recurrent sequence model: leaky cell followed by a readout.

use ndarray::Array1;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::checkpoint::{check_version, CheckpointError, Checkpointable};
use crate::config::ModelConfig;
use crate::error::{ensure_dimension, CtrnnError, CtrnnResult};
use crate::neural::cell::{LeakyCell, TimeConstant};
use crate::neural::gradient::ReadoutGradients;
use crate::neural::linear::Linear;
use crate::neural::optimizer::NamedParameter;
use crate::neural::readout::Readout;

const MODEL_CHECKPOINT_VERSION: u32 = 1;

/// Owned copy of every parameter block, used for inspection and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub input_to_hidden: Linear,
    pub hidden_to_hidden: Linear,
    pub hidden_to_output: Linear,
    pub time_constant: TimeConstant,
}

/// Leaky cell plus readout with a reset / step protocol.
///
/// # Examples
///
/// ```
/// use ctrnn_core::{ModelConfig, SequenceModel};
/// use ndarray::array;
///
/// let mut model = SequenceModel::new(ModelConfig::new(1, 5, 1, 2.0)).unwrap();
/// model.reset();
/// let y = model.step(&array![0.1]);
/// assert_eq!(y.len(), 1);
/// assert!(y[0].abs() <= 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceModel {
    cell: LeakyCell,
    readout: Readout,
}

impl SequenceModel {
    /// Validates the configuration and draws initial weights from `config.seed`.
    pub fn new(config: ModelConfig) -> CtrnnResult<Self> {
        config.validate()?;
        let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
        let cell = LeakyCell::new(config.n_in, config.n_hidden, config.time_constant, &mut rng)?;
        let readout = Readout::new(config.n_hidden, config.n_out, &mut rng)?;
        Self::from_parts(cell, readout)
    }

    pub fn from_parts(cell: LeakyCell, readout: Readout) -> CtrnnResult<Self> {
        ensure_dimension(cell.n_hidden(), readout.n_hidden(), "readout input width")?;
        Ok(Self { cell, readout })
    }

    /// Rebuilds a model from a parameter snapshot, checking every shape.
    pub fn from_parameters(parameters: ModelParameters) -> CtrnnResult<Self> {
        if parameters.input_to_hidden.in_features() == 0 {
            return Err(CtrnnError::invalid_config("n_in", 0, "must be positive"));
        }
        for (name, map) in [
            ("input_to_hidden", &parameters.input_to_hidden),
            ("hidden_to_hidden", &parameters.hidden_to_hidden),
            ("hidden_to_output", &parameters.hidden_to_output),
        ] {
            if !map.is_finite() {
                return Err(CtrnnError::invalid_config(
                    name,
                    "non-finite entries",
                    "parameters must be finite",
                ));
            }
        }
        let cell = LeakyCell::from_parameters(
            parameters.input_to_hidden,
            parameters.hidden_to_hidden,
            parameters.time_constant,
        )?;
        let readout = Readout::from_linear(parameters.hidden_to_output)?;
        Self::from_parts(cell, readout)
    }

    /// Clears the recurrent state.
    pub fn reset(&mut self) {
        self.cell.reset();
    }

    /// One prediction step.
    pub fn step(&mut self, input: &Array1<f32>) -> Array1<f32> {
        self.forward_observed(input).1
    }

    /// One prediction step that also returns the observable hidden state the
    /// readout consumed: `(observable, output)`.
    pub fn forward_observed(&mut self, input: &Array1<f32>) -> (Array1<f32>, Array1<f32>) {
        let observable = self.cell.step(input);
        let output = self.readout.apply(&observable);
        (observable, output)
    }

    /// Fails with [`CtrnnError::NumericDivergence`] once the internal hidden
    /// state holds a NaN or infinite value. `index` is the caller's epoch or
    /// step counter.
    pub fn check_state(&self, index: usize) -> CtrnnResult<()> {
        match self.cell.non_finite_state() {
            Some(value) => Err(CtrnnError::divergence("hidden state", index, value)),
            None => Ok(()),
        }
    }

    /// Fails unless `input` has `n_in` components.
    pub fn check_input(&self, input: &Array1<f32>, context: &str) -> CtrnnResult<()> {
        ensure_dimension(self.n_in(), input.len(), context)
    }

    pub fn n_in(&self) -> usize {
        self.cell.n_in()
    }

    pub fn n_hidden(&self) -> usize {
        self.cell.n_hidden()
    }

    pub fn n_out(&self) -> usize {
        self.readout.n_out()
    }

    pub fn cell(&self) -> &LeakyCell {
        &self.cell
    }

    /// Mutable cell access, e.g. to prime the hidden state.
    pub fn cell_mut(&mut self) -> &mut LeakyCell {
        &mut self.cell
    }

    pub fn readout(&self) -> &Readout {
        &self.readout
    }

    pub fn readout_mut(&mut self) -> &mut Readout {
        &mut self.readout
    }

    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            input_to_hidden: self.cell.input_to_hidden().clone(),
            hidden_to_hidden: self.cell.hidden_to_hidden().clone(),
            hidden_to_output: self.readout.affine().clone(),
            time_constant: self.cell.time_constant().clone(),
        }
    }

    /// Every trainable array paired with its gradient for one update.
    ///
    /// The readout sees only a detached copy of the hidden state, so the
    /// input-to-hidden and hidden-to-hidden maps never carry a gradient.
    pub fn named_parameters<'a>(
        &'a mut self,
        readout_grads: &'a ReadoutGradients,
    ) -> Vec<NamedParameter<'a>> {
        let (i2h, h2h) = self.cell.affine_maps_mut();
        let h2o = self.readout.affine_mut();
        vec![
            NamedParameter::new(
                "input_to_hidden.weight",
                i2h.weight.view_mut().into_dyn(),
                None,
            ),
            NamedParameter::new(
                "input_to_hidden.bias",
                i2h.bias.view_mut().into_dyn(),
                None,
            ),
            NamedParameter::new(
                "hidden_to_hidden.weight",
                h2h.weight.view_mut().into_dyn(),
                None,
            ),
            NamedParameter::new(
                "hidden_to_hidden.bias",
                h2h.bias.view_mut().into_dyn(),
                None,
            ),
            NamedParameter::new(
                "hidden_to_output.weight",
                h2o.weight.view_mut().into_dyn(),
                Some(readout_grads.weight.view().into_dyn()),
            ),
            NamedParameter::new(
                "hidden_to_output.bias",
                h2o.bias.view_mut().into_dyn(),
                Some(readout_grads.bias.view().into_dyn()),
            ),
        ]
    }

    pub fn parameter_count(&self) -> usize {
        self.cell.input_to_hidden().parameter_count()
            + self.cell.hidden_to_hidden().parameter_count()
            + self.readout.affine().parameter_count()
    }
}

#[derive(Serialize, Deserialize)]
struct SequenceModelCheckpoint {
    version: u32,
    parameters: ModelParameters,
}

impl Checkpointable for SequenceModel {
    fn save_checkpoint<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let snapshot = SequenceModelCheckpoint {
            version: MODEL_CHECKPOINT_VERSION,
            parameters: self.parameters(),
        };
        Self::write_snapshot(&snapshot, path)
    }

    /// The loaded model starts reset.
    fn load_checkpoint<P: AsRef<std::path::Path>>(path: P) -> Result<Self, CheckpointError> {
        let snapshot: SequenceModelCheckpoint = Self::read_snapshot(path)?;
        check_version(MODEL_CHECKPOINT_VERSION, snapshot.version)?;
        Ok(Self::from_parameters(snapshot.parameters)?)
    }
}
