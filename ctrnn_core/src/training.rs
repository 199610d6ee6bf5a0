//! Full-sequence training loop.
//!
//! Each epoch resets the model, runs the whole sequence with teacher forcing,
//! sums the per-step squared errors and applies a single optimizer update.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::checkpoint::{check_version, CheckpointError, Checkpointable};
use crate::config::TrainingConfig;
use crate::data::Sequence;
use crate::error::{ensure_dimension, CtrnnError, CtrnnResult};
use crate::logging::RunLog;
use crate::neural::loss::squared_error_with_gradient;
use crate::neural::optimizer::{build_optimizer, Optimizer, OptimizerStateSnapshot};
use crate::neural::SequenceModel;

const TRAINER_CHECKPOINT_VERSION: u32 = 1;

/// Metrics for a single epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Zero-based epoch index across the trainer's lifetime
    pub epoch: usize,
    /// Summed squared error over the sequence, before this epoch's update
    pub loss: f32,
    /// Norm of the readout gradient used for the update
    pub gradient_norm: f32,
    pub learning_rate: f32,
    pub elapsed_ms: u128,
}

/// Result of one [`Trainer::train`] call
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// One summed loss per epoch of this call, in order
    pub loss_history: Vec<f32>,
    pub epoch_metrics: Vec<EpochMetrics>,
    /// Epoch with the lowest loss, if any epoch ran
    pub best_epoch: Option<usize>,
    pub total_elapsed_ms: u128,
}

impl TrainingReport {
    pub fn first_loss(&self) -> Option<f32> {
        self.loss_history.first().copied()
    }

    pub fn final_loss(&self) -> Option<f32> {
        self.loss_history.last().copied()
    }
}

/// Serializable trainer state for checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    pub config: TrainingConfig,
    pub optimizer: OptimizerStateSnapshot,
    pub loss_history: Vec<f32>,
}

/// Training orchestrator
pub struct Trainer {
    config: TrainingConfig,
    optimizer: Box<dyn Optimizer>,
    loss_history: Vec<f32>,
    run_log: Option<RunLog>,
}

impl Trainer {
    /// Trainer with the optimizer named in `config`.
    pub fn new(config: TrainingConfig) -> CtrnnResult<Self> {
        let optimizer = build_optimizer(&config);
        Self::with_optimizer(config, optimizer)
    }

    pub fn with_optimizer(
        config: TrainingConfig,
        optimizer: Box<dyn Optimizer>,
    ) -> CtrnnResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            optimizer,
            loss_history: Vec::new(),
            run_log: None,
        })
    }

    /// Appends one JSON line per epoch to `run_log`.
    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    /// Every epoch loss recorded by this trainer, across `train` calls.
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    /// Runs `config.epochs` epochs over `sequence`.
    ///
    /// Stops with [`CtrnnError::NumericDivergence`] as soon as an epoch's loss,
    /// readout gradient or hidden state is not finite; the diverged epoch
    /// applies no update.
    pub fn train(
        &mut self,
        model: &mut SequenceModel,
        sequence: &Sequence,
    ) -> CtrnnResult<TrainingReport> {
        check_shapes(model, sequence)?;

        tracing::info!("Starting training for {} epochs", self.config.epochs);
        tracing::info!("Sequence length: {}", sequence.len());
        tracing::info!("Model parameters: {}", model.parameter_count());

        let start_time = Instant::now();
        let mut epoch_metrics = Vec::with_capacity(self.config.epochs);

        for _ in 0..self.config.epochs {
            let metrics = self.run_epoch(model, sequence)?;

            let log_every = self.config.log_every;
            if log_every > 0 && (metrics.epoch + 1) % log_every == 0 {
                tracing::info!(
                    "Epoch {}: loss={:.6}, grad_norm={:.6}",
                    metrics.epoch + 1,
                    metrics.loss,
                    metrics.gradient_norm
                );
            }
            epoch_metrics.push(metrics);
        }

        let loss_history: Vec<f32> = epoch_metrics.iter().map(|m| m.loss).collect();
        let best_epoch = epoch_metrics
            .iter()
            .min_by(|a, b| a.loss.total_cmp(&b.loss))
            .map(|m| m.epoch);

        let total_elapsed_ms = start_time.elapsed().as_millis();
        tracing::info!(
            "Training complete! Total time: {:.2}s",
            total_elapsed_ms as f64 / 1000.0
        );

        Ok(TrainingReport {
            loss_history,
            epoch_metrics,
            best_epoch,
            total_elapsed_ms,
        })
    }

    /// One epoch, with shape checks.
    pub fn train_epoch(
        &mut self,
        model: &mut SequenceModel,
        sequence: &Sequence,
    ) -> CtrnnResult<EpochMetrics> {
        check_shapes(model, sequence)?;
        self.run_epoch(model, sequence)
    }

    fn run_epoch(
        &mut self,
        model: &mut SequenceModel,
        sequence: &Sequence,
    ) -> CtrnnResult<EpochMetrics> {
        let epoch = self.loss_history.len();
        let epoch_start = Instant::now();

        model.reset();
        let mut total_loss = 0.0_f32;
        let mut grads = model.readout().zero_gradients();

        for pair in sequence {
            let (observable, output) = model.forward_observed(&pair.input);
            if let Err(err) = model.check_state(epoch) {
                tracing::error!("Hidden state diverged at epoch {}", epoch);
                return Err(err);
            }
            let (loss, output_grad) = squared_error_with_gradient(&output, &pair.target);
            total_loss += loss;
            model
                .readout()
                .accumulate_gradient(&observable, &output, &output_grad, &mut grads);
        }

        if !total_loss.is_finite() {
            tracing::error!("Loss diverged at epoch {}: {}", epoch, total_loss);
            return Err(CtrnnError::divergence("training loss", epoch, total_loss));
        }
        let gradient_norm = grads.norm();
        if !grads.is_finite() || !gradient_norm.is_finite() {
            tracing::error!("Readout gradient diverged at epoch {}", epoch);
            return Err(CtrnnError::divergence(
                "readout gradient",
                epoch,
                gradient_norm,
            ));
        }

        {
            let mut params = model.named_parameters(&grads);
            self.optimizer.step(&mut params);
        }
        self.loss_history.push(total_loss);

        let metrics = EpochMetrics {
            epoch,
            loss: total_loss,
            gradient_norm,
            learning_rate: self.optimizer.learning_rate(),
            elapsed_ms: epoch_start.elapsed().as_millis(),
        };
        tracing::debug!("epoch {} loss {:.6}", epoch, total_loss);

        if let Some(run_log) = &self.run_log {
            if let Err(err) = run_log.log_epoch(&metrics) {
                tracing::warn!("Failed to append epoch log: {}", err);
            }
        }

        Ok(metrics)
    }

    pub fn state(&self) -> TrainerState {
        TrainerState {
            config: self.config.clone(),
            optimizer: self.optimizer.snapshot(),
            loss_history: self.loss_history.clone(),
        }
    }

    /// Resumes from a saved state; later epochs continue the numbering.
    pub fn from_state(state: TrainerState) -> CtrnnResult<Self> {
        let mut trainer = Self::with_optimizer(state.config, state.optimizer.into_optimizer())?;
        trainer.loss_history = state.loss_history;
        Ok(trainer)
    }
}

#[derive(Serialize, Deserialize)]
struct TrainerCheckpoint {
    version: u32,
    state: TrainerState,
}

/// Persists config, optimizer moments and loss history. The run log is not
/// part of the checkpoint.
impl Checkpointable for Trainer {
    fn save_checkpoint<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let snapshot = TrainerCheckpoint {
            version: TRAINER_CHECKPOINT_VERSION,
            state: self.state(),
        };
        Self::write_snapshot(&snapshot, path)
    }

    fn load_checkpoint<P: AsRef<std::path::Path>>(path: P) -> Result<Self, CheckpointError> {
        let snapshot: TrainerCheckpoint = Self::read_snapshot(path)?;
        check_version(TRAINER_CHECKPOINT_VERSION, snapshot.version)?;
        Ok(Self::from_state(snapshot.state)?)
    }
}

/// Sequence inputs must match `n_in` and targets `n_out`.
fn check_shapes(model: &SequenceModel, sequence: &Sequence) -> CtrnnResult<()> {
    ensure_dimension(model.n_in(), sequence.dimension(), "sequence input")?;
    ensure_dimension(model.n_out(), sequence.dimension(), "sequence target")
}

/// Trains `model` with Adam for `epochs` passes and returns the loss history.
///
/// # Examples
///
/// ```
/// use ctrnn_core::{train, ModelConfig, Sequence, SequenceModel};
///
/// let mut model = SequenceModel::new(ModelConfig::new(1, 4, 1, 2.0)).unwrap();
/// let sequence = Sequence::from_scalars(&[0.0, 0.3, 0.5, 0.3, 0.0]).unwrap();
/// let history = train(&mut model, &sequence, 5, 0.01).unwrap();
/// assert_eq!(history.len(), 5);
/// ```
pub fn train(
    model: &mut SequenceModel,
    sequence: &Sequence,
    epochs: usize,
    learning_rate: f32,
) -> CtrnnResult<Vec<f32>> {
    let mut trainer = Trainer::new(TrainingConfig::new(epochs, learning_rate))?;
    Ok(trainer.train(model, sequence)?.loss_history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, OptimizerKind};
    use crate::data::SineSource;

    fn sine_sequence() -> Sequence {
        Sequence::from_source(&SineSource::clean(20, 0.8).unwrap()).unwrap()
    }

    #[test]
    fn test_train_records_one_loss_per_epoch() {
        let mut model = SequenceModel::new(ModelConfig::default()).unwrap();
        let mut trainer = Trainer::new(TrainingConfig::new(4, 0.01)).unwrap();
        let report = trainer.train(&mut model, &sine_sequence()).unwrap();

        assert_eq!(report.loss_history.len(), 4);
        assert_eq!(report.epoch_metrics.len(), 4);
        assert_eq!(trainer.loss_history(), report.loss_history.as_slice());
        assert!(report.best_epoch.is_some());
        assert!(report.loss_history.iter().all(|l| l.is_finite() && *l >= 0.0));
    }

    #[test]
    fn epoch_loss_is_the_sum_of_step_losses() {
        let sequence = sine_sequence();
        let mut model = SequenceModel::new(ModelConfig::default()).unwrap();
        let mut reference = model.clone();

        reference.reset();
        let expected: f32 = sequence
            .iter()
            .map(|pair| {
                let y = reference.step(&pair.input);
                (y[0] - pair.target[0]).powi(2)
            })
            .sum();

        let mut trainer = Trainer::new(TrainingConfig::new(1, 0.01)).unwrap();
        let metrics = trainer.train_epoch(&mut model, &sequence).unwrap();
        assert!((metrics.loss - expected).abs() < 1e-4);
    }

    #[test]
    fn zero_epochs_leave_model_untouched() {
        let mut model = SequenceModel::new(ModelConfig::default()).unwrap();
        let before = model.parameters();
        let history = train(&mut model, &sine_sequence(), 0, 0.01).unwrap();
        assert!(history.is_empty());
        assert_eq!(model.parameters(), before);
    }

    #[test]
    fn diverged_loss_is_reported_and_not_applied() {
        let mut model = SequenceModel::new(ModelConfig::default()).unwrap();
        model.readout_mut().affine_mut().weight.fill(f32::NAN);
        let before_bias = model.readout().affine().bias.clone();

        let mut trainer = Trainer::new(TrainingConfig::new(3, 0.01)).unwrap();
        let err = trainer.train(&mut model, &sine_sequence()).unwrap_err();

        assert!(err.is_divergence());
        assert!(matches!(err, CtrnnError::NumericDivergence { index: 0, .. }));
        assert!(trainer.loss_history().is_empty());
        assert_eq!(model.readout().affine().bias, before_bias);
    }

    #[test]
    fn overflowing_hidden_state_stops_training() {
        let mut parameters = SequenceModel::new(ModelConfig::default())
            .unwrap()
            .parameters();
        parameters.input_to_hidden.weight.fill(f32::MAX);
        parameters.input_to_hidden.bias.fill(f32::MAX);
        let mut model = SequenceModel::from_parameters(parameters).unwrap();
        let readout_before = model.readout().clone();

        let mut trainer = Trainer::new(TrainingConfig::new(3, 0.01)).unwrap();
        let err = trainer.train(&mut model, &sine_sequence()).unwrap_err();

        assert!(matches!(
            err,
            CtrnnError::NumericDivergence { ref context, index: 0, .. } if context == "hidden state"
        ));
        assert!(trainer.loss_history().is_empty());
        assert_eq!(model.readout(), &readout_before);
    }

    #[test]
    fn rejects_mismatched_sequence() {
        let mut model = SequenceModel::new(ModelConfig::new(2, 3, 2, 2.0)).unwrap();
        let err = train(&mut model, &sine_sequence(), 1, 0.01).unwrap_err();
        assert!(matches!(err, CtrnnError::DimensionMismatch { .. }));
    }

    #[test]
    fn rejects_invalid_learning_rate() {
        assert!(Trainer::new(TrainingConfig::new(1, 0.0)).is_err());
        assert!(Trainer::new(TrainingConfig::new(1, f32::NAN)).is_err());
    }

    #[test]
    fn sgd_trainer_runs() {
        let config = TrainingConfig {
            optimizer: OptimizerKind::Sgd,
            momentum: 0.5,
            ..TrainingConfig::new(3, 0.001)
        };
        let mut model = SequenceModel::new(ModelConfig::default()).unwrap();
        let report = Trainer::new(config)
            .unwrap()
            .train(&mut model, &sine_sequence())
            .unwrap();
        assert_eq!(report.loss_history.len(), 3);
    }

    #[test]
    fn trainer_checkpoint_restores_state() {
        let dir = std::env::temp_dir().join(format!("ctrnn-trainer-{}", uuid::Uuid::new_v4()));
        let path = dir.join("trainer.bin");
        let mut model = SequenceModel::new(ModelConfig::default()).unwrap();
        let mut trainer = Trainer::new(TrainingConfig::new(3, 0.01)).unwrap();
        trainer.train(&mut model, &sine_sequence()).unwrap();

        trainer.save_checkpoint(&path).unwrap();
        let restored = Trainer::load_checkpoint(&path).unwrap();
        assert_eq!(restored.state(), trainer.state());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn resumed_trainer_continues_numbering() {
        let sequence = sine_sequence();
        let mut model = SequenceModel::new(ModelConfig::default()).unwrap();
        let mut trainer = Trainer::new(TrainingConfig::new(2, 0.01)).unwrap();
        trainer.train(&mut model, &sequence).unwrap();

        let mut resumed = Trainer::from_state(trainer.state()).unwrap();
        let report = resumed.train(&mut model, &sequence).unwrap();
        assert_eq!(report.epoch_metrics[0].epoch, 2);
        assert_eq!(resumed.loss_history().len(), 4);
    }
}
