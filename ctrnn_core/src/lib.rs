//! # CTRNN Core
//!
//! A small continuous-time recurrent network for one-step-ahead time-series
//! prediction. A bank of leaky-integrator units feeds a `tanh` readout; only
//! the readout is trained, with the whole sequence contributing to one
//! optimizer update per epoch. A trained model can then generate a series in
//! closed loop by feeding its outputs back as inputs.
//!
//! ## Quick Start
//!
//! ```rust
//! use ctrnn_core::{ModelConfig, Predictor, Sequence, SequenceModel, SineSource, Trainer, TrainingConfig};
//!
//! let source = SineSource::clean(20, 0.8).unwrap();
//! let sequence = Sequence::from_source(&source).unwrap();
//!
//! let mut model = SequenceModel::new(ModelConfig::new(1, 5, 1, 2.0)).unwrap();
//! let mut trainer = Trainer::new(TrainingConfig::new(10, 0.01)).unwrap();
//! let report = trainer.train(&mut model, &sequence).unwrap();
//! assert_eq!(report.loss_history.len(), 10);
//!
//! // Continue in closed loop from the state the last epoch left behind.
//! let rollout = Predictor::new(&mut model)
//!     .rollout(sequence.last_target(), 50)
//!     .unwrap();
//! assert_eq!(rollout.len(), 50);
//! ```
//!
//! ## Core Modules
//!
//! - [`neural`] - Leaky cell, readout, sequence model and optimizers
//! - [`training`] - Full-sequence training loop
//! - [`predictor`] - Closed-loop rollout and replay
//! - [`data`] - Signal sources and one-step-ahead sequences
//! - [`config`] - Run configuration via TOML
//! - [`logging`] - JSON line-delimited logging
//! - [`checkpoint`] - Versioned binary persistence

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod neural;
pub mod predictor;
pub mod training;

pub use checkpoint::{CheckpointError, Checkpointable};
pub use config::{
    ConfigError, ModelConfig, OptimizerKind, OutputConfig, RolloutConfig, RunConfig,
    SignalConfig, SignalKind, TrainingConfig,
};
pub use data::{
    build_source, LissajousSource, Sequence, SineSource, TimeSeriesSource, TrainingPair,
};
pub use error::{CtrnnError, CtrnnResult};
pub use logging::{write_series, RunLog, SeriesExport};
pub use neural::{
    AdamOptimizer, LeakyCell, Linear, ModelParameters, Optimizer, OptimizerStateSnapshot,
    Readout, SequenceModel, SgdOptimizer, TimeConstant,
};
pub use predictor::{Predictor, ReplayReport, Rollout};
pub use training::{train, EpochMetrics, Trainer, TrainerState, TrainingReport};
