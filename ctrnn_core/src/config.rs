//! Run configuration via TOML files.
//!
//! Every section and key is optional; missing values fall back to the
//! defaults of the reference sine experiment (1-5-1 network, `tau = 2`,
//! Adam at `lr = 0.01`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CtrnnError, CtrnnResult};
use crate::neural::cell::TimeConstant;

/// Network shape, time constants and initialization seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Input dimensionality
    pub n_in: usize,
    /// Number of recurrent units
    pub n_hidden: usize,
    /// Output dimensionality
    pub n_out: usize,
    /// Integrator time constant(s)
    pub time_constant: TimeConstant,
    /// Seed for weight initialization
    pub seed: u64,
}

impl ModelConfig {
    /// Shared time constant `tau`. Not validated until the model is built.
    pub fn new(n_in: usize, n_hidden: usize, n_out: usize, tau: f32) -> Self {
        Self {
            n_in,
            n_hidden,
            n_out,
            time_constant: TimeConstant::Uniform(tau),
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_time_constant(mut self, time_constant: TimeConstant) -> Self {
        self.time_constant = time_constant;
        self
    }

    /// Fails fast on zero sizes or invalid time constants.
    pub fn validate(&self) -> CtrnnResult<()> {
        for (name, value) in [
            ("n_in", self.n_in),
            ("n_hidden", self.n_hidden),
            ("n_out", self.n_out),
        ] {
            if value == 0 {
                return Err(CtrnnError::invalid_config(name, value, "must be positive"));
            }
        }
        self.time_constant.validate(self.n_hidden)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(1, 5, 1, 2.0)
    }
}

/// Update rule used by the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

/// Training loop hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of full passes over the sequence
    pub epochs: usize,
    /// Optimizer step size
    pub learning_rate: f32,
    pub optimizer: OptimizerKind,
    /// Momentum for SGD; ignored by Adam
    pub momentum: f32,
    /// L2 penalty added to each gradient
    pub weight_decay: f32,
    /// Emit an info-level progress line every this many epochs (0 = never)
    pub log_every: usize,
}

impl TrainingConfig {
    pub fn new(epochs: usize, learning_rate: f32) -> Self {
        Self {
            epochs,
            learning_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> CtrnnResult<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(CtrnnError::invalid_config(
                "learning_rate",
                self.learning_rate,
                "must be finite and positive",
            ));
        }
        if !self.momentum.is_finite() || !(0.0..1.0).contains(&self.momentum) {
            return Err(CtrnnError::invalid_config(
                "momentum",
                self.momentum,
                "must lie in [0, 1)",
            ));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(CtrnnError::invalid_config(
                "weight_decay",
                self.weight_decay,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 2000,
            learning_rate: 0.01,
            optimizer: OptimizerKind::Adam,
            momentum: 0.0,
            weight_decay: 0.0,
            log_every: 100,
        }
    }
}

/// Which synthetic signal to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    #[default]
    Sine,
    Lissajous,
}

/// Parameters of the synthetic training signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub kind: SignalKind,
    /// Samples per period (sine) or number of points (lissajous)
    pub period: usize,
    pub amplitude: f32,
    /// Standard deviation of additive Gaussian noise (sine only)
    pub noise_std: f32,
    pub seed: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            kind: SignalKind::Sine,
            period: 100,
            amplitude: 0.8,
            noise_std: 0.02,
            seed: 7,
        }
    }
}

/// Closed-loop generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    pub steps: usize,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self { steps: 200 }
    }
}

/// Where run logs and exported series are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub log_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Complete experiment configuration.
///
/// # Examples
///
/// ```
/// use ctrnn_core::RunConfig;
///
/// let config = RunConfig::from_str("[model]\nn_hidden = 8\n[training]\nepochs = 10").unwrap();
/// assert_eq!(config.model.n_hidden, 8);
/// assert_eq!(config.training.epochs, 10);
/// assert_eq!(config.training.learning_rate, 0.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RunConfig {
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub signal: SignalConfig,
    pub rollout: RolloutConfig,
    pub output: OutputConfig,
}

impl RunConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawRunConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        let model = raw.model.into_config()?;
        let training = raw.training.into_config()?;

        if raw.signal.kind == SignalKind::Sine && raw.signal.period == 0 {
            return Err(CtrnnError::invalid_config("signal.period", 0, "must be positive").into());
        }

        Ok(Self {
            model,
            training,
            signal: raw.signal,
            rollout: raw.rollout,
            output: raw.output,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRunConfig {
    model: RawModelConfig,
    training: RawTrainingConfig,
    signal: SignalConfig,
    rollout: RolloutConfig,
    output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawModelConfig {
    n_in: usize,
    n_hidden: usize,
    n_out: usize,
    tau: f32,
    tau_per_unit: Option<Vec<f32>>,
    seed: u64,
}

impl Default for RawModelConfig {
    fn default() -> Self {
        let defaults = ModelConfig::default();
        Self {
            n_in: defaults.n_in,
            n_hidden: defaults.n_hidden,
            n_out: defaults.n_out,
            tau: 2.0,
            tau_per_unit: None,
            seed: defaults.seed,
        }
    }
}

impl RawModelConfig {
    fn into_config(self) -> Result<ModelConfig, ConfigError> {
        let time_constant = match self.tau_per_unit {
            Some(taus) => TimeConstant::per_unit(taus)?,
            None => TimeConstant::uniform(self.tau)?,
        };
        let config = ModelConfig {
            n_in: self.n_in,
            n_hidden: self.n_hidden,
            n_out: self.n_out,
            time_constant,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawTrainingConfig {
    epochs: usize,
    learning_rate: f32,
    optimizer: OptimizerKind,
    momentum: f32,
    weight_decay: f32,
    log_every: usize,
}

impl Default for RawTrainingConfig {
    fn default() -> Self {
        let defaults = TrainingConfig::default();
        Self {
            epochs: defaults.epochs,
            learning_rate: defaults.learning_rate,
            optimizer: defaults.optimizer,
            momentum: defaults.momentum,
            weight_decay: defaults.weight_decay,
            log_every: defaults.log_every,
        }
    }
}

impl RawTrainingConfig {
    fn into_config(self) -> Result<TrainingConfig, ConfigError> {
        let config = TrainingConfig {
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            optimizer: self.optimizer,
            momentum: self.momentum,
            weight_decay: self.weight_decay,
            log_every: self.log_every,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(CtrnnError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
            ConfigError::Invalid(err) => write!(f, "Invalid configuration: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<CtrnnError> for ConfigError {
    fn from(value: CtrnnError) -> Self {
        ConfigError::Invalid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let config = RunConfig::from_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.model.time_constant, TimeConstant::Uniform(2.0));
        assert_eq!(config.training.optimizer, OptimizerKind::Adam);
        assert_eq!(config.signal.kind, SignalKind::Sine);
    }

    #[test]
    fn parses_custom_values() {
        let toml = r#"
[model]
n_in = 2
n_hidden = 4
n_out = 2
tau_per_unit = [2.0, 2.0, 10.0, 10.0]
seed = 9

[training]
epochs = 30
learning_rate = 0.05
optimizer = "sgd"
momentum = 0.5
weight_decay = 0.001

[signal]
kind = "lissajous"
period = 20

[rollout]
steps = 12

[output]
log_dir = "runs/test"
"#;
        let config = RunConfig::from_str(toml).unwrap();
        assert_eq!(config.model.n_in, 2);
        assert_eq!(
            config.model.time_constant,
            TimeConstant::per_unit(vec![2.0, 2.0, 10.0, 10.0]).unwrap()
        );
        assert_eq!(config.training.optimizer, OptimizerKind::Sgd);
        assert_eq!(config.training.momentum, 0.5);
        assert_eq!(config.training.weight_decay, 0.001);
        assert_eq!(config.signal.kind, SignalKind::Lissajous);
        assert_eq!(config.rollout.steps, 12);
        assert_eq!(config.output.log_dir, PathBuf::from("runs/test"));
    }

    #[test]
    fn rejects_non_positive_tau() {
        let err = RunConfig::from_str("[model]\ntau = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref e) if e.is_configuration()));
    }

    #[test]
    fn rejects_per_unit_width_mismatch() {
        let err = RunConfig::from_str("[model]\nn_hidden = 3\ntau_per_unit = [2.0, 3.0]")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(CtrnnError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_bad_learning_rate() {
        let err = RunConfig::from_str("[training]\nlearning_rate = -1.0").unwrap_err();
        assert!(err.to_string().contains("learning_rate"));
    }

    #[test]
    fn rejects_negative_weight_decay() {
        let err = RunConfig::from_str("[training]\nweight_decay = -0.1").unwrap_err();
        assert!(err.to_string().contains("weight_decay"));
        assert_eq!(RunConfig::default().training.weight_decay, 0.0);
    }

    #[test]
    fn reports_parse_errors() {
        let err = RunConfig::from_str("[model\nn_in = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn model_config_validation() {
        assert!(ModelConfig::new(1, 5, 1, 2.0).validate().is_ok());
        assert!(ModelConfig::new(0, 5, 1, 2.0).validate().is_err());
        assert!(ModelConfig::new(1, 5, 1, 0.0).validate().is_err());
    }
}
