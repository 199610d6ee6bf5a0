//! Optimizers for the trainable parameters.
//!
//! Parameters are handed over as named, shape-erased views so one optimizer
//! instance can keep per-parameter state across updates. A parameter whose
//! gradient is `None` is left untouched and its state is not advanced.

use std::collections::HashMap;

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

use crate::config::{OptimizerKind, TrainingConfig};

/// One trainable array together with its gradient for this update.
pub struct NamedParameter<'a> {
    pub name: &'static str,
    pub value: ArrayViewMutD<'a, f32>,
    pub gradient: Option<ArrayViewD<'a, f32>>,
}

impl<'a> NamedParameter<'a> {
    pub fn new(
        name: &'static str,
        value: ArrayViewMutD<'a, f32>,
        gradient: Option<ArrayViewD<'a, f32>>,
    ) -> Self {
        Self {
            name,
            value,
            gradient,
        }
    }
}

/// Gradient-based parameter update rule.
pub trait Optimizer {
    /// Applies one update to every parameter that carries a gradient.
    fn step(&mut self, params: &mut [NamedParameter<'_>]);

    /// Drops all accumulated per-parameter state.
    fn reset(&mut self);

    fn learning_rate(&self) -> f32;

    /// Serializable copy of the optimizer state.
    fn snapshot(&self) -> OptimizerStateSnapshot;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgdOptimizerState {
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub velocities: HashMap<String, ArrayD<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdamOptimizerState {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub weight_decay: f32,
    pub first_moments: HashMap<String, ArrayD<f32>>,
    pub second_moments: HashMap<String, ArrayD<f32>>,
    pub t: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptimizerStateSnapshot {
    Sgd(SgdOptimizerState),
    Adam(AdamOptimizerState),
}

impl OptimizerStateSnapshot {
    /// Rebuilds a boxed optimizer carrying this state.
    pub fn into_optimizer(self) -> Box<dyn Optimizer> {
        match self {
            OptimizerStateSnapshot::Sgd(state) => {
                let mut optimizer = SgdOptimizer::new(state.learning_rate, 0.0, 0.0);
                optimizer.apply_state(state);
                Box::new(optimizer)
            }
            OptimizerStateSnapshot::Adam(state) => {
                let mut optimizer = AdamOptimizer::new(state.learning_rate, 0.0);
                optimizer.apply_state(state);
                Box::new(optimizer)
            }
        }
    }
}

/// Builds the optimizer selected in the training configuration.
pub fn build_optimizer(config: &TrainingConfig) -> Box<dyn Optimizer> {
    match config.optimizer {
        OptimizerKind::Adam => Box::new(AdamOptimizer::new(
            config.learning_rate,
            config.weight_decay,
        )),
        OptimizerKind::Sgd => Box::new(SgdOptimizer::new(
            config.learning_rate,
            config.momentum,
            config.weight_decay,
        )),
    }
}

/// Stochastic Gradient Descent optimizer with momentum.
///
/// ```text
/// velocity = momentum * velocity + learning_rate * gradient
/// parameter = parameter - velocity
/// ```
#[derive(Debug, Clone)]
pub struct SgdOptimizer {
    pub learning_rate: f32,
    /// Momentum coefficient (0.0 = plain gradient descent)
    pub momentum: f32,
    /// L2 regularization strength
    pub weight_decay: f32,
    velocities: HashMap<String, ArrayD<f32>>,
}

impl SgdOptimizer {
    pub fn new(learning_rate: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay,
            velocities: HashMap::new(),
        }
    }

    pub fn to_state(&self) -> SgdOptimizerState {
        SgdOptimizerState {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            weight_decay: self.weight_decay,
            velocities: self.velocities.clone(),
        }
    }

    pub fn apply_state(&mut self, state: SgdOptimizerState) {
        self.learning_rate = state.learning_rate;
        self.momentum = state.momentum;
        self.weight_decay = state.weight_decay;
        self.velocities = state.velocities;
    }
}

impl Optimizer for SgdOptimizer {
    fn step(&mut self, params: &mut [NamedParameter<'_>]) {
        let (lr, momentum, decay) = (self.learning_rate, self.momentum, self.weight_decay);

        for param in params.iter_mut() {
            let Some(gradient) = param.gradient.as_ref() else {
                continue;
            };
            let velocity = moment_slot(&mut self.velocities, param.name, gradient);

            Zip::from(&mut param.value)
                .and(velocity)
                .and(gradient)
                .for_each(|p, v, &g| {
                    let g = g + decay * *p;
                    *v = momentum * *v + lr * g;
                    *p -= *v;
                });
        }
    }

    fn reset(&mut self) {
        self.velocities.clear();
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn snapshot(&self) -> OptimizerStateSnapshot {
        OptimizerStateSnapshot::Sgd(self.to_state())
    }
}

/// Adam optimizer (Adaptive Moment Estimation).
///
/// The time step advances once per [`Optimizer::step`] call, regardless of
/// how many parameters the call updates.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    pub learning_rate: f32,
    /// Exponential decay rate for first moment (typically 0.9)
    pub beta1: f32,
    /// Exponential decay rate for second moment (typically 0.999)
    pub beta2: f32,
    /// Small constant for numerical stability
    pub epsilon: f32,
    pub weight_decay: f32,
    first_moments: HashMap<String, ArrayD<f32>>,
    second_moments: HashMap<String, ArrayD<f32>>,
    t: usize,
}

impl AdamOptimizer {
    pub fn new(learning_rate: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay,
            first_moments: HashMap::new(),
            second_moments: HashMap::new(),
            t: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn time_step(&self) -> usize {
        self.t
    }

    pub fn to_state(&self) -> AdamOptimizerState {
        AdamOptimizerState {
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            weight_decay: self.weight_decay,
            first_moments: self.first_moments.clone(),
            second_moments: self.second_moments.clone(),
            t: self.t,
        }
    }

    pub fn apply_state(&mut self, state: AdamOptimizerState) {
        self.learning_rate = state.learning_rate;
        self.beta1 = state.beta1;
        self.beta2 = state.beta2;
        self.epsilon = state.epsilon;
        self.weight_decay = state.weight_decay;
        self.first_moments = state.first_moments;
        self.second_moments = state.second_moments;
        self.t = state.t;
    }
}

impl Optimizer for AdamOptimizer {
    fn step(&mut self, params: &mut [NamedParameter<'_>]) {
        self.t += 1;
        let t = self.t.min(i32::MAX as usize) as i32;
        let (lr, beta1, beta2, eps, decay) = (
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            self.weight_decay,
        );
        let bias1 = 1.0 - beta1.powi(t);
        let bias2 = 1.0 - beta2.powi(t);

        for param in params.iter_mut() {
            let Some(gradient) = param.gradient.as_ref() else {
                continue;
            };
            let m = moment_slot(&mut self.first_moments, param.name, gradient);
            let v = moment_slot(&mut self.second_moments, param.name, gradient);

            Zip::from(&mut param.value)
                .and(m)
                .and(v)
                .and(gradient)
                .for_each(|p, m, v, &g| {
                    let g = g + decay * *p;
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }

    fn reset(&mut self) {
        self.first_moments.clear();
        self.second_moments.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn snapshot(&self) -> OptimizerStateSnapshot {
        OptimizerStateSnapshot::Adam(self.to_state())
    }
}

/// Per-parameter state array, (re)created with the gradient's shape.
fn moment_slot<'m>(
    store: &'m mut HashMap<String, ArrayD<f32>>,
    name: &str,
    gradient: &ArrayViewD<'_, f32>,
) -> &'m mut ArrayD<f32> {
    let slot = store
        .entry(name.to_string())
        .or_insert_with(|| ArrayD::zeros(gradient.raw_dim()));
    if slot.shape() != gradient.shape() {
        *slot = ArrayD::zeros(gradient.raw_dim());
    }
    slot
}
