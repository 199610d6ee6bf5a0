//! Lissajous Rollout Demo
//!
//! Fits a two-channel figure-eight with a network of fast and slow units,
//! scores it under increasing amounts of self-feedback and finally traces the
//! figure in closed loop.
//!
//! Run with:
//! ```
//! cargo run --example lissajous_rollout --release
//! ```

use std::error::Error;

use ctrnn_core::{
    LissajousSource, ModelConfig, Predictor, Sequence, SequenceModel, TimeConstant, Trainer,
    TrainingConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Lissajous Closed-Loop Rollout ===\n");

    let sequence = Sequence::from_source(&LissajousSource::new(40, 0.8)?)?;

    let time_constant = TimeConstant::grouped(&[(6, 2.0), (6, 12.0)])?;
    let model_config = ModelConfig::new(2, 12, 2, 2.0)
        .with_time_constant(time_constant)
        .with_seed(3);
    let mut model = SequenceModel::new(model_config)?;

    let training_config = TrainingConfig {
        log_every: 250,
        ..TrainingConfig::new(1500, 0.01)
    };
    let report = Trainer::new(training_config)?.train(&mut model, &sequence)?;
    if let Some(last) = report.final_loss() {
        println!("Final training loss: {:.6}\n", last);
    }

    let rollout = Predictor::new(&mut model).rollout(sequence.last_target(), 80)?;
    println!("Closed-loop trajectory (every 8th step):");
    for (step, point) in rollout.iter().enumerate().step_by(8) {
        println!("  {:>3}: ({:+.3}, {:+.3})", step, point[0], point[1]);
    }

    println!("\nFeedback  Squared error");
    for feedback in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let replay = Predictor::new(&mut model).replay(&sequence, feedback)?;
        println!("  {:>4.2}    {:.6}", feedback, replay.squared_error);
    }

    Ok(())
}
