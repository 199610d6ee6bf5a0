//! Sine Prediction Demo
//!
//! Trains a leaky-integrator network on a noisy sine wave, then lets it keep
//! running in closed loop past the last sample and exports the loss curve and
//! the generated series as JSON.
//!
//! Run with:
//! ```
//! cargo run --example sine_prediction --release -- [config/ctrnn.toml]
//! ```
//!
//! Set `RUST_LOG=debug` for per-epoch diagnostics.

use std::error::Error;
use std::path::Path;

use ctrnn_core::{
    build_source, write_series, Checkpointable, Predictor, RunConfig, RunLog, Sequence,
    SequenceModel, SeriesExport, Trainer,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/ctrnn.toml";

fn load_config() -> Result<RunConfig, Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    if Path::new(&path).exists() {
        tracing::info!("Loading configuration from {}", path);
        Ok(RunConfig::load_from_file(&path)?)
    } else {
        tracing::warn!("{} not found, using defaults", path);
        Ok(RunConfig::default())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Leaky-Integrator Sine Prediction ===\n");

    let config = load_config()?;
    println!("Configuration:");
    println!(
        "  Model: {} -> {} -> {} ({:?})",
        config.model.n_in, config.model.n_hidden, config.model.n_out, config.model.time_constant
    );
    println!(
        "  Training: {} epochs, lr {}, {:?}",
        config.training.epochs, config.training.learning_rate, config.training.optimizer
    );
    println!(
        "  Signal: {:?}, period {}, noise {}\n",
        config.signal.kind, config.signal.period, config.signal.noise_std
    );

    let source = build_source(&config.signal)?;
    let sequence = Sequence::from_source(source.as_ref())?;
    let run_log = RunLog::new(&config.output.log_dir)?;

    let mut model = SequenceModel::new(config.model.clone())?;
    let mut trainer = Trainer::new(config.training.clone())?.with_run_log(run_log.clone());
    let report = trainer.train(&mut model, &sequence)?;

    if let (Some(first), Some(last)) = (report.first_loss(), report.final_loss()) {
        println!("Loss: {:.6} -> {:.6}", first, last);
    }
    if let Some(best) = report.best_epoch {
        println!("Best epoch: {}", best + 1);
    }

    // Closed loop picks up from the hidden state left by the final epoch.
    let rollout =
        Predictor::new(&mut model).rollout(sequence.last_target(), config.rollout.steps)?;
    run_log.log_rollout(&rollout)?;

    let preview: Vec<String> = rollout
        .scalars()
        .iter()
        .take(10)
        .map(|y| format!("{:+.3}", y))
        .collect();
    println!("Rollout (first 10): {}", preview.join(" "));

    let replay = Predictor::new(&mut model).replay(&sequence, 0.0)?;
    println!("Teacher-forced squared error: {:.6}", replay.squared_error);

    let series_path = config.output.log_dir.join("series.json");
    write_series(&series_path, &SeriesExport::new(&report.loss_history, &rollout))?;
    model.save_checkpoint(config.output.log_dir.join("model.bin"))?;

    println!("\nOutputs written to {}", config.output.log_dir.display());
    Ok(())
}
