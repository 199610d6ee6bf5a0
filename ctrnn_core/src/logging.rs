//! JSON line-delimited run logs and series export.
//!
//! Human-facing diagnostics go through `tracing`; this module writes the
//! machine-readable side: one JSON object per epoch or rollout step.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::predictor::Rollout;
use crate::training::EpochMetrics;

const TRAINING_LOG: &str = "training.jsonl";
const ROLLOUT_LOG: &str = "rollout.jsonl";

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochLogEntry {
    pub epoch: usize,
    pub loss: f32,
    pub gradient_norm: f32,
    pub learning_rate: f32,
    pub timestamp_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutLogEntry {
    pub step: usize,
    pub output: Vec<f32>,
    pub timestamp_ms: u128,
}

/// Append-only JSON-lines log rooted at a directory.
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    /// Creates the directory if needed.
    pub fn new<P: Into<PathBuf>>(dir: P) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn training_path(&self) -> PathBuf {
        self.dir.join(TRAINING_LOG)
    }

    pub fn rollout_path(&self) -> PathBuf {
        self.dir.join(ROLLOUT_LOG)
    }

    pub fn log_epoch(&self, metrics: &EpochMetrics) -> io::Result<()> {
        let entry = EpochLogEntry {
            epoch: metrics.epoch,
            loss: metrics.loss,
            gradient_norm: metrics.gradient_norm,
            learning_rate: metrics.learning_rate,
            timestamp_ms: timestamp_ms(),
        };
        append_json_line(self.training_path(), &entry)
    }

    pub fn log_rollout(&self, rollout: &Rollout) -> io::Result<()> {
        let path = self.rollout_path();
        for (step, output) in rollout.iter().enumerate() {
            let entry = RolloutLogEntry {
                step,
                output: output.to_vec(),
                timestamp_ms: timestamp_ms(),
            };
            append_json_line(&path, &entry)?;
        }
        Ok(())
    }
}

/// Loss curve and rollout in one document, for an external plotting tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesExport {
    pub loss_history: Vec<f32>,
    pub rollout: Vec<Vec<f32>>,
}

impl SeriesExport {
    pub fn new(loss_history: &[f32], rollout: &Rollout) -> Self {
        Self {
            loss_history: loss_history.to_vec(),
            rollout: rollout.iter().map(|output| output.to_vec()).collect(),
        }
    }
}

/// Writes `series` as pretty-printed JSON, creating parent directories.
pub fn write_series<P: AsRef<Path>>(path: P, series: &SeriesExport) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, series)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    writer.flush()
}
