//! Synthetic signal sources that feed the trainer.

use std::f64::consts::PI;

use ndarray::Array1;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::config::{SignalConfig, SignalKind};
use crate::error::{CtrnnError, CtrnnResult};

/// Producer of a finite, ordered sequence of samples.
pub trait TimeSeriesSource {
    /// Number of components per sample.
    fn dimension(&self) -> usize;

    /// The full sample sequence, in time order.
    fn samples(&self) -> Vec<Array1<f32>>;
}

/// Noisy sine wave sampled at `x = 0..=2T`:
/// `amplitude * sin(2 pi x / T) + N(0, noise_std)`.
#[derive(Debug, Clone)]
pub struct SineSource {
    period: usize,
    amplitude: f32,
    noise: Option<Normal<f32>>,
    seed: u64,
}

impl SineSource {
    pub fn new(period: usize, amplitude: f32, noise_std: f32, seed: u64) -> CtrnnResult<Self> {
        if period == 0 {
            return Err(CtrnnError::invalid_config("period", period, "must be positive"));
        }
        if !amplitude.is_finite() {
            return Err(CtrnnError::invalid_config(
                "amplitude",
                amplitude,
                "must be finite",
            ));
        }
        if !noise_std.is_finite() || noise_std < 0.0 {
            return Err(CtrnnError::invalid_config(
                "noise_std",
                noise_std,
                "must be finite and non-negative",
            ));
        }

        let noise = if noise_std > 0.0 {
            let normal = Normal::new(0.0, noise_std)
                .map_err(|err| CtrnnError::invalid_config("noise_std", noise_std, err.to_string()))?;
            Some(normal)
        } else {
            None
        };

        Ok(Self {
            period,
            amplitude,
            noise,
            seed,
        })
    }

    /// Noise-free wave.
    pub fn clean(period: usize, amplitude: f32) -> CtrnnResult<Self> {
        Self::new(period, amplitude, 0.0, 0)
    }

    /// Underlying scalar values.
    pub fn values(&self) -> Vec<f32> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        let period = self.period as f64;

        (0..=2 * self.period)
            .map(|x| {
                let clean = self.amplitude * (2.0 * PI * x as f64 / period).sin() as f32;
                match &self.noise {
                    Some(normal) => clean + normal.sample(&mut rng),
                    None => clean,
                }
            })
            .collect()
    }
}

impl Default for SineSource {
    fn default() -> Self {
        Self {
            period: 100,
            amplitude: 0.8,
            noise: Normal::new(0.0, 0.02).ok(),
            seed: 7,
        }
    }
}

impl TimeSeriesSource for SineSource {
    fn dimension(&self) -> usize {
        1
    }

    fn samples(&self) -> Vec<Array1<f32>> {
        self.values()
            .into_iter()
            .map(|v| Array1::from_elem(1, v))
            .collect()
    }
}

/// Closed 2-D Lissajous figure with a 1:2 frequency ratio:
/// `(a sin(2 pi i / n), a sin(4 pi i / n))` for `i in 0..n`.
#[derive(Debug, Clone)]
pub struct LissajousSource {
    points: usize,
    amplitude: f32,
}

impl LissajousSource {
    pub fn new(points: usize, amplitude: f32) -> CtrnnResult<Self> {
        if points < 2 {
            return Err(CtrnnError::invalid_config("points", points, "must be at least 2"));
        }
        if !amplitude.is_finite() {
            return Err(CtrnnError::invalid_config(
                "amplitude",
                amplitude,
                "must be finite",
            ));
        }
        Ok(Self { points, amplitude })
    }
}

impl Default for LissajousSource {
    fn default() -> Self {
        Self {
            points: 20,
            amplitude: 0.8,
        }
    }
}

impl TimeSeriesSource for LissajousSource {
    fn dimension(&self) -> usize {
        2
    }

    fn samples(&self) -> Vec<Array1<f32>> {
        let n = self.points as f64;
        (0..self.points)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / n;
                Array1::from_vec(vec![
                    self.amplitude * phase.sin() as f32,
                    self.amplitude * (2.0 * phase).sin() as f32,
                ])
            })
            .collect()
    }
}

/// Builds the source described by a `[signal]` configuration section.
pub fn build_source(config: &SignalConfig) -> CtrnnResult<Box<dyn TimeSeriesSource>> {
    match config.kind {
        SignalKind::Sine => Ok(Box::new(SineSource::new(
            config.period,
            config.amplitude,
            config.noise_std,
            config.seed,
        )?)),
        SignalKind::Lissajous => Ok(Box::new(LissajousSource::new(
            config.period,
            config.amplitude,
        )?)),
    }
}
