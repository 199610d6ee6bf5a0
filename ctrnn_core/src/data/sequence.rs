//! One-step-ahead training pairs derived from a sample sequence.

use ndarray::Array1;

use crate::data::signal::TimeSeriesSource;
use crate::error::{CtrnnError, CtrnnResult};

/// Input at time `t` and the sample at `t + 1` it should predict.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub input: Array1<f32>,
    pub target: Array1<f32>,
}

/// Immutable, ordered list of teacher-forcing pairs.
///
/// # Examples
///
/// ```
/// use ctrnn_core::Sequence;
///
/// let sequence = Sequence::from_scalars(&[0.0, 0.5, 1.0]).unwrap();
/// assert_eq!(sequence.len(), 2);
/// assert_eq!(sequence.pairs()[1].target[0], 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pairs: Vec<TrainingPair>,
    dimension: usize,
}

impl Sequence {
    /// Pairs sample `i` with sample `i + 1` for `i in 0..len - 1`.
    pub fn from_samples(samples: &[Array1<f32>]) -> CtrnnResult<Self> {
        if samples.len() < 2 {
            return Err(CtrnnError::empty_sequence(
                "at least two samples are needed to form a training pair",
            ));
        }

        let dimension = samples[0].len();
        if dimension == 0 {
            return Err(CtrnnError::invalid_config(
                "sample dimension",
                0,
                "must be positive",
            ));
        }
        for sample in samples {
            if sample.len() != dimension {
                return Err(CtrnnError::dimension_mismatch(
                    dimension,
                    sample.len(),
                    "sequence sample",
                ));
            }
            if let Some(&value) = sample.iter().find(|v| !v.is_finite()) {
                return Err(CtrnnError::invalid_config(
                    "sequence sample",
                    value,
                    "must be finite",
                ));
            }
        }

        let pairs = samples
            .windows(2)
            .map(|window| TrainingPair {
                input: window[0].clone(),
                target: window[1].clone(),
            })
            .collect();

        Ok(Self { pairs, dimension })
    }

    /// Scalar samples, one component each.
    pub fn from_scalars(values: &[f32]) -> CtrnnResult<Self> {
        let samples: Vec<_> = values.iter().map(|&v| Array1::from_elem(1, v)).collect();
        Self::from_samples(&samples)
    }

    pub fn from_source(source: &dyn TimeSeriesSource) -> CtrnnResult<Self> {
        Self::from_samples(&source.samples())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Components per input (and per target).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn pairs(&self) -> &[TrainingPair] {
        &self.pairs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrainingPair> {
        self.pairs.iter()
    }

    /// First input; the natural seed for a closed-loop rollout.
    pub fn first_input(&self) -> &Array1<f32> {
        &self.pairs[0].input
    }

    /// Last sample of the series; the input that follows a full training pass.
    pub fn last_target(&self) -> &Array1<f32> {
        &self.pairs[self.pairs.len() - 1].target
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a TrainingPair;
    type IntoIter = std::slice::Iter<'a, TrainingPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
