//! Training data: synthetic signal sources and one-step-ahead sequences.

pub mod sequence;
pub mod signal;

pub use sequence::{Sequence, TrainingPair};
pub use signal::{build_source, LissajousSource, SineSource, TimeSeriesSource};
