//! Recurrent network components.
//!
//! A [`SequenceModel`] is a [`LeakyCell`] feeding a [`Readout`]. Gradients are
//! derived by hand for the readout only; the optimizers in [`optimizer`]
//! apply them.

pub mod activation;
pub mod cell;
pub mod gradient;
pub mod linear;
pub mod loss;
pub mod model;
pub mod optimizer;
pub mod readout;

pub use activation::{squash, SQUASH_GAIN};
pub use cell::{LeakyCell, TimeConstant};
pub use gradient::ReadoutGradients;
pub use linear::Linear;
pub use loss::{squared_error, squared_error_with_gradient};
pub use model::{ModelParameters, SequenceModel};
pub use optimizer::{
    build_optimizer, AdamOptimizer, NamedParameter, Optimizer, OptimizerStateSnapshot,
    SgdOptimizer,
};
pub use readout::Readout;
