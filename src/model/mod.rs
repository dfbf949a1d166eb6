//! Model module containing the WGAN-GP networks
//!
//! This module provides:
//! - Generator network mapping latent noise to synthetic samples
//! - Critic network scoring samples with an unbounded scalar
//! - WganGp wrapper combining both networks

mod critic;
mod gan;
mod generator;

pub use critic::{Critic, CriticConfig};
pub use gan::WganGp;
pub use generator::{Generator, GeneratorConfig};

use tch::Tensor;

/// Leaky ReLU with an explicit negative slope.
pub(crate) fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}
