//! Training module for WGAN-GP
//!
//! This module provides:
//! - Training loop implementation with the asymmetric update schedule
//! - Wasserstein loss functions and the gradient penalty
//! - Injectable noise source for latent and interpolation draws
//! - Training history (losses and timing)

mod history;
mod losses;
mod noise;
mod trainer;

pub use history::TrainingHistory;
pub use losses::{critic_loss, generator_loss, gradient_penalty};
pub use noise::NoiseSource;
pub use trainer::{NonFinitePolicy, Trainer, TrainingConfig};
