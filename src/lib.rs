//! # WGAN-GP for image-like sample synthesis
//!
//! This crate provides a modular implementation of a Wasserstein GAN with
//! gradient penalty: a generator and a critic trained adversarially with an
//! asymmetric update schedule and a Lipschitz-enforcing penalty term.
//!
//! ## Modules
//!
//! - `data`: Sample dataset, normalization and batching
//! - `model`: Generator and Critic networks and the WganGp wrapper
//! - `training`: Training loop, losses, gradient penalty and noise source
//! - `utils`: Configuration, checkpoint store and sample export

pub mod data;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{DataLoader, SampleDataset};
pub use model::{Critic, CriticConfig, Generator, GeneratorConfig, WganGp};
pub use training::{
    critic_loss, generator_loss, gradient_penalty, NoiseSource, Trainer, TrainingConfig,
    TrainingHistory,
};
pub use utils::{write_sample_dumps, CheckpointKey, CheckpointStore, Config, DumpWindow};
