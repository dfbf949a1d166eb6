//! Configuration management
//!
//! Provides unified configuration for the WGAN-GP pipeline, loadable from
//! TOML or JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{CriticConfig, GeneratorConfig};
use crate::training::{NonFinitePolicy, TrainingConfig};
use super::checkpoint::CheckpointKey;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingSection,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset tag used as the checkpoint key
    pub dataset: String,
    /// Path to the `.npy` sample file
    pub data_path: String,
    /// Batch size
    pub batch_size: usize,
    /// Spatial size of the square samples (must be divisible by 4)
    pub image_size: i64,
    /// Number of sample channels
    pub channels: i64,
    /// Normalize raw samples per channel into [-1, 1] before training
    pub normalize: bool,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Latent dimension size
    pub latent_dim: i64,
    /// Width of the generator's first dense layer
    pub gen_fc_width: i64,
    /// Channels of the generator's initial feature map
    pub gen_base_channels: i64,
    /// Channels of the critic's first convolution
    pub critic_base_channels: i64,
    /// Width of the critic's dense layer
    pub critic_fc_width: i64,
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSection {
    /// Number of epochs
    pub epochs: usize,
    /// Generator learning rate
    pub gen_lr: f64,
    /// Critic learning rate
    pub critic_lr: f64,
    /// Adam beta1 for both optimizers
    pub beta1: f64,
    /// Adam beta2 for both optimizers
    pub beta2: f64,
    /// Critic updates per generator update
    pub critic_steps: usize,
    /// Gradient penalty weight
    pub gp_lambda: f64,
    /// Log progress every N iterations
    pub log_every: usize,
    /// Behavior on non-finite losses: "warn" or "abort"
    pub non_finite: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
    /// Fixed seed for noise draws and weight init, if any
    pub seed: Option<u64>,
    /// Checkpoint store root directory
    pub checkpoint_dir: String,
    /// Directory for generated-sample dumps
    pub result_dir: String,
    /// Stage index of a staged/repeated run
    pub stage: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                dataset: "samples".to_string(),
                data_path: "data/samples.npy".to_string(),
                batch_size: 64,
                image_size: 32,
                channels: 1,
                normalize: true,
            },
            model: ModelConfig {
                latent_dim: 62,
                gen_fc_width: 1024,
                gen_base_channels: 128,
                critic_base_channels: 64,
                critic_fc_width: 1024,
            },
            training: TrainingSection {
                epochs: 100,
                gen_lr: 2e-4,
                critic_lr: 2e-4,
                beta1: 0.5,
                beta2: 0.999,
                critic_steps: 5,
                gp_lambda: 10.0,
                log_every: 20,
                non_finite: "warn".to_string(),
                device: "cpu".to_string(),
                seed: None,
                checkpoint_dir: "checkpoints".to_string(),
                result_dir: "results".to_string(),
                stage: 0,
            },
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_toml(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_toml(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_json(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Parse the non-finite-loss policy
    pub fn non_finite_policy(&self) -> anyhow::Result<NonFinitePolicy> {
        match self.training.non_finite.to_lowercase().as_str() {
            "warn" => Ok(NonFinitePolicy::Warn),
            "abort" => Ok(NonFinitePolicy::Abort),
            other => anyhow::bail!("unknown non_finite policy: {other} (expected warn or abort)"),
        }
    }

    /// Generator configuration derived from the data and model sections
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            latent_dim: self.model.latent_dim,
            channels: self.data.channels,
            image_size: self.data.image_size,
            fc_width: self.model.gen_fc_width,
            base_channels: self.model.gen_base_channels,
        }
    }

    /// Critic configuration derived from the data and model sections
    pub fn critic_config(&self) -> CriticConfig {
        CriticConfig {
            channels: self.data.channels,
            image_size: self.data.image_size,
            base_channels: self.model.critic_base_channels,
            fc_width: self.model.critic_fc_width,
        }
    }

    /// Trainer configuration derived from the training section
    pub fn training_config(&self) -> anyhow::Result<TrainingConfig> {
        Ok(TrainingConfig {
            epochs: self.training.epochs,
            gen_lr: self.training.gen_lr,
            critic_lr: self.training.critic_lr,
            beta1: self.training.beta1,
            beta2: self.training.beta2,
            critic_steps: self.training.critic_steps,
            gp_lambda: self.training.gp_lambda,
            log_every: self.training.log_every,
            non_finite: self.non_finite_policy()?,
        })
    }

    /// Checkpoint key identifying this run
    pub fn checkpoint_key(&self) -> CheckpointKey {
        CheckpointKey::new(self.data.dataset.clone(), self.training.stage)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.data.batch_size == 0 {
            anyhow::bail!("Batch size must be > 0");
        }
        if self.data.image_size <= 0 || self.data.image_size % 4 != 0 {
            anyhow::bail!("Image size must be positive and divisible by 4");
        }
        if self.data.channels <= 0 {
            anyhow::bail!("Channel count must be > 0");
        }
        if self.model.latent_dim <= 0 {
            anyhow::bail!("Latent dimension must be > 0");
        }
        if self.training.epochs == 0 {
            anyhow::bail!("Number of epochs must be > 0");
        }
        if self.training.critic_steps == 0 {
            anyhow::bail!("critic_steps must be > 0");
        }
        if self.training.gp_lambda < 0.0 {
            anyhow::bail!("gp_lambda must be >= 0");
        }
        self.non_finite_policy()?;
        Ok(())
    }
}

/// Load the configuration file, creating it with defaults if absent
pub fn ensure_config_exists(path: &Path) -> anyhow::Result<Config> {
    let is_toml = path.extension().map_or(false, |ext| ext == "toml");
    if path.exists() {
        if is_toml {
            Config::from_toml(path)
        } else {
            Config::from_json(path)
        }
    } else {
        let config = Config::default();
        if is_toml {
            config.save_toml(path)?;
        } else {
            config.save_json(path)?;
        }
        Ok(config)
    }
}
