//! WGAN-GP wrapper combining Generator and Critic
//!
//! Owns the two variable stores so each network's parameters stay exclusive
//! to it, and builds the per-network Adam optimizers.

use std::path::Path;

use anyhow::Context;
use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Tensor};

use super::critic::{Critic, CriticConfig};
use super::generator::{Generator, GeneratorConfig};

/// Complete WGAN-GP model
pub struct WganGp {
    /// Generator network
    pub generator: Generator,
    /// Critic network
    pub critic: Critic,
    /// Variable store for the generator
    pub gen_vs: VarStore,
    /// Variable store for the critic
    pub critic_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl WganGp {
    /// Create a new WGAN-GP model
    pub fn new(gen_config: GeneratorConfig, critic_config: CriticConfig, device: Device) -> Self {
        let gen_vs = VarStore::new(device);
        let critic_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config);
        let critic = Critic::new(&critic_vs.root(), critic_config);

        Self {
            generator,
            critic,
            gen_vs,
            critic_vs,
            device,
        }
    }

    /// Create a WGAN-GP with default layer widths for the given sample shape
    ///
    /// # Arguments
    ///
    /// * `image_size` - Spatial size of the square samples
    /// * `channels` - Number of sample channels
    /// * `latent_dim` - Size of the latent noise vector
    /// * `device` - Device to create the model on
    pub fn with_defaults(image_size: i64, channels: i64, latent_dim: i64, device: Device) -> Self {
        let gen_config = GeneratorConfig {
            latent_dim,
            channels,
            image_size,
            ..Default::default()
        };
        let critic_config = CriticConfig {
            channels,
            image_size,
            ..Default::default()
        };
        Self::new(gen_config, critic_config, device)
    }

    /// Generate samples from noise vectors, in evaluation mode
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (num_samples, latent_dim)
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, channels, image_size, image_size)
    pub fn generate(&self, noise: &Tensor) -> Tensor {
        tch::no_grad(|| self.generator.generate(&noise.to_device(self.device)))
    }

    /// Get generator optimizer (Adam)
    pub fn gen_optimizer(&self, lr: f64, beta1: f64, beta2: f64) -> anyhow::Result<nn::Optimizer> {
        nn::Adam { beta1, beta2, wd: 0.0 }
            .build(&self.gen_vs, lr)
            .context("failed to create generator optimizer")
    }

    /// Get critic optimizer (Adam)
    pub fn critic_optimizer(&self, lr: f64, beta1: f64, beta2: f64) -> anyhow::Result<nn::Optimizer> {
        nn::Adam { beta1, beta2, wd: 0.0 }
            .build(&self.critic_vs, lr)
            .context("failed to create critic optimizer")
    }

    /// Save both networks' parameter snapshots
    pub fn save(&self, gen_path: &Path, critic_path: &Path) -> anyhow::Result<()> {
        self.gen_vs
            .save(gen_path)
            .with_context(|| format!("failed to save generator to {}", gen_path.display()))?;
        self.critic_vs
            .save(critic_path)
            .with_context(|| format!("failed to save critic to {}", critic_path.display()))?;
        Ok(())
    }

    /// Load both networks' parameters from snapshots
    ///
    /// Fails immediately when a snapshot is missing or its parameter shapes
    /// do not match the configured networks.
    pub fn load(&mut self, gen_path: &Path, critic_path: &Path) -> anyhow::Result<()> {
        self.gen_vs.load(gen_path).with_context(|| {
            format!(
                "failed to load generator from {} (missing file or parameter shape mismatch)",
                gen_path.display()
            )
        })?;
        self.critic_vs.load(critic_path).with_context(|| {
            format!(
                "failed to load critic from {} (missing file or parameter shape mismatch)",
                critic_path.display()
            )
        })?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }

    /// Get sample spatial size
    pub fn image_size(&self) -> i64 {
        self.generator.config().image_size
    }

    /// Get sample channel count
    pub fn channels(&self) -> i64 {
        self.generator.config().channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    fn small_model() -> WganGp {
        let gen_config = GeneratorConfig {
            latent_dim: 8,
            channels: 1,
            image_size: 16,
            fc_width: 32,
            base_channels: 16,
        };
        let critic_config = CriticConfig {
            channels: 1,
            image_size: 16,
            base_channels: 8,
            fc_width: 32,
        };
        WganGp::new(gen_config, critic_config, Device::Cpu)
    }

    #[test]
    fn test_wgan_creation() {
        let model = small_model();
        assert_eq!(model.latent_dim(), 8);
        assert_eq!(model.image_size(), 16);
        assert_eq!(model.channels(), 1);
    }

    #[test]
    fn test_wgan_generate_shape() {
        let model = small_model();
        let noise = Tensor::rand([5, 8], (Kind::Float, Device::Cpu));
        let samples = model.generate(&noise);
        assert_eq!(samples.size(), vec![5, 1, 16, 16]);
    }

    #[test]
    fn test_save_mutate_reload_restores_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let gen_path = dir.path().join("generator.pt");
        let critic_path = dir.path().join("critic.pt");

        let mut model = small_model();
        model.save(&gen_path, &critic_path).unwrap();

        let snapshot: Vec<(String, Tensor)> = model
            .critic_vs
            .variables()
            .iter()
            .map(|(name, tensor)| (name.clone(), tensor.copy()))
            .collect();

        // One optimizer step mutates the critic's parameters in place.
        let mut opt = model.critic_optimizer(1e-2, 0.5, 0.999).unwrap();
        let input = Tensor::rand([4, 1, 16, 16], (Kind::Float, Device::Cpu));
        let loss = model.critic.forward_t(&input, true).mean(Kind::Float);
        opt.zero_grad();
        loss.backward();
        opt.step();

        let mutated = model
            .critic_vs
            .variables()
            .iter()
            .any(|(name, tensor)| {
                let (_, before) = snapshot.iter().find(|(n, _)| n == name).unwrap();
                !tensor.equal(before)
            });
        assert!(mutated, "optimizer step should change at least one parameter");

        model.load(&gen_path, &critic_path).unwrap();
        for (name, tensor) in model.critic_vs.variables().iter() {
            let (_, before) = snapshot.iter().find(|(n, _)| n == name).unwrap();
            assert!(tensor.equal(before), "parameter {name} not restored");
        }
    }

    #[test]
    fn test_load_rejects_mismatched_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let gen_path = dir.path().join("generator.pt");
        let critic_path = dir.path().join("critic.pt");

        let model = small_model();
        model.save(&gen_path, &critic_path).unwrap();

        let mut other = WganGp::with_defaults(32, 3, 62, Device::Cpu);
        assert!(other.load(&gen_path, &critic_path).is_err());
    }
}
