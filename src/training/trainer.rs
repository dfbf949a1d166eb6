//! Training loop implementation for WGAN-GP
//!
//! Drives the alternating update schedule: the critic is updated once per
//! iteration, the generator once every `critic_steps` iterations, with the
//! gradient penalty folded into the critic loss.

use std::time::Instant;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tch::{Device, Kind, Tensor};
use tracing::{info, warn};

use crate::data::DataLoader;
use crate::model::WganGp;
use crate::utils::{CheckpointKey, CheckpointStore};

use super::history::TrainingHistory;
use super::losses::{critic_loss, generator_loss, gradient_penalty};
use super::noise::NoiseSource;

/// What to do when a loss becomes non-finite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonFinitePolicy {
    /// Report and continue training
    Warn,
    /// Abort the run
    Abort,
}

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Learning rate for the generator
    pub gen_lr: f64,
    /// Learning rate for the critic
    pub critic_lr: f64,
    /// Adam beta1 for both optimizers
    pub beta1: f64,
    /// Adam beta2 for both optimizers
    pub beta2: f64,
    /// Critic updates per generator update (n_critic)
    pub critic_steps: usize,
    /// Gradient penalty weight (lambda)
    pub gp_lambda: f64,
    /// Log progress every N iterations
    pub log_every: usize,
    /// Behavior on non-finite losses
    pub non_finite: NonFinitePolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            gen_lr: 2e-4,
            critic_lr: 2e-4,
            beta1: 0.5,
            beta2: 0.999,
            critic_steps: 5,
            gp_lambda: 10.0,
            log_every: 20,
            non_finite: NonFinitePolicy::Warn,
        }
    }
}

/// WGAN-GP trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    store: CheckpointStore,
    key: CheckpointKey,
    history: TrainingHistory,
    critic_updates: usize,
    generator_updates: usize,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(
        config: TrainingConfig,
        device: Device,
        store: CheckpointStore,
        key: CheckpointKey,
    ) -> Self {
        Self {
            config,
            device,
            store,
            key,
            history: TrainingHistory::new(),
            critic_updates: 0,
            generator_updates: 0,
        }
    }

    /// Train the model
    ///
    /// Runs the full epoch count, then persists both networks under the
    /// canonical and the stage-tagged checkpoint keys and flushes the
    /// training history. Persistence happens only here, at the very end of
    /// the run; an interrupted run keeps nothing.
    ///
    /// # Arguments
    ///
    /// * `model` - WGAN-GP model to train
    /// * `loader` - Data source yielding (sample, label) batches
    /// * `noise` - Noise source for latent and interpolation draws
    ///
    /// # Returns
    ///
    /// The accumulated training history
    pub fn train(
        &mut self,
        model: &mut WganGp,
        loader: &mut DataLoader,
        noise: &mut NoiseSource,
    ) -> anyhow::Result<&TrainingHistory> {
        let num_batches = loader.num_batches();
        if num_batches == 0 {
            bail!(
                "data source yields no complete batches ({} samples, batch size {})",
                loader.num_samples(),
                loader.batch_size()
            );
        }

        let mut gen_opt = model.gen_optimizer(self.config.gen_lr, self.config.beta1, self.config.beta2)?;
        let mut critic_opt =
            model.critic_optimizer(self.config.critic_lr, self.config.beta1, self.config.beta2)?;

        info!(
            "Starting training for {} epochs, {} batches per epoch, critic_steps={}",
            self.config.epochs, num_batches, self.config.critic_steps
        );

        let start = Instant::now();
        // Sentinel until the first generator update; never logged as a value.
        let mut g_loss_val = f64::NAN;

        for epoch in 0..self.config.epochs {
            let epoch_start = Instant::now();

            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("##-"),
            );

            for (iter, (batch, _labels)) in loader.iter().enumerate() {
                let real = Tensor::try_from(batch)
                    .context("failed to convert sample batch to tensor")?
                    .to_kind(Kind::Float)
                    .to_device(self.device);
                let batch_size = real.size()[0];
                let z = noise.latent(batch_size, self.device);

                // ========== Critic update (every iteration) ==========
                critic_opt.zero_grad();

                let real_scores = model.critic.forward_t(&real, true);
                let fake = model.generator.forward_t(&z, true);
                let fake_scores = model.critic.forward_t(&fake.detach(), true);

                let alpha = noise.interpolation(batch_size, self.device);
                let penalty =
                    gradient_penalty(&model.critic, &real, &fake, &alpha, self.config.gp_lambda);
                let d_loss = critic_loss(&real_scores, &fake_scores) + penalty;

                d_loss.backward();
                critic_opt.step();
                self.critic_updates += 1;

                let d_loss_val = d_loss.double_value(&[]);
                self.check_finite("D_loss", d_loss_val, epoch, iter)?;

                // ========== Generator update (every critic_steps-th iteration) ==========
                if (iter + 1) % self.config.critic_steps == 0 {
                    gen_opt.zero_grad();

                    // Fresh forward pass; the critic scores it but takes no step.
                    let fake = model.generator.forward_t(&z, true);
                    let fake_scores = model.critic.forward_t(&fake, true);
                    let g_loss = generator_loss(&fake_scores);

                    g_loss.backward();
                    gen_opt.step();
                    self.generator_updates += 1;

                    g_loss_val = g_loss.double_value(&[]);
                    self.check_finite("G_loss", g_loss_val, epoch, iter)?;
                    self.history.record_update(d_loss_val, g_loss_val);
                }

                if (iter + 1) % self.config.log_every == 0 {
                    if g_loss_val.is_nan() {
                        info!(
                            "Epoch {}/{} [{}/{}] D_loss: {:.6} (no generator update yet)",
                            epoch + 1,
                            self.config.epochs,
                            iter + 1,
                            num_batches,
                            d_loss_val
                        );
                    } else {
                        info!(
                            "Epoch {}/{} [{}/{}] D_loss: {:.6}, G_loss: {:.6}",
                            epoch + 1,
                            self.config.epochs,
                            iter + 1,
                            num_batches,
                            d_loss_val,
                            g_loss_val
                        );
                    }
                }

                pb.set_message(format!("D: {:.4}", d_loss_val));
                pb.inc(1);
            }

            pb.finish_and_clear();

            let epoch_time = epoch_start.elapsed().as_secs_f64();
            self.history.record_epoch_time(epoch_time);
            info!(
                "Epoch {}/{} finished in {:.2}s",
                epoch + 1,
                self.config.epochs,
                epoch_time
            );
        }

        self.history.set_total_time(start.elapsed().as_secs_f64());
        info!(
            "Avg one epoch time: {:.2}s, total {} epochs time: {:.2}s",
            self.history.mean_epoch_time().unwrap_or(0.0),
            self.config.epochs,
            self.history.total_time.unwrap_or(0.0)
        );

        info!("Training finished, saving results");
        self.store.save_latest(model, &self.key)?;
        self.store.save_stage(model, &self.key)?;
        self.store.save_history(&self.history, &self.key)?;

        Ok(&self.history)
    }

    fn check_finite(&self, name: &str, value: f64, epoch: usize, iter: usize) -> anyhow::Result<()> {
        if value.is_finite() {
            return Ok(());
        }
        match self.config.non_finite {
            NonFinitePolicy::Warn => {
                warn!(
                    "{} is non-finite ({}) at epoch {} iteration {}; training continues",
                    name,
                    value,
                    epoch + 1,
                    iter + 1
                );
                Ok(())
            }
            NonFinitePolicy::Abort => bail!(
                "{} is non-finite ({}) at epoch {} iteration {}",
                name,
                value,
                epoch + 1,
                iter + 1
            ),
        }
    }

    /// Get the accumulated history
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Number of critic optimizer steps taken
    pub fn critic_updates(&self) -> usize {
        self.critic_updates
    }

    /// Number of generator optimizer steps taken
    pub fn generator_updates(&self) -> usize {
        self.generator_updates
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleDataset;
    use crate::model::{CriticConfig, GeneratorConfig};
    use ndarray::Array4;

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

    fn small_loader(num_samples: usize, batch_size: usize) -> DataLoader {
        let samples = Array4::<f32>::zeros((num_samples, 1, 16, 16));
        DataLoader::new(SampleDataset::from_samples(samples), batch_size, true, true)
    }

    fn quick_config(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            log_every: 1000,
            ..Default::default()
        }
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.critic_steps, 5);
        assert_eq!(config.gp_lambda, 10.0);
        assert_eq!(config.non_finite, NonFinitePolicy::Warn);
    }

    #[test]
    fn test_update_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let key = CheckpointKey::new("test", 0);

        let mut model = small_model();
        // 10 complete batches per epoch
        let mut loader = small_loader(40, 4);
        let mut noise = NoiseSource::new(8, Some(3));

        let mut trainer = Trainer::new(quick_config(1), Device::Cpu, store, key);
        let history = trainer.train(&mut model, &mut loader, &mut noise).unwrap();

        assert_eq!(history.num_updates(), 2); // floor(10 / 5)
        assert_eq!(history.d_losses.len(), 2);
        assert_eq!(history.per_epoch_time.len(), 1);
        assert!(history.total_time.is_some());
        assert_eq!(trainer.critic_updates(), 10);
        assert_eq!(trainer.generator_updates(), 2);
    }

    #[test]
    fn test_end_to_end_persists_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let key = CheckpointKey::new("e2e", 1);

        let mut model = small_model();
        let mut loader = small_loader(20, 4); // 5 batches
        let mut noise = NoiseSource::new(8, Some(9));

        let mut trainer = Trainer::new(quick_config(1), Device::Cpu, store, key.clone());
        trainer.train(&mut model, &mut loader, &mut noise).unwrap();

        let store = CheckpointStore::new(dir.path());
        assert!(store.generator_path(&key).exists());
        assert!(store.critic_path(&key).exists());
        assert!(store.stage_generator_path(&key).exists());
        assert!(store.stage_critic_path(&key).exists());
        assert!(store.history_path(&key).exists());

        let mut reloaded = small_model();
        store.load_latest(&mut reloaded, &key).unwrap();
        let history = store.load_history(&key).unwrap();
        assert_eq!(history.num_updates(), 1); // floor(5 / 5)
    }

    #[test]
    fn test_empty_data_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let key = CheckpointKey::new("empty", 0);

        let mut model = small_model();
        // 3 samples with batch size 4 and drop_last: zero complete batches
        let mut loader = small_loader(3, 4);
        let mut noise = NoiseSource::new(8, Some(1));

        let mut trainer = Trainer::new(quick_config(1), Device::Cpu, store, key);
        assert!(trainer.train(&mut model, &mut loader, &mut noise).is_err());
    }
}
