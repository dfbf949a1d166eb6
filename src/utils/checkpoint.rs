//! Checkpoint store
//!
//! Resolves structured checkpoint keys to on-disk snapshot files so the
//! training loop never formats paths itself. Every run persists under two
//! schemes: a canonical "latest" snapshot and a stage-tagged snapshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::WganGp;
use crate::training::TrainingHistory;

/// Identity of a training run within the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointKey {
    /// Dataset tag, e.g. "game_frames"
    pub dataset: String,
    /// Stage index of a staged/repeated run
    pub stage: usize,
}

impl CheckpointKey {
    /// Create a new key
    pub fn new(dataset: impl Into<String>, stage: usize) -> Self {
        Self {
            dataset: dataset.into(),
            stage,
        }
    }
}

/// Metadata persisted next to a run's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    /// Stage index of the run
    pub stage: usize,
    /// Final critic loss
    pub d_loss: Option<f64>,
    /// Final generator loss
    pub g_loss: Option<f64>,
    /// Wall-clock seconds per epoch
    pub per_epoch_time: Vec<f64>,
    /// Total wall-clock seconds
    pub total_time: Option<f64>,
    /// Timestamp of the save
    pub timestamp: String,
}

/// Persistence sink for parameter snapshots and training history
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, key: &CheckpointKey) -> PathBuf {
        self.root.join(&key.dataset)
    }

    /// Path of the canonical generator snapshot
    pub fn generator_path(&self, key: &CheckpointKey) -> PathBuf {
        self.run_dir(key).join("generator.pt")
    }

    /// Path of the canonical critic snapshot
    pub fn critic_path(&self, key: &CheckpointKey) -> PathBuf {
        self.run_dir(key).join("critic.pt")
    }

    /// Path of the stage-tagged generator snapshot
    pub fn stage_generator_path(&self, key: &CheckpointKey) -> PathBuf {
        self.run_dir(key).join(format!("generator_stage_{}.pt", key.stage))
    }

    /// Path of the stage-tagged critic snapshot
    pub fn stage_critic_path(&self, key: &CheckpointKey) -> PathBuf {
        self.run_dir(key).join(format!("critic_stage_{}.pt", key.stage))
    }

    /// Path of the training-history CSV
    pub fn history_path(&self, key: &CheckpointKey) -> PathBuf {
        self.run_dir(key).join("history.csv")
    }

    /// Path of the run metadata JSON
    pub fn meta_path(&self, key: &CheckpointKey) -> PathBuf {
        self.run_dir(key).join("run_meta.json")
    }

    fn ensure_run_dir(&self, key: &CheckpointKey) -> anyhow::Result<PathBuf> {
        let dir = self.run_dir(key);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Save both networks under the canonical key
    pub fn save_latest(&self, model: &WganGp, key: &CheckpointKey) -> anyhow::Result<()> {
        self.ensure_run_dir(key)?;
        model.save(&self.generator_path(key), &self.critic_path(key))?;
        tracing::info!("Saved latest snapshot to {}", self.run_dir(key).display());
        Ok(())
    }

    /// Load both networks from the canonical key
    pub fn load_latest(&self, model: &mut WganGp, key: &CheckpointKey) -> anyhow::Result<()> {
        model.load(&self.generator_path(key), &self.critic_path(key))
    }

    /// Save both networks under the stage-tagged key
    pub fn save_stage(&self, model: &WganGp, key: &CheckpointKey) -> anyhow::Result<()> {
        self.ensure_run_dir(key)?;
        model.save(&self.stage_generator_path(key), &self.stage_critic_path(key))?;
        tracing::info!(
            "Saved stage {} snapshot to {}",
            key.stage,
            self.run_dir(key).display()
        );
        Ok(())
    }

    /// Load both networks from the stage-tagged key
    pub fn load_stage(&self, model: &mut WganGp, key: &CheckpointKey) -> anyhow::Result<()> {
        model.load(&self.stage_generator_path(key), &self.stage_critic_path(key))
    }

    /// Flush the training history: loss CSV plus run metadata JSON
    pub fn save_history(
        &self,
        history: &TrainingHistory,
        key: &CheckpointKey,
    ) -> anyhow::Result<()> {
        self.ensure_run_dir(key)?;
        history.save_csv(&self.history_path(key))?;

        let meta = RunMeta {
            stage: key.stage,
            d_loss: history.latest_d_loss(),
            g_loss: history.latest_g_loss(),
            per_epoch_time: history.per_epoch_time.clone(),
            total_time: history.total_time,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        std::fs::write(self.meta_path(key), meta_json)?;

        tracing::info!("Saved training history to {}", self.history_path(key).display());
        Ok(())
    }

    /// Load the training history saved under a key
    pub fn load_history(&self, key: &CheckpointKey) -> anyhow::Result<TrainingHistory> {
        let mut history = TrainingHistory::load_csv(&self.history_path(key))?;

        let meta_path = self.meta_path(key);
        if meta_path.exists() {
            let meta = self.load_meta(key)?;
            history.per_epoch_time = meta.per_epoch_time;
            history.total_time = meta.total_time;
        }

        Ok(history)
    }

    /// Load the run metadata saved under a key
    pub fn load_meta(&self, key: &CheckpointKey) -> anyhow::Result<RunMeta> {
        let content = std::fs::read_to_string(self.meta_path(key))?;
        let meta: RunMeta = serde_json::from_str(&content)?;
        Ok(meta)
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CriticConfig, GeneratorConfig};
    use tch::Device;

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
    fn test_key_resolution() {
        let store = CheckpointStore::new("/tmp/ckpt");
        let key = CheckpointKey::new("frames", 3);

        assert_eq!(
            store.generator_path(&key),
            PathBuf::from("/tmp/ckpt/frames/generator.pt")
        );
        assert_eq!(
            store.stage_critic_path(&key),
            PathBuf::from("/tmp/ckpt/frames/critic_stage_3.pt")
        );
    }

    #[test]
    fn test_save_and_load_stage_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let key = CheckpointKey::new("frames", 2);

        let model = small_model();
        store.save_stage(&model, &key).unwrap();
        assert!(store.stage_generator_path(&key).exists());

        let mut reloaded = small_model();
        store.load_stage(&mut reloaded, &key).unwrap();
    }

    #[test]
    fn test_history_roundtrip_with_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let key = CheckpointKey::new("frames", 0);

        let mut history = TrainingHistory::new();
        history.record_update(0.5, -0.25);
        history.record_epoch_time(1.5);
        history.set_total_time(1.5);

        store.save_history(&history, &key).unwrap();

        let loaded = store.load_history(&key).unwrap();
        assert_eq!(loaded.d_losses, history.d_losses);
        assert_eq!(loaded.per_epoch_time, history.per_epoch_time);
        assert_eq!(loaded.total_time, Some(1.5));

        let meta = store.load_meta(&key).unwrap();
        assert_eq!(meta.stage, 0);
        assert_eq!(meta.g_loss, Some(-0.25));
    }

    #[test]
    fn test_load_latest_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let key = CheckpointKey::new("missing", 0);

        let mut model = small_model();
        assert!(store.load_latest(&mut model, &key).is_err());
    }
}
