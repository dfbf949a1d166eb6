//! Training history for WGAN-GP runs
//!
//! Append-only record of scalar losses (taken at generator-update
//! boundaries) and per-epoch wall-clock timing, flushed to the persistence
//! sink at the end of a run.

use std::path::Path;

/// Losses and timing accumulated across a training run
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    /// Critic losses, one per generator update
    pub d_losses: Vec<f64>,
    /// Generator losses, one per generator update
    pub g_losses: Vec<f64>,
    /// Wall-clock seconds per epoch
    pub per_epoch_time: Vec<f64>,
    /// Total wall-clock seconds for the run
    pub total_time: Option<f64>,
}

impl TrainingHistory {
    /// Create new empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record both losses at a generator-update boundary
    pub fn record_update(&mut self, d_loss: f64, g_loss: f64) {
        self.d_losses.push(d_loss);
        self.g_losses.push(g_loss);
    }

    /// Record one epoch's wall-clock duration in seconds
    pub fn record_epoch_time(&mut self, seconds: f64) {
        self.per_epoch_time.push(seconds);
    }

    /// Record the total run duration in seconds
    pub fn set_total_time(&mut self, seconds: f64) {
        self.total_time = Some(seconds);
    }

    /// Number of recorded generator updates
    pub fn num_updates(&self) -> usize {
        self.g_losses.len()
    }

    /// Latest critic loss
    pub fn latest_d_loss(&self) -> Option<f64> {
        self.d_losses.last().copied()
    }

    /// Latest generator loss
    pub fn latest_g_loss(&self) -> Option<f64> {
        self.g_losses.last().copied()
    }

    /// Mean wall-clock seconds per epoch
    pub fn mean_epoch_time(&self) -> Option<f64> {
        if self.per_epoch_time.is_empty() {
            None
        } else {
            Some(self.per_epoch_time.iter().sum::<f64>() / self.per_epoch_time.len() as f64)
        }
    }

    /// Save loss records to a CSV file
    ///
    /// Timing is not part of the CSV; the checkpoint store persists it in
    /// the run metadata.
    pub fn save_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["update", "d_loss", "g_loss"])?;

        for i in 0..self.num_updates() {
            writer.write_record([
                (i + 1).to_string(),
                self.d_losses[i].to_string(),
                self.g_losses[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load loss records from a CSV file written by [`Self::save_csv`]
    pub fn load_csv(path: &Path) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut history = Self::new();

        for result in reader.records() {
            let record = result?;
            history.d_losses.push(record[1].parse()?);
            history.g_losses.push(record[2].parse()?);
        }

        Ok(history)
    }
}
