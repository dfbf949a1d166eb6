//! Utility module with configuration and persistence helpers
//!
//! This module provides:
//! - Configuration handling (TOML/JSON)
//! - Checkpoint store resolving structured keys to snapshot files
//! - Per-sample text dumps of generated output

mod checkpoint;
mod config;
mod export;

pub use checkpoint::{CheckpointKey, CheckpointStore, RunMeta};
pub use config::{ensure_config_exists, Config, DataConfig, ModelConfig, TrainingSection};
pub use export::{write_sample_dumps, DumpWindow};
