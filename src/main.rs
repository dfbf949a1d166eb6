//! WGAN-GP for image-like sample synthesis
//!
//! Main entry point providing a CLI for:
//! - Training the WGAN-GP model
//! - Generating samples from a trained generator
//! - Initializing a default configuration file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wgan_gp::{
    data::{DataLoader, SampleDataset},
    model::WganGp,
    training::{NoiseSource, Trainer},
    utils::{ensure_config_exists, write_sample_dumps, CheckpointStore, Config, DumpWindow},
};

/// WGAN with gradient penalty for synthetic sample generation
#[derive(Parser)]
#[command(name = "wgan_gp")]
#[command(version = "0.1.0")]
#[command(about = "Train a WGAN-GP and generate synthetic samples")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the WGAN-GP model
    Train {
        /// Path to the `.npy` sample file (overrides config)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Number of epochs (overrides config)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Stage index of a staged run (overrides config)
        #[arg(long)]
        stage: Option<usize>,

        /// Generator snapshot to resume from
        #[arg(long)]
        resume_generator: Option<PathBuf>,

        /// Critic snapshot to resume from
        #[arg(long)]
        resume_critic: Option<PathBuf>,
    },

    /// Generate samples from a trained generator
    Generate {
        /// Number of samples to generate
        #[arg(short, long, default_value = "64")]
        num_samples: i64,

        /// Draw noise from the configured seed instead of entropy
        #[arg(long)]
        fixed: bool,

        /// Output directory (defaults to the configured result dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize a default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            data,
            epochs,
            stage,
            resume_generator,
            resume_critic,
        } => train(
            &cli.config,
            data,
            epochs,
            stage,
            resume_generator,
            resume_critic,
        ),
        Commands::Generate {
            num_samples,
            fixed,
            output,
        } => generate(&cli.config, num_samples, fixed, output),
        Commands::Init { output } => init_config(&output),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        if path.extension().map_or(false, |ext| ext == "toml") {
            Config::from_toml(path)?
        } else {
            Config::from_json(path)?
        }
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

/// Train the WGAN-GP model
fn train(
    config_path: &Path,
    data: Option<PathBuf>,
    epochs: Option<usize>,
    stage: Option<usize>,
    resume_generator: Option<PathBuf>,
    resume_critic: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(epochs) = epochs {
        config.training.epochs = epochs;
    }
    if let Some(stage) = stage {
        config.training.stage = stage;
    }
    let data_path = data.unwrap_or_else(|| PathBuf::from(&config.data.data_path));

    let device = config.get_device();
    info!("Using device: {:?}", device);

    if let Some(seed) = config.training.seed {
        tch::manual_seed(seed as i64);
    }

    info!("Loading data from {}", data_path.display());
    let mut dataset = SampleDataset::load_npy(&data_path)?;
    info!("Loaded {} samples of shape {:?}", dataset.len(), dataset.sample_shape());

    let (channels, height, width) = dataset.sample_shape();
    if channels as i64 != config.data.channels
        || height as i64 != config.data.image_size
        || width as i64 != config.data.image_size
    {
        bail!(
            "dataset shape ({}, {}, {}) does not match configured ({}, {}, {})",
            channels,
            height,
            width,
            config.data.channels,
            config.data.image_size,
            config.data.image_size
        );
    }

    if config.data.normalize {
        info!("Normalizing samples to [-1, 1]");
        dataset.normalize();
    }

    let mut loader = DataLoader::new(dataset, config.data.batch_size, true, true);
    info!(
        "DataLoader: {} batches of size {}",
        loader.num_batches(),
        config.data.batch_size
    );

    let mut model = WganGp::new(config.generator_config(), config.critic_config(), device);

    match (&resume_generator, &resume_critic) {
        (Some(gen_path), Some(critic_path)) => {
            info!(
                "Resuming from {} and {}",
                gen_path.display(),
                critic_path.display()
            );
            model
                .load(gen_path, critic_path)
                .context("failed to resume from the given snapshots")?;
        }
        (None, None) => {
            if config.training.stage > 0 {
                bail!(
                    "stage {} requires --resume-generator and --resume-critic snapshots",
                    config.training.stage
                );
            }
        }
        _ => bail!("--resume-generator and --resume-critic must be given together"),
    }

    let mut noise = NoiseSource::new(config.model.latent_dim, config.training.seed);
    let store = CheckpointStore::new(&config.training.checkpoint_dir);
    let key = config.checkpoint_key();

    let mut trainer = Trainer::new(config.training_config()?, device, store, key);
    let history = trainer.train(&mut model, &mut loader, &mut noise)?;

    info!(
        "Training complete. Final D_loss: {:.6}, G_loss: {:.6}",
        history.latest_d_loss().unwrap_or(f64::NAN),
        history.latest_g_loss().unwrap_or(f64::NAN)
    );

    Ok(())
}

/// Generate samples from a trained generator
fn generate(
    config_path: &Path,
    num_samples: i64,
    fixed: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let device = config.get_device();

    let mut model = WganGp::new(config.generator_config(), config.critic_config(), device);

    let store = CheckpointStore::new(&config.training.checkpoint_dir);
    let key = config.checkpoint_key();
    store
        .load_latest(&mut model, &key)
        .context("failed to load trained model from the checkpoint store")?;
    info!("Loaded model for dataset '{}'", key.dataset);

    let seed = if fixed { config.training.seed } else { None };
    let mut noise = NoiseSource::new(config.model.latent_dim, seed);
    let z = noise.latent(num_samples, device);
    let samples = model.generate(&z);

    let out_dir = output.unwrap_or_else(|| {
        Path::new(&config.training.result_dir)
            .join(&key.dataset)
            .join(format!("stage_{}", key.stage))
    });

    let written = write_sample_dumps(&samples, &out_dir, DumpWindow::default())?;
    info!("Wrote {} sample dumps to {}", written, out_dir.display());

    Ok(())
}

/// Initialize a default configuration file
fn init_config(output: &Path) -> Result<()> {
    let config = ensure_config_exists(output)?;
    config.validate()?;
    info!("Configuration ready at {}", output.display());
    Ok(())
}
