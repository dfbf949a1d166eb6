//! Generator network for WGAN-GP
//!
//! The Generator transforms random noise vectors into synthetic samples.
//! A dense stack projects the latent vector onto an initial feature map
//! which transposed 2D convolutions upsample to the target resolution.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Number of output channels
    pub channels: i64,
    /// Spatial size of the square output sample (must be divisible by 4)
    pub image_size: i64,
    /// Width of the first dense layer
    pub fc_width: i64,
    /// Channels of the initial feature map fed into the deconvolutions
    pub base_channels: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 62,
            channels: 1,
            image_size: 32,
            fc_width: 1024,
            base_channels: 128,
        }
    }
}

fn weight_init() -> nn::Init {
    nn::Init::Randn { mean: 0.0, stdev: 0.02 }
}

fn norm_config() -> nn::BatchNormConfig {
    nn::BatchNormConfig {
        ws_init: nn::Init::Randn { mean: 1.0, stdev: 0.02 },
        bs_init: nn::Init::Const(0.0),
        ..Default::default()
    }
}

/// Generator network
///
/// Architecture:
/// 1. Two dense layers with batch norm and ReLU
/// 2. Reshape to (base_channels, size/4, size/4)
/// 3. Two transposed convolutions upsampling to full resolution, tanh output
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    fc1: nn::Linear,
    bn1: nn::BatchNorm,
    fc2: nn::Linear,
    bn2: nn::BatchNorm,
    deconv1: nn::ConvTranspose2D,
    bn3: nn::BatchNorm,
    deconv2: nn::ConvTranspose2D,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let init_size = config.image_size / 4;
        let projected = config.base_channels * init_size * init_size;

        let linear_config = nn::LinearConfig {
            ws_init: weight_init(),
            ..Default::default()
        };
        let fc1 = nn::linear(vs / "fc1", config.latent_dim, config.fc_width, linear_config);
        let bn1 = nn::batch_norm1d(vs / "bn1", config.fc_width, norm_config());
        let fc2 = nn::linear(vs / "fc2", config.fc_width, projected, linear_config);
        let bn2 = nn::batch_norm1d(vs / "bn2", projected, norm_config());

        let deconv_config = nn::ConvTransposeConfig {
            stride: 2,
            padding: 1,
            ws_init: weight_init(),
            ..Default::default()
        };
        let deconv1 = nn::conv_transpose2d(
            vs / "deconv1",
            config.base_channels,
            config.base_channels / 2,
            4,
            deconv_config,
        );
        let bn3 = nn::batch_norm2d(vs / "bn3", config.base_channels / 2, norm_config());
        let deconv2 = nn::conv_transpose2d(
            vs / "deconv2",
            config.base_channels / 2,
            config.channels,
            4,
            deconv_config,
        );

        Self {
            config,
            fc1,
            bn1,
            fc2,
            bn2,
            deconv1,
            bn3,
            deconv2,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, channels, image_size, image_size)
    /// with values in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let init_size = self.config.image_size / 4;

        let x = self.fc1.forward(noise);
        let x = self.bn1.forward_t(&x, train).relu();
        let x = self.fc2.forward(&x);
        let x = self.bn2.forward_t(&x, train).relu();

        let x = x.view([-1, self.config.base_channels, init_size, init_size]);

        let x = self.deconv1.forward(&x);
        let x = self.bn3.forward_t(&x, train).relu();
        self.deconv2.forward(&x).tanh()
    }

    /// Generate samples (evaluation mode)
    pub fn generate(&self, noise: &Tensor) -> Tensor {
        self.forward_t(noise, false)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}
