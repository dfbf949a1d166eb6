//! Critic network for WGAN-GP
//!
//! The Critic scores samples with an unbounded scalar: higher means more
//! realistic. No sigmoid — the Wasserstein formulation needs the raw score.
//! Every activation is twice differentiable, which the gradient penalty
//! relies on.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::leaky_relu;

const LEAKY_SLOPE: f64 = 0.2;

/// Critic network configuration
#[derive(Debug, Clone)]
pub struct CriticConfig {
    /// Number of input channels
    pub channels: i64,
    /// Spatial size of the square input sample (must be divisible by 4)
    pub image_size: i64,
    /// Channels of the first convolution
    pub base_channels: i64,
    /// Width of the dense layer after flattening
    pub fc_width: i64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            image_size: 32,
            base_channels: 64,
            fc_width: 1024,
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

/// Critic network
///
/// Architecture:
/// 1. Two strided convolutions with leaky ReLU (batch norm on the second)
/// 2. Flatten, dense layer with batch norm and leaky ReLU
/// 3. Dense layer to a single unbounded score
#[derive(Debug)]
pub struct Critic {
    config: CriticConfig,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    bn1: nn::BatchNorm,
    fc1: nn::Linear,
    bn2: nn::BatchNorm,
    fc2: nn::Linear,
}

impl Critic {
    /// Create a new Critic network
    pub fn new(vs: &nn::Path, config: CriticConfig) -> Self {
        let base = config.base_channels;

        let conv_config = nn::ConvConfig {
            stride: 2,
            padding: 1,
            ws_init: weight_init(),
            ..Default::default()
        };
        let conv1 = nn::conv2d(vs / "conv1", config.channels, base, 4, conv_config);
        let conv2 = nn::conv2d(vs / "conv2", base, base * 2, 4, conv_config);
        let bn1 = nn::batch_norm2d(vs / "bn1", base * 2, norm_config());

        let final_size = config.image_size / 4;
        let flat_size = base * 2 * final_size * final_size;

        let linear_config = nn::LinearConfig {
            ws_init: weight_init(),
            ..Default::default()
        };
        let fc1 = nn::linear(vs / "fc1", flat_size, config.fc_width, linear_config);
        let bn2 = nn::batch_norm1d(vs / "bn2", config.fc_width, norm_config());
        let fc2 = nn::linear(vs / "fc2", config.fc_width, 1, linear_config);

        Self {
            config,
            conv1,
            conv2,
            bn1,
            fc1,
            bn2,
            fc2,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, channels, image_size, image_size)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with unbounded scores
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        let x = self.conv1.forward(input);
        let x = leaky_relu(&x, LEAKY_SLOPE);

        let x = self.conv2.forward(&x);
        let x = self.bn1.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_SLOPE);

        let batch_size = x.size()[0];
        let x = x.view([batch_size, -1]);

        let x = self.fc1.forward(&x);
        let x = self.bn2.forward_t(&x, train);
        let x = leaky_relu(&x, LEAKY_SLOPE);

        self.fc2.forward(&x)
    }

    /// Score samples (evaluation mode)
    pub fn score(&self, input: &Tensor) -> Tensor {
        self.forward_t(input, false)
    }

    /// Get configuration
    pub fn config(&self) -> &CriticConfig {
        &self.config
    }
}

impl ModuleT for Critic {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Critic::forward_t(self, xs, train)
    }
}
