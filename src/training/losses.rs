//! Loss functions for WGAN-GP training
//!
//! Implements the Wasserstein losses and the gradient penalty that enforces
//! the critic's 1-Lipschitz constraint.

use tch::{nn::ModuleT, Kind, Tensor};

/// Generator loss: -E[D(G(z))]
///
/// The generator wants the critic to assign high scores to its samples.
pub fn generator_loss(fake_scores: &Tensor) -> Tensor {
    -fake_scores.mean(Kind::Float)
}

/// Critic loss without penalty: E[D(G(z))] - E[D(x)]
///
/// The critic wants real samples to score higher than generated ones.
pub fn critic_loss(real_scores: &Tensor, fake_scores: &Tensor) -> Tensor {
    fake_scores.mean(Kind::Float) - real_scores.mean(Kind::Float)
}

/// Gradient penalty: lambda * E[(||∇_x̂ D(x̂)||₂ - 1)²]
///
/// `x̂` is a per-sample convex combination of real and generated samples,
/// built from detached copies and given its own gradient-tracking identity.
/// The gradient of the critic's score with respect to `x̂` is computed with
/// `create_graph` so the penalty itself back-propagates into the critic's
/// parameters. The critic must be twice differentiable; a critic that is
/// not cannot train under this penalty at all.
///
/// # Arguments
///
/// * `critic` - The critic network
/// * `real` - Real sample batch of shape (batch, channels, height, width)
/// * `fake` - Generated batch of the same shape
/// * `alpha` - Interpolation coefficients of shape (batch, 1, 1, 1),
///   uniform on [0, 1), redrawn independently for every call
/// * `lambda` - Penalty weight
pub fn gradient_penalty<C: ModuleT>(
    critic: &C,
    real: &Tensor,
    fake: &Tensor,
    alpha: &Tensor,
    lambda: f64,
) -> Tensor {
    let batch_size = real.size()[0];
    let ones = Tensor::ones_like(alpha);

    // Fresh storage, detached from the graphs that produced real and fake.
    let interpolated = (alpha * real.detach() + (&ones - alpha) * fake.detach())
        .set_requires_grad(true);

    let scores = critic.forward_t(&interpolated, true);
    let gradients = Tensor::run_backward(
        &[scores.sum(Kind::Float)],
        &[&interpolated],
        true, // keep_graph
        true, // create_graph
    );

    let grad_norm = gradients[0]
        .view([batch_size, -1])
        .norm_scalaropt_dim(2.0, [1], false);

    (grad_norm - 1.0).pow_tensor_scalar(2.0).mean(Kind::Float) * lambda
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Critic, CriticConfig};
    use crate::training::NoiseSource;
    use tch::{nn::VarStore, Device};

    /// Critic whose score is the first element of each flattened sample:
    /// its input gradient is a one-hot vector with unit norm everywhere.
    struct FirstElementCritic;

    impl ModuleT for FirstElementCritic {
        fn forward_t(&self, xs: &Tensor, _train: bool) -> Tensor {
            let batch_size = xs.size()[0];
            xs.view([batch_size, -1]).narrow(1, 0, 1)
        }
    }

    fn small_critic() -> (VarStore, Critic) {
        let vs = VarStore::new(Device::Cpu);
        let config = CriticConfig {
            channels: 1,
            image_size: 16,
            base_channels: 8,
            fc_width: 32,
        };
        let critic = Critic::new(&vs.root(), config);
        (vs, critic)
    }

    #[test]
    fn test_wasserstein_losses() {
        let scores = Tensor::from_slice(&[1.0f32, 3.0]).view([2, 1]);
        let g_loss = generator_loss(&scores);
        assert!((g_loss.double_value(&[]) + 2.0).abs() < 1e-6);

        let d_loss = critic_loss(&scores, &scores);
        assert!(d_loss.double_value(&[]).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_penalty_non_negative() {
        let (_vs, critic) = small_critic();
        let mut noise = NoiseSource::new(8, Some(7));

        let real = Tensor::rand([4, 1, 16, 16], (Kind::Float, Device::Cpu));
        let fake = Tensor::rand([4, 1, 16, 16], (Kind::Float, Device::Cpu));
        let alpha = noise.interpolation(4, Device::Cpu);

        let penalty = gradient_penalty(&critic, &real, &fake, &alpha, 10.0);
        assert!(penalty.double_value(&[]) >= 0.0);
    }

    #[test]
    fn test_gradient_penalty_zero_for_unit_norm_gradient() {
        let mut noise = NoiseSource::new(8, Some(11));

        let real = Tensor::rand([4, 1, 16, 16], (Kind::Float, Device::Cpu));
        let fake = Tensor::rand([4, 1, 16, 16], (Kind::Float, Device::Cpu));
        let alpha = noise.interpolation(4, Device::Cpu);

        let penalty = gradient_penalty(&FirstElementCritic, &real, &fake, &alpha, 10.0);
        assert!(penalty.double_value(&[]).abs() < 1e-9);
    }

    #[test]
    fn test_penalty_depends_on_interpolation_draw() {
        let (_vs, critic) = small_critic();

        let real = Tensor::rand([4, 1, 16, 16], (Kind::Float, Device::Cpu));
        let fake = Tensor::rand([4, 1, 16, 16], (Kind::Float, Device::Cpu));

        let alpha_a = NoiseSource::new(8, Some(1)).interpolation(4, Device::Cpu);
        let alpha_b = NoiseSource::new(8, Some(2)).interpolation(4, Device::Cpu);
        assert!(!alpha_a.equal(&alpha_b));

        let penalty_a = gradient_penalty(&critic, &real, &fake, &alpha_a, 10.0);
        let penalty_b = gradient_penalty(&critic, &real, &fake, &alpha_b, 10.0);
        let diff = (penalty_a.double_value(&[]) - penalty_b.double_value(&[])).abs();
        assert!(diff > 1e-12);
    }
}
