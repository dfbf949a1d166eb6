//! In-memory sample dataset
//!
//! Holds training samples of shape (num_samples, channels, height, width)
//! together with opaque integer labels. Only the samples are consumed by
//! training; labels ride along to satisfy the (sample, label) pair
//! contract of the data source.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context};
use ndarray::{Array1, Array4, ArrayView4};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

/// Per-channel normalization parameters for denormalization
#[derive(Debug, Clone)]
pub struct NormalizationParams {
    pub min_vals: Vec<f32>,
    pub max_vals: Vec<f32>,
}

/// Dataset of image-like samples and labels
pub struct SampleDataset {
    samples: Array4<f32>,
    labels: Array1<i64>,
}

impl SampleDataset {
    /// Create a dataset from samples and labels
    pub fn new(samples: Array4<f32>, labels: Array1<i64>) -> anyhow::Result<Self> {
        if samples.shape()[0] != labels.len() {
            bail!(
                "sample count ({}) does not match label count ({})",
                samples.shape()[0],
                labels.len()
            );
        }
        Ok(Self { samples, labels })
    }

    /// Create a dataset with all-zero labels
    pub fn from_samples(samples: Array4<f32>) -> Self {
        let labels = Array1::zeros(samples.shape()[0]);
        Self { samples, labels }
    }

    /// Load samples from a `.npy` file of shape (N, C, H, W)
    pub fn load_npy(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open dataset file {}", path.display()))?;
        let samples = Array4::<f32>::read_npy(file)
            .with_context(|| format!("failed to parse {} as a (N, C, H, W) array", path.display()))?;
        Ok(Self::from_samples(samples))
    }

    /// Save samples to a `.npy` file
    pub fn save_npy(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create dataset file {}", path.display()))?;
        self.samples.write_npy(file)?;
        Ok(())
    }

    /// Total number of examples
    pub fn len(&self) -> usize {
        self.samples.shape()[0]
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample shape as (channels, height, width)
    pub fn sample_shape(&self) -> (usize, usize, usize) {
        let shape = self.samples.shape();
        (shape[1], shape[2], shape[3])
    }

    /// View of the samples
    pub fn samples(&self) -> ArrayView4<'_, f32> {
        self.samples.view()
    }

    /// Labels slice
    pub fn labels(&self) -> &Array1<i64> {
        &self.labels
    }

    /// Consume the dataset, returning its parts
    pub fn into_parts(self) -> (Array4<f32>, Array1<i64>) {
        (self.samples, self.labels)
    }

    /// Normalize samples per channel to [-1, 1] in place
    ///
    /// Formula: x_norm = 2 * (x - min) / (max - min) - 1. Channels with a
    /// constant value are mapped to 0.
    pub fn normalize(&mut self) -> NormalizationParams {
        let channels = self.samples.shape()[1];
        let mut min_vals = vec![f32::MAX; channels];
        let mut max_vals = vec![f32::MIN; channels];

        for (idx, &val) in self.samples.indexed_iter() {
            let ch = idx.1;
            if val < min_vals[ch] {
                min_vals[ch] = val;
            }
            if val > max_vals[ch] {
                max_vals[ch] = val;
            }
        }

        for (idx, val) in self.samples.indexed_iter_mut() {
            let ch = idx.1;
            let range = max_vals[ch] - min_vals[ch];
            *val = if range > 0.0 {
                2.0 * (*val - min_vals[ch]) / range - 1.0
            } else {
                0.0
            };
        }

        NormalizationParams { min_vals, max_vals }
    }

    /// Denormalize samples back to the original scale in place
    ///
    /// Formula: x = (x_norm + 1) / 2 * (max - min) + min
    pub fn denormalize(&mut self, params: &NormalizationParams) {
        for (idx, val) in self.samples.indexed_iter_mut() {
            let ch = idx.1;
            let range = params.max_vals[ch] - params.min_vals[ch];
            *val = (*val + 1.0) / 2.0 * range + params.min_vals[ch];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn ramp_dataset() -> SampleDataset {
        let samples =
            Array::linspace(0.0f32, 99.0, 100).into_shape((4, 1, 5, 5)).unwrap();
        SampleDataset::from_samples(samples)
    }

    #[test]
    fn test_label_count_mismatch() {
        let samples = Array4::<f32>::zeros((4, 1, 5, 5));
        let labels = Array1::zeros(3);
        assert!(SampleDataset::new(samples, labels).is_err());
    }

    #[test]
    fn test_normalize_denormalize_roundtrip() {
        let mut dataset = ramp_dataset();
        let original = dataset.samples().to_owned();

        let params = dataset.normalize();
        for &val in dataset.samples().iter() {
            assert!((-1.0..=1.0).contains(&val));
        }

        dataset.denormalize(&params);
        for (a, b) in original.iter().zip(dataset.samples().iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_constant_channel_normalizes_to_zero() {
        let samples = Array4::<f32>::ones((2, 1, 3, 3));
        let mut dataset = SampleDataset::from_samples(samples);
        dataset.normalize();
        for &val in dataset.samples().iter() {
            assert_eq!(val, 0.0);
        }
    }

    #[test]
    fn test_npy_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.npy");

        let dataset = ramp_dataset();
        dataset.save_npy(&path).unwrap();

        let loaded = SampleDataset::load_npy(&path).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.sample_shape(), (1, 5, 5));
        assert_eq!(loaded.samples(), dataset.samples());
    }
}
