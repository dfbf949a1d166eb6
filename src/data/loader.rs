//! DataLoader for batching and iterating over training samples
//!
//! Provides batching for GAN training with support for:
//! - Random shuffling each epoch
//! - Dropping the last incomplete batch
//! - Queryable sample and batch counts

use ndarray::{Array1, Array4, Axis};
use rand::seq::SliceRandom;

use super::dataset::SampleDataset;

/// DataLoader yielding (sample-batch, label-batch) pairs
pub struct DataLoader {
    samples: Array4<f32>,
    labels: Array1<i64>,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    indices: Vec<usize>,
    current_idx: usize,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `dataset` - Dataset of shape (num_samples, channels, height, width)
    /// * `batch_size` - Number of samples per batch
    /// * `shuffle` - Whether to shuffle samples each epoch
    /// * `drop_last` - Whether to drop the incomplete final batch
    pub fn new(dataset: SampleDataset, batch_size: usize, shuffle: bool, drop_last: bool) -> Self {
        let (samples, labels) = dataset.into_parts();
        let indices: Vec<usize> = (0..samples.shape()[0]).collect();

        let mut loader = Self {
            samples,
            labels,
            batch_size,
            shuffle,
            drop_last,
            indices,
            current_idx: 0,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.samples.shape()[0];
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            (num_samples + self.batch_size - 1) / self.batch_size
        }
    }

    /// Total number of examples
    pub fn num_samples(&self) -> usize {
        self.samples.shape()[0]
    }

    /// Configured batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sample shape as (channels, height, width)
    pub fn sample_shape(&self) -> (usize, usize, usize) {
        let shape = self.samples.shape();
        (shape[1], shape[2], shape[3])
    }

    fn shuffle_indices(&mut self) {
        let mut rng = rand::thread_rng();
        self.indices.shuffle(&mut rng);
    }

    /// Reset for a new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Get the next (sample-batch, label-batch) pair
    ///
    /// Returns None when the epoch is complete.
    pub fn next_batch(&mut self) -> Option<(Array4<f32>, Array1<i64>)> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);
        let actual_batch_size = end - start;

        if self.drop_last && actual_batch_size < self.batch_size {
            return None;
        }

        let (channels, height, width) = self.sample_shape();
        let mut batch = Array4::<f32>::zeros((actual_batch_size, channels, height, width));
        let mut labels = Array1::<i64>::zeros(actual_batch_size);

        for (batch_idx, &data_idx) in self.indices[start..end].iter().enumerate() {
            batch
                .index_axis_mut(Axis(0), batch_idx)
                .assign(&self.samples.index_axis(Axis(0), data_idx));
            labels[batch_idx] = self.labels[data_idx];
        }

        self.current_idx = end;
        Some((batch, labels))
    }

    /// Iterate over all batches of one epoch (resets and reshuffles first)
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = (Array4<f32>, Array1<i64>);

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> SampleDataset {
        let samples = Array4::<f32>::zeros((n, 2, 4, 4));
        let labels = Array1::from_iter(0..n as i64);
        SampleDataset::new(samples, labels).unwrap()
    }

    #[test]
    fn test_loader_basic() {
        let mut loader = DataLoader::new(dataset(10), 3, false, false);

        assert_eq!(loader.num_batches(), 4); // ceil(10/3)
        assert_eq!(loader.num_samples(), 10);
        assert_eq!(loader.sample_shape(), (2, 4, 4));

        let mut batch_count = 0;
        while let Some((batch, labels)) = loader.next_batch() {
            batch_count += 1;
            assert_eq!(batch.shape()[0], labels.len());
            if batch_count < 4 {
                assert_eq!(batch.shape()[0], 3);
            } else {
                assert_eq!(batch.shape()[0], 1);
            }
        }
        assert_eq!(batch_count, 4);
    }

    #[test]
    fn test_loader_drop_last() {
        let mut loader = DataLoader::new(dataset(10), 3, false, true);

        assert_eq!(loader.num_batches(), 3); // floor(10/3)

        let mut batch_count = 0;
        while let Some((batch, _)) = loader.next_batch() {
            batch_count += 1;
            assert_eq!(batch.shape()[0], 3);
        }
        assert_eq!(batch_count, 3);
    }

    #[test]
    fn test_loader_iter_covers_all_labels_without_shuffle() {
        let mut loader = DataLoader::new(dataset(6), 2, false, true);

        let labels: Vec<i64> = loader.iter().flat_map(|(_, l)| l.to_vec()).collect();
        assert_eq!(labels, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_loader_iter_resets() {
        let mut loader = DataLoader::new(dataset(4), 2, true, true);

        assert_eq!(loader.iter().count(), 2);
        assert_eq!(loader.iter().count(), 2);
    }
}
