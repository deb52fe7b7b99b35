//! Burn Dataset integration for encoded soil rows.
//!
//! Implements Burn's `Dataset` trait and a `Batcher` that builds feature,
//! class-index and one-hot target tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use soil_core::{Error, Result, NUM_FEATURES};

use crate::pipeline::EncodedDataset;

/// A single encoded row ready for Burn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoilItem {
    /// Scaled feature vector
    pub features: [f32; NUM_FEATURES],
    /// Class index
    pub label: usize,
}

/// Row-major one-hot matrix of shape `[labels.len(), num_classes]`
pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Vec<f32>> {
    if let Some(&label) = labels.iter().find(|&&label| label >= num_classes) {
        return Err(Error::InvalidArgument(format!(
            "label {label} out of range for {num_classes} classes"
        )));
    }
    Ok(one_hot_rows(labels.iter().copied(), labels.len(), num_classes))
}

/// One-hot rows for labels already known to be below `num_classes`
fn one_hot_rows(labels: impl Iterator<Item = usize>, rows: usize, num_classes: usize) -> Vec<f32> {
    let mut matrix = vec![0.0f32; rows * num_classes];
    for (row, label) in labels.enumerate() {
        matrix[row * num_classes + label] = 1.0;
    }
    matrix
}

/// In-memory dataset of encoded rows
#[derive(Debug, Clone)]
pub struct SoilBurnDataset {
    items: Vec<SoilItem>,
    num_classes: usize,
}

impl SoilBurnDataset {
    /// Wraps encoded rows; every label must be below `num_classes`
    pub fn new(items: Vec<SoilItem>, num_classes: usize) -> Result<Self> {
        if let Some(item) = items.iter().find(|item| item.label >= num_classes) {
            return Err(Error::Dataset(format!(
                "label {} out of range for {num_classes} classes",
                item.label
            )));
        }
        Ok(Self { items, num_classes })
    }

    pub fn from_encoded(encoded: &EncodedDataset) -> Result<Self> {
        let items = encoded
            .features
            .iter()
            .zip(&encoded.labels)
            .map(|(features, &label)| SoilItem {
                features: *features,
                label,
            })
            .collect();
        Self::new(items, encoded.num_classes)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn items(&self) -> &[SoilItem] {
        &self.items
    }
}

impl Dataset<SoilItem> for SoilBurnDataset {
    fn get(&self, index: usize) -> Option<SoilItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of encoded rows
#[derive(Clone, Debug)]
pub struct SoilBatch<B: Backend> {
    /// Features `[batch, 8]`
    pub features: Tensor<B, 2>,
    /// Class indices `[batch]`
    pub targets: Tensor<B, 1, Int>,
    /// One-hot targets `[batch, num_classes]`
    pub one_hot: Tensor<B, 2>,
}

/// Batcher for soil rows
#[derive(Clone, Debug)]
pub struct SoilBatcher<B: Backend> {
    device: B::Device,
    num_classes: usize,
}

impl<B: Backend> SoilBatcher<B> {
    pub fn new(device: B::Device, num_classes: usize) -> Self {
        Self {
            device,
            num_classes,
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> Batcher<SoilItem, SoilBatch<B>> for SoilBatcher<B> {
    fn batch(&self, items: Vec<SoilItem>) -> SoilBatch<B> {
        let batch_size = items.len();

        let features_data: Vec<f32> = items.iter().flat_map(|item| item.features).collect();
        let features = Tensor::<B, 2>::from_data(
            TensorData::new(features_data, [batch_size, NUM_FEATURES]),
            &self.device,
        );

        let labels: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), &self.device);

        // Labels were range-checked when the dataset was built.
        let hot = one_hot_rows(
            items.iter().map(|item| item.label),
            batch_size,
            self.num_classes,
        );
        let one_hot = Tensor::<B, 2>::from_data(
            TensorData::new(hot, [batch_size, self.num_classes]),
            &self.device,
        );

        SoilBatch {
            features,
            targets,
            one_hot,
        }
    }
}
