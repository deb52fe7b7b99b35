//! Dataset generation, loading and feature encoding for the soil crop pipeline.
//!
//! This crate provides:
//! - The Isan crop profile table and synthetic sample generator
//! - CSV reading and writing of [`SoilSample`] rows
//! - Label encoders, the standard scaler and the frozen [`FeaturePipeline`]
//! - Seeded train/test splitting and Burn dataset integration

pub mod burn_dataset;
pub mod crops;
pub mod encoder;
pub mod generator;
pub mod loader;
pub mod pipeline;
pub mod scaler;
pub mod split;
pub mod statistics;

pub use burn_dataset::{one_hot, SoilBatch, SoilBatcher, SoilBurnDataset, SoilItem};
pub use crops::{isan_profiles, CropProfile, FeatureRange, RegionalMeans};
pub use encoder::LabelEncoder;
pub use generator::DatasetGenerator;
pub use loader::{read_samples, write_samples};
pub use pipeline::{EncodedDataset, FeaturePipeline};
pub use scaler::StandardScaler;
pub use split::{train_test_split, validation_tail_split, SplitIndices};
pub use statistics::DatasetStatistics;

pub use soil_core::{Error, Result, SoilSample};
