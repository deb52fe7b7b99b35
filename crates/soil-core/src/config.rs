//! Configuration structures for the soil crop pipeline.
//!
//! Every field has a default matching the fixed artifact layout under
//! `models/`, so the stage binaries run without any configuration file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::CategoricalColumn;

/// Main configuration shared by all three stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Artifact locations
    pub paths: ArtifactPaths,
    /// Synthetic data generation
    pub generation: GenerationConfig,
    /// Classifier training
    pub training: TrainingParams,
    /// Post-training quantization
    pub quantization: QuantizationConfig,
}

impl PipelineConfig {
    /// Validates every section
    pub fn validate(&self) -> Result<()> {
        self.generation.validate()?;
        self.training.validate()?;
        self.quantization.validate()
    }
}

/// Fixed file locations connecting the stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Generated dataset CSV
    pub dataset: PathBuf,
    /// Trained network record (the recorder appends its own extension)
    pub model: PathBuf,
    /// Plant (label) encoder
    pub plant_encoder: PathBuf,
    /// Region encoder
    pub region_encoder: PathBuf,
    /// Soil type encoder
    pub soil_encoder: PathBuf,
    /// Season encoder
    pub season_encoder: PathBuf,
    /// Standard scaler
    pub scaler: PathBuf,
    /// Training manifest
    pub manifest: PathBuf,
    /// Quantized int8 model
    pub quantized_model: PathBuf,
    /// C header embedding the quantized model bytes
    pub firmware_header: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        let dir = PathBuf::from("models");
        Self {
            dataset: dir.join("thai_soil_train_isan_phangkhon_npk_separated.csv"),
            model: dir.join("soil_plant_mlp_isan_npk_separated"),
            plant_encoder: dir.join("label_encoder_plant_isan_npk_separated.json"),
            region_encoder: dir.join("label_encoder_region_isan_npk_separated.json"),
            soil_encoder: dir.join("label_encoder_soil_isan_npk_separated.json"),
            season_encoder: dir.join("label_encoder_season_isan_npk_separated.json"),
            scaler: dir.join("scaler_isan_npk_separated.json"),
            manifest: dir.join("soil_plant_mlp_isan_npk_separated.manifest.json"),
            quantized_model: dir.join("soil_plant_mlp_isan_npk_separated.sqi8"),
            firmware_header: dir.join("soil_plant_mlp_isan_npk_separated.h"),
        }
    }
}

impl ArtifactPaths {
    /// Encoder file for a categorical column
    pub fn encoder(&self, column: CategoricalColumn) -> &PathBuf {
        match column {
            CategoricalColumn::Region => &self.region_encoder,
            CategoricalColumn::SoilType => &self.soil_encoder,
            CategoricalColumn::Season => &self.season_encoder,
            CategoricalColumn::Plant => &self.plant_encoder,
        }
    }
}

/// Synthetic dataset generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Rows generated per crop
    pub samples_per_crop: usize,
    /// Random seed; `None` draws a fresh seed from the OS
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            samples_per_crop: 200,
            seed: None,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.samples_per_crop == 0 {
            return Err(Error::Config(
                "samples_per_crop must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Number of passes over the training subset
    pub num_epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Width of the first hidden layer
    pub hidden1: usize,
    /// Width of the second hidden layer
    pub hidden2: usize,
    /// Dropout after each hidden layer (training only)
    pub dropout: f64,
    /// Fraction of rows held out for the final accuracy report
    pub test_fraction: f64,
    /// Fraction of the training subset used for per-epoch validation
    pub validation_fraction: f64,
    /// Seed for the train/test partition, shuffling and weight init
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            num_epochs: 100,
            batch_size: 32,
            learning_rate: 1e-3,
            hidden1: 128,
            hidden2: 64,
            dropout: 0.3,
            test_fraction: 0.2,
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

impl TrainingParams {
    /// Validates hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.num_epochs == 0 {
            return Err(Error::Config("Number of epochs must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("Batch size must be greater than 0".to_string()));
        }
        if self.learning_rate <= 0.0 {
            return Err(Error::Config("Learning rate must be positive".to_string()));
        }
        if self.hidden1 == 0 || self.hidden2 == 0 {
            return Err(Error::Config("Hidden layer widths must be greater than 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::Config(format!(
                "Dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        for (name, fraction) in [
            ("test_fraction", self.test_fraction),
            ("validation_fraction", self.validation_fraction),
        ] {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(Error::Config(format!(
                    "{name} must be in (0, 1), got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

/// Post-training quantization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    /// Limit on calibration rows; `None` uses every dataset row
    pub max_calibration_rows: Option<usize>,
}

impl QuantizationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_calibration_rows == Some(0) {
            return Err(Error::Config(
                "max_calibration_rows must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}
