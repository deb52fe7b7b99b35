//! Trained model persistence.
//!
//! The network record is written at full f32 precision through Burn's named
//! MessagePack recorder (which appends `.mpk` to the configured path); a JSON
//! manifest beside it records the architecture needed to rebuild the module
//! before loading the record.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use soil_core::{ensure_parent_dir, Error, Result};
use tracing::info;

use crate::model::{SoilClassifier, SoilClassifierConfig};

type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Summary written next to the model record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingManifest {
    pub timestamp: String,
    pub model: SoilClassifierConfig,
    pub num_parameters: usize,
    pub epochs: usize,
    pub training_samples: usize,
    pub test_samples: usize,
    pub best_val_accuracy: f64,
    pub test_accuracy: f64,
    /// Plant names in class-index order
    pub classes: Vec<String>,
}

impl TrainingManifest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: SoilClassifierConfig,
        num_parameters: usize,
        epochs: usize,
        training_samples: usize,
        test_samples: usize,
        best_val_accuracy: f64,
        test_accuracy: f64,
        classes: Vec<String>,
    ) -> Self {
        use chrono::Utc;

        Self {
            timestamp: Utc::now().to_rfc3339(),
            model,
            num_parameters,
            epochs,
            training_samples,
            test_samples,
            best_val_accuracy,
            test_accuracy,
            classes,
        }
    }

    /// Save manifest to file
    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize manifest: {}", e)))?;
        fs::write(path, json)?;

        info!("Training manifest saved to {:?}", path);
        Ok(())
    }

    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let manifest: TrainingManifest = serde_json::from_str(&json)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize manifest: {}", e)))?;

        if manifest.classes.len() != manifest.model.num_classes {
            return Err(Error::Model(format!(
                "manifest lists {} classes but the model has {} outputs",
                manifest.classes.len(),
                manifest.model.num_classes
            )));
        }
        Ok(manifest)
    }
}

/// Path the recorder actually writes for `path`
pub fn record_path(path: &Path) -> PathBuf {
    let mut file = path.as_os_str().to_owned();
    file.push(".mpk");
    PathBuf::from(file)
}

/// Saves the network record, overwriting any previous one
pub fn save_model<B: Backend>(model: &SoilClassifier<B>, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    model
        .clone()
        .save_file(path, &ModelRecorder::new())
        .map_err(|e| Error::Model(format!("Failed to save model: {:?}", e)))?;

    info!("Model saved to {:?}", record_path(path));
    Ok(())
}

/// Rebuilds the network described by `config` and loads its record
pub fn load_model<B: Backend>(
    config: &SoilClassifierConfig,
    path: &Path,
    device: &B::Device,
) -> Result<SoilClassifier<B>> {
    let model = config
        .init::<B>(device)
        .load_file(path, &ModelRecorder::new(), device)
        .map_err(|e| Error::Model(format!("Failed to load model from {:?}: {:?}", path, e)))?;

    info!("Model loaded from {:?}", record_path(path));
    Ok(model)
}
