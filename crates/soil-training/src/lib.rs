//! Training infrastructure for the soil crop classifier.
//!
//! This crate provides:
//! - The dense 8 -> 128 -> 64 -> N classifier
//! - Training loop with per-epoch validation
//! - Evaluation metrics and single-row prediction
//! - Model and manifest persistence
//! - Firmware literal export

pub mod checkpoint;
pub mod evaluator;
pub mod firmware;
pub mod model;
pub mod predictor;
pub mod trainer;

pub use checkpoint::{load_model, record_path, save_model, TrainingManifest};
pub use evaluator::{features_tensor, ClassMetrics, EvaluationResult, Evaluator};
pub use firmware::FirmwareLiterals;
pub use model::{SoilClassifier, SoilClassifierConfig};
pub use predictor::{predict, reference_reading, Prediction};
pub use trainer::{categorical_cross_entropy, EpochMetrics, Trainer, TrainingHistory, TrainingState};

use burn::backend::{Autodiff, NdArray};

/// CPU backend used for inference and export
pub type InferenceBackend = NdArray;

/// Autodiff backend used for training
pub type TrainingBackend = Autodiff<NdArray>;

/// Re-export commonly used types
pub mod prelude {
    pub use super::checkpoint::{load_model, save_model, TrainingManifest};
    pub use super::evaluator::{EvaluationResult, Evaluator};
    pub use super::firmware::FirmwareLiterals;
    pub use super::model::{SoilClassifier, SoilClassifierConfig};
    pub use super::trainer::{Trainer, TrainingState};
    pub use super::{InferenceBackend, TrainingBackend};
}
