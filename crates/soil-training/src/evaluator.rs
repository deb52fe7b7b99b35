//! Model evaluation.
//!
//! Accuracy, confusion matrix and per-class metrics computed on an inference
//! backend, plus batched probability / class prediction helpers shared with
//! the quantization agreement report.

use burn::tensor::{backend::Backend, Tensor, TensorData};
use serde::{Deserialize, Serialize};
use soil_core::{Error, Result, NUM_FEATURES};
use soil_dataset::EncodedDataset;
use tracing::{debug, info};

use crate::model::SoilClassifier;

/// Per-class evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class_id: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Result of model evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub accuracy: f64,
    pub correct: usize,
    pub total_samples: usize,
    /// `confusion_matrix[actual][predicted]`
    pub confusion_matrix: Vec<Vec<usize>>,
    pub per_class_metrics: Vec<ClassMetrics>,
}

impl EvaluationResult {
    /// Builds every metric from aligned predictions and labels
    pub fn from_predictions(
        predictions: &[usize],
        labels: &[usize],
        num_classes: usize,
    ) -> Result<Self> {
        if predictions.len() != labels.len() {
            return Err(Error::InvalidArgument(format!(
                "{} predictions for {} labels",
                predictions.len(),
                labels.len()
            )));
        }

        let mut confusion_matrix = vec![vec![0usize; num_classes]; num_classes];
        for (&pred, &label) in predictions.iter().zip(labels) {
            if pred >= num_classes || label >= num_classes {
                return Err(Error::InvalidArgument(format!(
                    "class index out of range for {num_classes} classes"
                )));
            }
            confusion_matrix[label][pred] += 1;
        }

        let correct = (0..num_classes).map(|c| confusion_matrix[c][c]).sum();
        let total_samples = labels.len();
        let accuracy = if total_samples == 0 {
            0.0
        } else {
            correct as f64 / total_samples as f64
        };

        let per_class_metrics = (0..num_classes)
            .map(|class_id| {
                let tp = confusion_matrix[class_id][class_id] as f64;
                let support: usize = confusion_matrix[class_id].iter().sum();
                let predicted: usize = confusion_matrix.iter().map(|row| row[class_id]).sum();

                let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
                let recall = if support > 0 { tp / support as f64 } else { 0.0 };
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    class_id,
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        Ok(Self {
            accuracy,
            correct,
            total_samples,
            confusion_matrix,
            per_class_metrics,
        })
    }

    /// Unweighted mean F1 over classes that have support
    pub fn macro_f1(&self) -> f64 {
        let supported: Vec<f64> = self
            .per_class_metrics
            .iter()
            .filter(|m| m.support > 0)
            .map(|m| m.f1_score)
            .collect();
        if supported.is_empty() {
            0.0
        } else {
            supported.iter().sum::<f64>() / supported.len() as f64
        }
    }
}

/// Model evaluator
pub struct Evaluator<'a, B: Backend> {
    model: &'a SoilClassifier<B>,
    device: B::Device,
    batch_size: usize,
}

impl<'a, B: Backend> Evaluator<'a, B> {
    pub fn new(model: &'a SoilClassifier<B>, device: B::Device, batch_size: usize) -> Self {
        Self {
            model,
            device,
            batch_size: batch_size.max(1),
        }
    }

    /// Softmax probabilities, one row per input
    pub fn predict_proba(&self, features: &[[f32; NUM_FEATURES]]) -> Vec<Vec<f32>> {
        let num_classes = self.model.num_classes();
        let mut probabilities = Vec::with_capacity(features.len());

        for chunk in features.chunks(self.batch_size) {
            let probs = self.model.forward_softmax(features_tensor(chunk, &self.device));
            let flat: Vec<f32> = probs.into_data().iter::<f32>().collect();
            probabilities.extend(flat.chunks(num_classes).map(<[f32]>::to_vec));
        }
        probabilities
    }

    /// Arg-max class per input
    pub fn predict_classes(&self, features: &[[f32; NUM_FEATURES]]) -> Vec<usize> {
        let mut classes = Vec::with_capacity(features.len());

        for chunk in features.chunks(self.batch_size) {
            let logits = self.model.forward(features_tensor(chunk, &self.device));
            let predictions = logits.argmax(1).reshape([chunk.len()]);
            classes.extend(predictions.into_data().iter::<i64>().map(|c| c as usize));
        }
        classes
    }

    /// Evaluates the model on an encoded dataset
    pub fn evaluate(&self, dataset: &EncodedDataset) -> Result<EvaluationResult> {
        debug!("Evaluating on {} samples", dataset.len());
        let predictions = self.predict_classes(&dataset.features);
        let result =
            EvaluationResult::from_predictions(&predictions, &dataset.labels, dataset.num_classes)?;
        info!(
            "Evaluation: accuracy={:.4} ({}/{}), macro_f1={:.4}",
            result.accuracy,
            result.correct,
            result.total_samples,
            result.macro_f1()
        );
        Ok(result)
    }
}

/// Stacks feature rows into a `[rows, 8]` tensor
pub fn features_tensor<B: Backend>(
    rows: &[[f32; NUM_FEATURES]],
    device: &B::Device,
) -> Tensor<B, 2> {
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    Tensor::from_data(TensorData::new(data, [rows.len(), NUM_FEATURES]), device)
}
