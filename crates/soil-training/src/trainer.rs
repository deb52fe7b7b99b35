//! Training loop for the soil classifier.
//!
//! Mini-batch Adam on categorical cross-entropy against one-hot targets.
//! The last `validation_fraction` of the training rows (in their original
//! order) are held back from gradient updates and scored after every epoch.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::module::{AutodiffModule, Module};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use soil_core::{Error, Result, TrainingParams};
use soil_dataset::{validation_tail_split, EncodedDataset, SoilBatcher, SoilBurnDataset};
use tracing::{debug, info};

use crate::model::{SoilClassifier, SoilClassifierConfig};

/// Keras-compatible Adam epsilon
const ADAM_EPSILON: f32 = 1e-7;

/// Per-epoch metric history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_accuracy: Vec<f64>,
}

/// Training state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingState {
    pub epoch: usize,
    pub best_val_accuracy: f64,
    pub best_epoch: usize,
    pub history: TrainingHistory,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self {
            epoch: 0,
            best_val_accuracy: 0.0,
            best_epoch: 0,
            history: TrainingHistory::default(),
        }
    }
}

/// Metrics for a single epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

/// Categorical cross-entropy of `logits` against one-hot `targets`, batch mean
pub fn categorical_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (log_probs * targets).sum_dim(1).mean().neg()
}

fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [batch_size, _] = logits.dims();
    let predictions = logits.argmax(1).reshape([batch_size]);
    let correct: i64 = predictions.equal(targets).int().sum().into_scalar().elem();
    correct as usize
}

/// Trainer for the soil classifier
pub struct Trainer {
    params: TrainingParams,
    state: TrainingState,
}

impl Trainer {
    pub fn new(params: TrainingParams) -> Self {
        Self {
            params,
            state: TrainingState::default(),
        }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Get current training state
    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.state.history
    }

    /// Records one epoch; returns whether validation accuracy improved
    pub fn update_epoch(
        &mut self,
        train_loss: f64,
        train_accuracy: f64,
        val_loss: f64,
        val_accuracy: f64,
    ) -> bool {
        self.state.epoch += 1;

        let history = &mut self.state.history;
        history.train_loss.push(train_loss);
        history.train_accuracy.push(train_accuracy);
        history.val_loss.push(val_loss);
        history.val_accuracy.push(val_accuracy);

        let improved = val_accuracy > self.state.best_val_accuracy;
        if improved {
            self.state.best_val_accuracy = val_accuracy;
            self.state.best_epoch = self.state.epoch;
        }

        info!(
            "Epoch {}/{}: loss={:.4}, acc={:.4}, val_loss={:.4}, val_acc={:.4}{}",
            self.state.epoch,
            self.params.num_epochs,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            if improved { " (best)" } else { "" }
        );

        improved
    }

    /// Trains a freshly initialized classifier on `train` and returns it
    ///
    /// `on_epoch` is invoked after every epoch with that epoch's metrics.
    pub fn fit<B: AutodiffBackend>(
        &mut self,
        train: &EncodedDataset,
        device: &B::Device,
        mut on_epoch: impl FnMut(&EpochMetrics),
    ) -> Result<SoilClassifier<B>> {
        if train.is_empty() {
            return Err(Error::Training("training subset is empty".to_string()));
        }

        let all: Vec<usize> = (0..train.len()).collect();
        let split = validation_tail_split(&all, self.params.validation_fraction)?;
        let fit_dataset = SoilBurnDataset::from_encoded(&train.select(&split.train))?;
        let val_dataset = SoilBurnDataset::from_encoded(&train.select(&split.test))?;

        B::seed(self.params.seed);
        let config = SoilClassifierConfig::from_params(&self.params, train.num_classes);
        let mut model = config.init::<B>(device);
        let mut optimizer = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();

        let batcher = SoilBatcher::<B>::new(device.clone(), train.num_classes);
        let val_batcher = SoilBatcher::<B::InnerBackend>::new(device.clone(), train.num_classes);

        info!(
            "Training on {} rows, validating on {} rows ({} epochs, batch size {}, {} parameters)",
            fit_dataset.len(),
            val_dataset.len(),
            self.params.num_epochs,
            self.params.batch_size,
            model.num_params()
        );

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        for epoch in 0..self.params.num_epochs {
            let mut order: Vec<usize> = (0..fit_dataset.len()).collect();
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0f64;
            let mut correct = 0usize;

            for chunk in order.chunks(self.params.batch_size) {
                let items: Vec<_> = chunk.iter().filter_map(|&i| fit_dataset.get(i)).collect();
                let batch = batcher.batch(items);

                let logits = model.forward(batch.features);
                let loss = categorical_cross_entropy(logits.clone(), batch.one_hot);

                let loss_value: f64 = loss.clone().into_scalar().elem();
                if !loss_value.is_finite() {
                    return Err(Error::Training(format!(
                        "loss became {loss_value} in epoch {}",
                        epoch + 1
                    )));
                }
                loss_sum += loss_value * chunk.len() as f64;
                correct += count_correct(logits, batch.targets);

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optimizer.step(self.params.learning_rate, model, grads);
            }

            let train_loss = loss_sum / fit_dataset.len() as f64;
            let train_accuracy = correct as f64 / fit_dataset.len() as f64;
            let (val_loss, val_accuracy) = score(
                &model.valid(),
                &val_dataset,
                &val_batcher,
                self.params.batch_size,
            );

            self.update_epoch(train_loss, train_accuracy, val_loss, val_accuracy);
            on_epoch(&EpochMetrics {
                epoch: epoch + 1,
                train_loss,
                train_accuracy,
                val_loss,
                val_accuracy,
            });
        }

        debug!(
            "Best validation accuracy {:.4} at epoch {}",
            self.state.best_val_accuracy, self.state.best_epoch
        );
        Ok(model)
    }
}

/// Mean loss and accuracy of `model` over `dataset`
fn score<B: Backend>(
    model: &SoilClassifier<B>,
    dataset: &SoilBurnDataset,
    batcher: &SoilBatcher<B>,
    batch_size: usize,
) -> (f64, f64) {
    let items = dataset.items();
    if items.is_empty() {
        return (0.0, 0.0);
    }

    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;
    for chunk in items.chunks(batch_size) {
        let batch = batcher.batch(chunk.to_vec());
        let logits = model.forward(batch.features);
        let loss: f64 = categorical_cross_entropy(logits.clone(), batch.one_hot)
            .into_scalar()
            .elem();
        loss_sum += loss * chunk.len() as f64;
        correct += count_correct(logits, batch.targets);
    }

    (
        loss_sum / items.len() as f64,
        correct as f64 / items.len() as f64,
    )
}
