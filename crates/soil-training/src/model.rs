//! Dense soil-to-crop classifier.
//!
//! 8 scaled features -> 128 -> 64 -> one logit per plant class. Dropout is
//! only active on autodiff backends, so `model.valid()` predicts
//! deterministically.

use burn::{
    config::Config,
    module::Module,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu},
    tensor::{backend::Backend, Tensor},
};
use soil_core::{TrainingParams, NUM_FEATURES};

/// Configuration for the soil classifier
#[derive(Config, Debug)]
pub struct SoilClassifierConfig {
    /// Number of output classes, the size of the plant vocabulary
    pub num_classes: usize,

    /// Number of input features
    #[config(default = "8")]
    pub input_size: usize,

    /// Width of the first hidden layer
    #[config(default = "128")]
    pub hidden1: usize,

    /// Width of the second hidden layer
    #[config(default = "64")]
    pub hidden2: usize,

    /// Dropout after each hidden layer, training only
    #[config(default = "0.3")]
    pub dropout: f64,
}

impl SoilClassifierConfig {
    /// Builds the config from training hyperparameters
    pub fn from_params(params: &TrainingParams, num_classes: usize) -> Self {
        Self::new(num_classes)
            .with_input_size(NUM_FEATURES)
            .with_hidden1(params.hidden1)
            .with_hidden2(params.hidden2)
            .with_dropout(params.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SoilClassifier<B> {
        SoilClassifier::new(self, device)
    }
}

#[derive(Module, Debug)]
pub struct SoilClassifier<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    output: Linear<B>,
    dropout: Dropout,
    activation: Relu,
    num_classes: usize,
}

impl<B: Backend> SoilClassifier<B> {
    pub fn new(config: &SoilClassifierConfig, device: &B::Device) -> Self {
        Self {
            fc1: LinearConfig::new(config.input_size, config.hidden1).init(device),
            fc2: LinearConfig::new(config.hidden1, config.hidden2).init(device),
            output: LinearConfig::new(config.hidden2, config.num_classes).init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            activation: Relu::new(),
            num_classes: config.num_classes,
        }
    }

    /// Logits `[batch, num_classes]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        let x = self.fc2.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        self.output.forward(x)
    }

    /// Class probabilities `[batch, num_classes]`
    pub fn forward_softmax(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Dense layers in forward order
    pub fn layers(&self) -> [&Linear<B>; 3] {
        [&self.fc1, &self.fc2, &self.output]
    }
}
