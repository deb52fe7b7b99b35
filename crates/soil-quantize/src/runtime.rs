//! Integer reference inference for [`QuantizedModel`].
//!
//! Mirrors what the firmware executes: int8 inputs, int32 accumulation,
//! fixed-point requantization and a clamped int8 result per layer.

use soil_core::{Error, Result, NUM_FEATURES};

use crate::params::QuantParams;
use crate::quantizer::{QuantizedLayer, QuantizedModel};

/// Output of one integer forward pass
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedPrediction {
    pub class: usize,
    /// Int8 logits of the last dense layer
    pub logits: Vec<i8>,
    /// Softmax output in the 1/256 encoding
    pub scores: Vec<i8>,
}

impl QuantizedPrediction {
    /// Dequantized softmax probability of every class
    pub fn probabilities(&self) -> Vec<f32> {
        self.scores
            .iter()
            .map(|&q| QuantParams::SOFTMAX_OUTPUT.dequantize(q))
            .collect()
    }
}

impl QuantizedLayer {
    /// Integer dense layer with requantization and optional fused ReLU
    pub fn forward(&self, input: &[i8], input_zero_point: i32) -> Vec<i8> {
        let lower = if self.fused_relu {
            self.output.zero_point.clamp(-128, 127)
        } else {
            -128
        };

        self.weights
            .chunks(self.input_size)
            .zip(&self.bias)
            .map(|(row, &bias)| {
                let acc = row.iter().zip(input).fold(bias as i64, |acc, (&w, &x)| {
                    acc + (x as i64 - input_zero_point as i64) * w as i64
                });
                let acc = acc.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
                let value = self.multiplier.apply(acc).saturating_add(self.output.zero_point);
                value.clamp(lower, 127) as i8
            })
            .collect()
    }
}

impl QuantizedModel {
    pub fn quantize_input(&self, features: &[f32; NUM_FEATURES]) -> [i8; NUM_FEATURES] {
        features.map(|v| self.input.quantize(v))
    }

    /// Int8 logits for an already quantized input vector
    pub fn forward_int8(&self, input: &[i8]) -> Result<Vec<i8>> {
        if input.len() != NUM_FEATURES {
            return Err(Error::InvalidArgument(format!(
                "expected {NUM_FEATURES} inputs, got {}",
                input.len()
            )));
        }

        let mut activation = input.to_vec();
        let mut zero_point = self.input.zero_point;
        for layer in &self.layers {
            activation = layer.forward(&activation, zero_point);
            zero_point = layer.output.zero_point;
        }
        Ok(activation)
    }

    /// Softmax over int8 logits, re-encoded at the output scale
    pub fn softmax(&self, logits: &[i8]) -> Vec<i8> {
        let Some(last) = self.layers.last() else {
            return Vec::new();
        };
        let Some(&max) = logits.iter().max() else {
            return Vec::new();
        };

        let exps: Vec<f32> = logits
            .iter()
            .map(|&q| ((q as i32 - max as i32) as f32 * last.output.scale).exp())
            .collect();
        let sum: f32 = exps.iter().sum();
        exps.iter().map(|e| self.output.quantize(e / sum)).collect()
    }

    /// Quantizes `features`, runs the integer network and picks the top class
    pub fn predict(&self, features: &[f32; NUM_FEATURES]) -> Result<QuantizedPrediction> {
        let logits = self.forward_int8(&self.quantize_input(features))?;
        let class = logits
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, &q)| q)
            .map(|(index, _)| index)
            .ok_or_else(|| Error::Model("quantized model has no outputs".to_string()))?;
        let scores = self.softmax(&logits);

        Ok(QuantizedPrediction {
            class,
            logits,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FixedPointMultiplier;

    fn identity_model() -> QuantizedModel {
        // One layer passing features 0 and 1 straight through as two logits.
        let mut weights = vec![0i8; 2 * NUM_FEATURES];
        weights[0] = 127;
        weights[NUM_FEATURES + 1] = 127;
        let input = QuantParams {
            scale: 0.05,
            zero_point: 0,
        };
        let weight_scale = 1.0 / 127.0;
        let output = QuantParams {
            scale: 0.05,
            zero_point: 0,
        };
        let real = input.scale as f64 * weight_scale / output.scale as f64;
        QuantizedModel {
            input,
            layers: vec![QuantizedLayer {
                input_size: NUM_FEATURES,
                output_size: 2,
                weight_scale: weight_scale as f32,
                weights,
                bias: vec![0, 0],
                output,
                multiplier: FixedPointMultiplier::from_real(real).unwrap(),
                fused_relu: false,
            }],
            output: QuantParams::SOFTMAX_OUTPUT,
        }
    }

    #[test]
    fn test_identity_layer() {
        let model = identity_model();
        let mut features = [0.0f32; NUM_FEATURES];
        features[0] = 1.0;
        features[1] = -0.5;

        let prediction = model.predict(&features).unwrap();
        assert_eq!(prediction.logits, vec![20, -10]);
        assert_eq!(prediction.class, 0);

        let probs = prediction.probabilities();
        // softmax([1.0, -0.5])[0] = 0.8176
        assert!((probs[0] - 0.8176).abs() < 1.0 / 128.0);
    }

    #[test]
    fn test_fused_relu_clamps_at_zero_point() {
        let mut model = identity_model();
        model.layers[0].fused_relu = true;
        model.layers[0].output.zero_point = -128;

        let logits = model.forward_int8(&[-40, -40, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(logits.iter().all(|&q| q == -128));
    }

    #[test]
    fn test_ties_pick_first_class() {
        let model = identity_model();
        let mut features = [0.0f32; NUM_FEATURES];
        features[0] = 0.5;
        features[1] = 0.5;
        assert_eq!(model.predict(&features).unwrap().class, 0);
    }

    #[test]
    fn test_accumulator_saturates_near_bias_limit() {
        let mut model = identity_model();
        model.layers[0].bias = vec![i32::MAX - 10, i32::MIN + 10];

        let logits = model.forward_int8(&[127, -128, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(logits, vec![127, -128]);
    }

    #[test]
    fn test_wrong_input_length() {
        assert!(identity_model().forward_int8(&[0; 3]).is_err());
    }

    #[test]
    fn test_softmax_scores_sum_near_one() {
        let model = identity_model();
        let scores = model.softmax(&[10, -3]);
        let total: f32 = scores
            .iter()
            .map(|&q| QuantParams::SOFTMAX_OUTPUT.dequantize(q))
            .sum();
        assert!((total - 1.0).abs() < 2.0 / 256.0);
    }
}
