//! Full-integer post-training quantization of the dense classifier.
//!
//! Weights are quantized symmetric per tensor, activations asymmetric with
//! ranges observed over the calibration vectors, biases to int32 at
//! `input_scale * weight_scale`. Hidden ReLUs are fused into the output clamp
//! and the softmax output uses the fixed 1/256 encoding.

use burn::nn::Linear;
use burn::tensor::backend::Backend;
use soil_core::{Error, Result, NUM_FEATURES};
use soil_training::SoilClassifier;
use tracing::{debug, info};

use crate::calibration::RangeObserver;
use crate::params::{FixedPointMultiplier, QuantParams};

/// Float weights of one dense layer, `weights[i * output_size + j]`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub input_size: usize,
    pub output_size: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    pub relu: bool,
}

impl DenseLayer {
    pub fn from_linear<B: Backend>(layer: &Linear<B>, relu: bool) -> Result<Self> {
        let weight = layer.weight.val();
        let [input_size, output_size] = weight.dims();
        let weights: Vec<f32> = weight.into_data().iter::<f32>().collect();
        let bias: Vec<f32> = match &layer.bias {
            Some(bias) => bias.val().into_data().iter::<f32>().collect(),
            None => vec![0.0; output_size],
        };

        let dense = Self {
            input_size,
            output_size,
            weights,
            bias,
            relu,
        };
        dense.check()?;
        Ok(dense)
    }

    fn check(&self) -> Result<()> {
        if self.weights.len() != self.input_size * self.output_size
            || self.bias.len() != self.output_size
        {
            return Err(Error::Quantization(format!(
                "dense layer {}x{} has {} weights and {} biases",
                self.input_size,
                self.output_size,
                self.weights.len(),
                self.bias.len()
            )));
        }
        if self.weights.iter().chain(&self.bias).any(|v| !v.is_finite()) {
            return Err(Error::Quantization(
                "model contains non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }

    /// Float forward pass of one row
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut output = self.bias.clone();
        for (i, &x) in input.iter().enumerate() {
            let row = &self.weights[i * self.output_size..(i + 1) * self.output_size];
            for (out, &w) in output.iter_mut().zip(row) {
                *out += x * w;
            }
        }
        if self.relu {
            output.iter_mut().for_each(|v| *v = v.max(0.0));
        }
        output
    }
}

/// Extracts the dense stack of a trained classifier in forward order
pub fn extract_layers<B: Backend>(model: &SoilClassifier<B>) -> Result<Vec<DenseLayer>> {
    let linears = model.layers();
    let last = linears.len() - 1;
    let layers = linears
        .iter()
        .enumerate()
        .map(|(index, linear)| DenseLayer::from_linear(linear, index != last))
        .collect::<Result<Vec<_>>>()?;
    check_topology(&layers)?;
    Ok(layers)
}

/// Requires a non-empty chain of dense layers fed by the feature vector
pub fn check_topology(layers: &[DenseLayer]) -> Result<()> {
    let first = layers
        .first()
        .ok_or_else(|| Error::Quantization("model has no layers".to_string()))?;
    if first.input_size != NUM_FEATURES {
        return Err(Error::Quantization(format!(
            "expected {NUM_FEATURES} inputs, model takes {}",
            first.input_size
        )));
    }
    for pair in layers.windows(2) {
        if pair[0].output_size != pair[1].input_size {
            return Err(Error::Quantization(format!(
                "layer widths do not chain: {} -> {}",
                pair[0].output_size, pair[1].input_size
            )));
        }
    }
    for layer in layers {
        layer.check()?;
    }
    Ok(())
}

/// One int8 dense layer, weights stored output-major `weights[j * input_size + i]`
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedLayer {
    pub input_size: usize,
    pub output_size: usize,
    pub weight_scale: f32,
    pub weights: Vec<i8>,
    pub bias: Vec<i32>,
    pub output: QuantParams,
    pub multiplier: FixedPointMultiplier,
    pub fused_relu: bool,
}

/// Integer-only classifier
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedModel {
    pub input: QuantParams,
    pub layers: Vec<QuantizedLayer>,
    pub output: QuantParams,
}

impl QuantizedModel {
    pub fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.output_size)
    }

    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.weights.len() + layer.bias.len())
            .sum()
    }
}

/// Observed activation ranges, input first then one per layer output
#[derive(Debug, Clone)]
pub struct ActivationRanges {
    pub input: RangeObserver,
    pub layers: Vec<RangeObserver>,
}

/// Runs the float network over the calibration vectors and records ranges
pub fn calibrate(layers: &[DenseLayer], calibration: &[[f32; NUM_FEATURES]]) -> Result<ActivationRanges> {
    if calibration.is_empty() {
        return Err(Error::Quantization(
            "calibration stream produced no rows".to_string(),
        ));
    }

    let mut ranges = ActivationRanges {
        input: RangeObserver::default(),
        layers: vec![RangeObserver::default(); layers.len()],
    };
    for (row_index, row) in calibration.iter().enumerate() {
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::Quantization(format!(
                "calibration row {row_index} contains non-finite values"
            )));
        }
        ranges.input.observe(row);

        let mut activation = row.to_vec();
        for (index, (layer, observer)) in layers.iter().zip(ranges.layers.iter_mut()).enumerate() {
            activation = layer.forward(&activation);
            if activation.iter().any(|v| !v.is_finite()) {
                return Err(Error::Quantization(format!(
                    "layer {index} activation overflowed on calibration row {row_index}"
                )));
            }
            observer.observe(&activation);
        }
    }

    let observed = std::iter::once(&ranges.input).chain(&ranges.layers);
    for (index, observer) in observed.enumerate() {
        if let Some((min, max)) = observer.range() {
            debug!("Activation {}: range [{:.4}, {:.4}]", index, min, max);
        }
    }
    Ok(ranges)
}

fn observed_params(observer: &RangeObserver) -> Result<QuantParams> {
    let (min, max) = observer
        .range()
        .ok_or_else(|| Error::Quantization("no activations observed".to_string()))?;
    QuantParams::asymmetric(min, max)
}

fn quantize_layer(layer: &DenseLayer, input: QuantParams, output: QuantParams) -> Result<QuantizedLayer> {
    let abs_max = layer.weights.iter().fold(0.0f32, |acc, w| acc.max(w.abs()));
    let weight_params = QuantParams::symmetric(abs_max)?;

    let mut weights = vec![0i8; layer.weights.len()];
    for i in 0..layer.input_size {
        for j in 0..layer.output_size {
            let w = layer.weights[i * layer.output_size + j];
            weights[j * layer.input_size + i] =
                (w / weight_params.scale).round().clamp(-127.0, 127.0) as i8;
        }
    }

    let bias_scale = input.scale as f64 * weight_params.scale as f64;
    let bias = layer
        .bias
        .iter()
        .map(|&b| {
            let q = (b as f64 / bias_scale).round();
            if q.abs() > i32::MAX as f64 {
                Err(Error::Quantization(format!(
                    "bias {b} overflows int32 at scale {bias_scale:e}"
                )))
            } else {
                Ok(q as i32)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let multiplier = FixedPointMultiplier::from_real(bias_scale / output.scale as f64)?;

    Ok(QuantizedLayer {
        input_size: layer.input_size,
        output_size: layer.output_size,
        weight_scale: weight_params.scale,
        weights,
        bias,
        output,
        multiplier,
        fused_relu: layer.relu,
    })
}

/// Quantizes float layers given calibration vectors
pub fn quantize_layers(
    layers: &[DenseLayer],
    calibration: &[[f32; NUM_FEATURES]],
) -> Result<QuantizedModel> {
    check_topology(layers)?;
    let ranges = calibrate(layers, calibration)?;

    let input = observed_params(&ranges.input)?;
    let mut current = input;
    let mut quantized = Vec::with_capacity(layers.len());
    for (layer, observer) in layers.iter().zip(&ranges.layers) {
        let output = observed_params(observer)?;
        quantized.push(quantize_layer(layer, current, output)?);
        current = output;
    }

    let model = QuantizedModel {
        input,
        layers: quantized,
        output: QuantParams::SOFTMAX_OUTPUT,
    };
    info!(
        "Quantized {} layers ({} parameters) over {} calibration rows; input scale={:.6}, zero_point={}",
        model.layers.len(),
        model.num_parameters(),
        calibration.len(),
        input.scale,
        input.zero_point
    );
    Ok(model)
}

/// Quantizes a trained classifier
pub fn quantize_model<B: Backend>(
    model: &SoilClassifier<B>,
    calibration: &[[f32; NUM_FEATURES]],
) -> Result<QuantizedModel> {
    let layers = extract_layers(model)?;
    quantize_layers(&layers, calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soil_training::{features_tensor, InferenceBackend, SoilClassifierConfig};

    fn tiny_layers() -> Vec<DenseLayer> {
        vec![
            DenseLayer {
                input_size: NUM_FEATURES,
                output_size: 2,
                weights: vec![
                    1.0, -1.0, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -0.5,
                    0.5,
                ],
                bias: vec![0.1, -0.2],
                relu: true,
            },
            DenseLayer {
                input_size: 2,
                output_size: 3,
                weights: vec![1.0, 0.0, -1.0, 0.0, 2.0, 0.5],
                bias: vec![0.0, 0.0, 0.3],
                relu: false,
            },
        ]
    }

    fn calibration_rows() -> Vec<[f32; NUM_FEATURES]> {
        (0..50)
            .map(|i| {
                let mut row = [0.0f32; NUM_FEATURES];
                for (k, v) in row.iter_mut().enumerate() {
                    *v = ((i * 7 + k * 3) % 17) as f32 / 8.0 - 1.0;
                }
                row
            })
            .collect()
    }

    #[test]
    fn test_dense_forward() {
        let layers = tiny_layers();
        let out = layers[0].forward(&[1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        // [1 + 1 + 0.1, -1 + 0.5 - 0.2] with ReLU
        assert!((out[0] - 2.1).abs() < 1e-6);
        assert!((out[1] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_extracted_layers_match_burn_forward() {
        let device = Default::default();
        let model = SoilClassifierConfig::new(22).init::<InferenceBackend>(&device);
        let layers = extract_layers(&model).unwrap();
        assert_eq!(layers.len(), 3);
        assert!(layers[0].relu && layers[1].relu && !layers[2].relu);

        let rows = calibration_rows();
        let expected: Vec<f32> = model
            .forward(features_tensor(&rows[..3], &device))
            .into_data()
            .iter::<f32>()
            .collect();
        for (r, row) in rows[..3].iter().enumerate() {
            let mut activation = row.to_vec();
            for layer in &layers {
                activation = layer.forward(&activation);
            }
            for (j, v) in activation.iter().enumerate() {
                assert!((v - expected[r * 22 + j]).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_quantized_model_shapes() {
        let device = Default::default();
        let model = SoilClassifierConfig::new(22).init::<InferenceBackend>(&device);
        let quantized = quantize_model(&model, &calibration_rows()).unwrap();

        assert_eq!(quantized.layers.len(), 3);
        assert_eq!(quantized.num_classes(), 22);
        assert_eq!(quantized.output, QuantParams::SOFTMAX_OUTPUT);
        assert_eq!(quantized.layers[0].weights.len(), 8 * 128);
        assert_eq!(quantized.layers[2].bias.len(), 22);
        // ReLU outputs start at zero, so their zero point sits at the bottom.
        assert_eq!(quantized.layers[0].output.zero_point, -128);
        assert!(quantized.layers.iter().all(|l| l.weights.iter().all(|&w| w >= -127)));
    }

    #[test]
    fn test_layer_scales_chain() {
        let rows = calibration_rows();
        let quantized = quantize_layers(&tiny_layers(), &rows).unwrap();
        let first = &quantized.layers[0];
        let second = &quantized.layers[1];

        let expected = quantized.input.scale as f64 * first.weight_scale as f64
            / first.output.scale as f64;
        assert!((first.multiplier.to_real() - expected).abs() / expected < 1e-6);

        let expected = first.output.scale as f64 * second.weight_scale as f64
            / second.output.scale as f64;
        assert!((second.multiplier.to_real() - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn test_empty_calibration_is_rejected() {
        let err = quantize_layers(&tiny_layers(), &[]).unwrap_err();
        assert!(matches!(err, Error::Quantization(_)));
    }

    #[test]
    fn test_non_finite_weights_are_rejected() {
        let mut layers = tiny_layers();
        layers[1].weights[0] = f32::NAN;
        assert!(quantize_layers(&layers, &calibration_rows()).is_err());
    }

    #[test]
    fn test_unsupported_topology_is_rejected() {
        let mut layers = tiny_layers();
        layers[1].input_size = 3;
        assert!(check_topology(&layers).is_err());
        assert!(check_topology(&[]).is_err());
        assert!(check_topology(&layers[1..]).is_err());
    }
}
