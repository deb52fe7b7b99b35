//! Float vs int8 agreement over the calibration rows.

use burn::tensor::backend::Backend;
use soil_core::{Error, Result, NUM_FEATURES};
use soil_training::{Evaluator, SoilClassifier};

use crate::quantizer::QuantizedModel;

const BATCH_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct AgreementReport {
    pub rows: usize,
    /// Rows where both models pick the same class
    pub agreeing: usize,
    /// Largest absolute probability difference on any class
    pub max_probability_error: f32,
    pub mean_probability_error: f32,
}

impl AgreementReport {
    pub fn agreement(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.agreeing as f64 / self.rows as f64
        }
    }
}

/// Compares float and quantized predictions on `rows`
pub fn compare<B: Backend>(
    model: &SoilClassifier<B>,
    quantized: &QuantizedModel,
    rows: &[[f32; NUM_FEATURES]],
    device: &B::Device,
) -> Result<AgreementReport> {
    if quantized.num_classes() != model.num_classes() {
        return Err(Error::Quantization(format!(
            "quantized model has {} classes, float model {}",
            quantized.num_classes(),
            model.num_classes()
        )));
    }

    let evaluator = Evaluator::new(model, device.clone(), BATCH_SIZE);
    let float_probs = evaluator.predict_proba(rows);
    let float_classes = evaluator.predict_classes(rows);

    let mut agreeing = 0usize;
    let mut max_error = 0.0f32;
    let mut error_sum = 0.0f64;
    let mut values = 0usize;

    for ((row, probs), &class) in rows.iter().zip(&float_probs).zip(&float_classes) {
        let prediction = quantized.predict(row)?;
        if prediction.class == class {
            agreeing += 1;
        }
        for (p, q) in probs.iter().zip(prediction.probabilities()) {
            let error = (p - q).abs();
            max_error = max_error.max(error);
            error_sum += error as f64;
            values += 1;
        }
    }

    Ok(AgreementReport {
        rows: rows.len(),
        agreeing,
        max_probability_error: max_error,
        mean_probability_error: if values == 0 {
            0.0
        } else {
            (error_sum / values as f64) as f32
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantizer::quantize_model;
    use soil_training::{InferenceBackend, SoilClassifierConfig};

    #[test]
    fn test_report_counts_rows() {
        let device = Default::default();
        let model = SoilClassifierConfig::new(5).init::<InferenceBackend>(&device);
        let rows: Vec<[f32; NUM_FEATURES]> = (0..40)
            .map(|i| [(i as f32 - 20.0) / 10.0; NUM_FEATURES])
            .collect();
        let quantized = quantize_model(&model, &rows).unwrap();

        let report = compare(&model, &quantized, &rows, &device).unwrap();
        assert_eq!(report.rows, 40);
        assert!(report.agreeing <= 40);
        assert!(report.max_probability_error <= 1.0);
        assert!(report.mean_probability_error <= report.max_probability_error);
    }

    #[test]
    fn test_class_count_mismatch() {
        let device = Default::default();
        let model = SoilClassifierConfig::new(5).init::<InferenceBackend>(&device);
        let other = SoilClassifierConfig::new(4).init::<InferenceBackend>(&device);
        let rows = vec![[0.5f32; NUM_FEATURES]; 4];
        let quantized = quantize_model(&other, &rows).unwrap();
        assert!(compare(&model, &quantized, &rows, &device).is_err());
    }

    #[test]
    fn test_agreement_ratio() {
        let report = AgreementReport {
            rows: 8,
            agreeing: 6,
            max_probability_error: 0.1,
            mean_probability_error: 0.01,
        };
        assert_eq!(report.agreement(), 0.75);
    }
}
