//! Single-row prediction through the frozen feature pipeline.

use burn::tensor::backend::Backend;
use soil_core::{Error, FeatureRow, Result, SoilReading};
use soil_dataset::FeaturePipeline;

use crate::evaluator::features_tensor;
use crate::model::SoilClassifier;

/// Predicted crop for one reading
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class: usize,
    pub plant: String,
    pub confidence: f32,
}

/// Typical Phang Khon rainy-season reading used as a smoke check after training
pub fn reference_reading() -> SoilReading {
    SoilReading {
        moisture: 55.0,
        ph: 5.0,
        nitrogen: 35.0,
        phosphorus: 5.0,
        potassium: 90.0,
        region: "อีสาน".to_string(),
        soil_type: "ดินร่วนทราย".to_string(),
        season: "ฝน".to_string(),
    }
}

/// Transforms `row`, runs the model and decodes the arg-max class
pub fn predict<B: Backend, R: FeatureRow + ?Sized>(
    model: &SoilClassifier<B>,
    pipeline: &FeaturePipeline,
    row: &R,
    device: &B::Device,
) -> Result<Prediction> {
    let features = pipeline.transform(row)?;
    let probs: Vec<f32> = model
        .forward_softmax(features_tensor(&[features], device))
        .into_data()
        .iter::<f32>()
        .collect();

    let (class, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| Error::Model("model produced no outputs".to_string()))?;

    Ok(Prediction {
        class,
        plant: pipeline.decode_label(class)?.to_string(),
        confidence,
    })
}
