//! C literal block for the microcontroller sketch.
//!
//! The firmware scales raw sensor readings itself, so it needs the scaler
//! statistics and the class names in exactly the order the model uses.

use std::fmt;

use soil_core::NUM_FEATURES;
use soil_dataset::FeaturePipeline;

/// Scaler statistics and class names rendered as C declarations
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareLiterals {
    pub mean: [f64; NUM_FEATURES],
    pub scale: [f64; NUM_FEATURES],
    pub classes: Vec<String>,
}

impl FirmwareLiterals {
    pub fn from_pipeline(pipeline: &FeaturePipeline) -> Self {
        Self {
            mean: pipeline.scaler().mean,
            scale: pipeline.scaler().scale,
            classes: pipeline.class_names().to_vec(),
        }
    }
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn c_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

impl fmt::Display for FirmwareLiterals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "const float scaler_mean[{NUM_FEATURES}] = {{{}}};",
            join_floats(&self.mean)
        )?;
        writeln!(
            f,
            "const float scaler_scale[{NUM_FEATURES}] = {{{}}};",
            join_floats(&self.scale)
        )?;
        let classes: Vec<String> = self.classes.iter().map(|c| c_string(c)).collect();
        writeln!(f, "const char* plant_classes[] = {{{}}};", classes.join(", "))
    }
}
