//! Full-integer post-training quantization for the soil crop classifier.
//!
//! This crate provides:
//! - The calibration stream over the frozen feature pipeline
//! - Int8 quantization with int32 biases and fixed-point requantization
//! - The binary model artifact and its C header rendering
//! - Integer reference inference and a float/int8 agreement report

pub mod calibration;
pub mod exporter;
pub mod format;
pub mod header;
pub mod params;
pub mod quantizer;
pub mod report;
pub mod runtime;

pub use calibration::{CalibrationStream, RangeObserver};
pub use exporter::{ExportInputs, ExportSummary, QuantizationExporter};
pub use header::{render_c_header, write_c_header};
pub use params::{FixedPointMultiplier, QuantParams};
pub use quantizer::{extract_layers, quantize_layers, quantize_model, DenseLayer, QuantizedLayer, QuantizedModel};
pub use report::{compare, AgreementReport};
pub use runtime::QuantizedPrediction;
