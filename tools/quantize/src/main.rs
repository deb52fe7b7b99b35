//! Quantization CLI Tool
//!
//! Reloads the frozen encoders, scaler and trained network, calibrates on
//! every dataset row and writes the full-integer int8 model plus its firmware
//! header. A failed conversion is reported and the tool still re-saves the
//! encoders and exits successfully.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use soil_core::{load_pipeline_config, setup_cli_logging, Error};
use soil_quantize::{ExportSummary, QuantizationExporter};
use tracing::{info, warn};

/// Soil Crop Classifier Int8 Export Tool
#[derive(Parser, Debug)]
#[command(
    name = "soil-export",
    about = "Export the trained soil classifier as an int8 model",
    long_about = "Run full-integer post-training quantization of the trained soil classifier, \
                  calibrated on the generated dataset, and write the int8 artifact and C header."
)]
struct Args {
    /// Path to pipeline configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Limit the number of calibration rows
    #[arg(long, value_name = "N")]
    max_calibration_rows: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_cli_logging(args.verbose)?;

    info!("Isan Soil Crop Pipeline - Quantization Tool");
    info!("===========================================");

    let mut config = load_pipeline_config(args.config.as_deref())
        .context("Failed to load configuration file")?;
    if let Some(rows) = args.max_calibration_rows {
        config.quantization.max_calibration_rows = Some(rows);
    }
    config.validate()?;

    let exporter = QuantizationExporter::new(&config);
    let inputs = exporter
        .prepare()
        .context("Failed to load training artifacts")?;

    match exporter.convert(&inputs) {
        Ok(summary) => print_summary(&summary),
        Err(err @ Error::Quantization(_)) => {
            warn!("Int8 conversion skipped: {}", err);
            eprintln!("Quantization failed: {err}");
        }
        Err(err) => return Err(err).context("Failed to write quantized model"),
    }

    exporter
        .resave_encoders(&inputs.pipeline)
        .context("Failed to save encoders and scaler")?;

    info!("Quantization stage finished");

    Ok(())
}

fn print_summary(summary: &ExportSummary) {
    info!("");
    info!("Export Summary:");
    info!("  Calibration rows: {}", summary.calibration_rows);
    info!("  Layers: {}", summary.model.layers.len());
    info!("  Classes: {}", summary.model.num_classes());
    info!("  Parameters: {}", summary.model.num_parameters());
    info!(
        "  Input quantization: scale={}, zero_point={}",
        summary.model.input.scale, summary.model.input.zero_point
    );
    info!(
        "  Agreement with float model: {:.2}%",
        summary.agreement.agreement() * 100.0
    );
    info!("");
    println!(
        "Saved int8 model ({} bytes) to {}",
        summary.artifact_bytes,
        summary.artifact_path.display()
    );
    println!("Saved firmware header to {}", summary.header_path.display());
}
