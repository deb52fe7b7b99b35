//! Dataset Generation Tool
//!
//! Writes the synthetic Isan soil-sensor dataset: one row per crop and
//! replicate, sampled around the regional means and clamped to each crop's
//! profile ranges.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use soil_core::{load_pipeline_config, setup_cli_logging, PipelineConfig};
use soil_dataset::{write_samples, DatasetGenerator, DatasetStatistics};
use tracing::{debug, info};

const READING_NAMES: [&str; 5] = ["moisture", "pH", "N", "P", "K"];

/// Isan Soil Dataset Generator
#[derive(Parser, Debug)]
#[command(
    name = "soil-generate",
    about = "Generate the synthetic Isan soil-sensor dataset",
    long_about = "Generate the synthetic Isan soil-sensor dataset. With no flags the \
                  fixed default sample count and output path are used."
)]
struct Args {
    /// Path to pipeline configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override samples per crop
    #[arg(short, long, value_name = "N")]
    samples_per_crop: Option<usize>,

    /// Override random seed
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override output CSV path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_cli_logging(args.verbose)?;

    info!("Isan Soil Crop Pipeline - Dataset Generator");
    info!("===========================================");

    let mut config = load_pipeline_config(args.config.as_deref())
        .context("Failed to load configuration file")?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let generator = DatasetGenerator::from_config(&config.generation);
    info!(
        "Generating {} samples for each of {} crops",
        config.generation.samples_per_crop,
        generator.profiles().len()
    );

    let samples = generator
        .generate_seeded(config.generation.seed)
        .context("Failed to generate samples")?;

    write_samples(&config.paths.dataset, &samples).with_context(|| {
        format!(
            "Failed to write dataset: {}",
            config.paths.dataset.display()
        )
    })?;

    print_statistics(&DatasetStatistics::compute(&samples));
    for sample in samples.iter().take(5) {
        debug!("{:?}", sample);
    }

    println!(
        "Generated {} rows for {} crops -> {}",
        samples.len(),
        generator.profiles().len(),
        config.paths.dataset.display()
    );

    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &Args) {
    if let Some(samples_per_crop) = args.samples_per_crop {
        config.generation.samples_per_crop = samples_per_crop;
    }
    if let Some(seed) = args.seed {
        config.generation.seed = Some(seed);
    }
    if let Some(ref output) = args.output {
        config.paths.dataset = output.clone();
    }
}

fn print_statistics(stats: &DatasetStatistics) {
    info!("");
    info!("Dataset Summary:");
    info!("  Samples: {}", stats.num_samples);
    info!("  Crops: {}", stats.num_classes);
    for (soil, count) in &stats.soil_distribution {
        info!("  Soil {}: {}", soil, count);
    }
    for (season, count) in &stats.season_distribution {
        info!("  Season {}: {}", season, count);
    }
    for (name, (min, max)) in READING_NAMES.iter().zip(stats.reading_ranges) {
        info!("  {}: [{}, {}]", name, min, max);
    }
    info!("");
}
