//! Training CLI Tool
//!
//! Fits the categorical encoders and scaler on the generated dataset, trains
//! the dense crop classifier, persists every artifact at its fixed path and
//! prints the scaler and class literals the firmware sketch embeds.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::module::{AutodiffModule, Module};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use soil_core::{load_pipeline_config, setup_cli_logging, PipelineConfig};
use soil_dataset::{read_samples, train_test_split, DatasetStatistics, FeaturePipeline};
use soil_training::{
    predict, reference_reading, save_model, Evaluator, FirmwareLiterals, SoilClassifierConfig,
    Trainer, TrainingBackend, TrainingManifest,
};
use tracing::info;

const EVAL_BATCH_SIZE: usize = 256;

/// Soil Crop Classifier Training Tool
#[derive(Parser, Debug)]
#[command(
    name = "soil-train",
    about = "Train the soil crop classifier",
    long_about = "Train the soil crop classifier on the generated dataset, save the model, \
                  encoders and scaler, and print the firmware literal block."
)]
struct Args {
    /// Path to pipeline configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override number of epochs
    #[arg(short, long, value_name = "N")]
    epochs: Option<usize>,

    /// Override learning rate
    #[arg(short, long, value_name = "LR")]
    lr: Option<f64>,

    /// Override batch size
    #[arg(short, long, value_name = "SIZE")]
    batch_size: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_cli_logging(args.verbose)?;

    info!("Isan Soil Crop Pipeline - Training Tool");
    info!("=======================================");

    let mut config = load_pipeline_config(args.config.as_deref())
        .context("Failed to load configuration file")?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    print_config_summary(&config);
    run_training(&config)?;

    info!("Training completed successfully!");

    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &Args) {
    if let Some(epochs) = args.epochs {
        config.training.num_epochs = epochs;
    }
    if let Some(lr) = args.lr {
        config.training.learning_rate = lr;
    }
    if let Some(batch_size) = args.batch_size {
        config.training.batch_size = batch_size;
    }
}

fn print_config_summary(config: &PipelineConfig) {
    let params = &config.training;
    info!("");
    info!("Configuration Summary:");
    info!("  Dataset: {}", config.paths.dataset.display());
    info!("  Epochs: {}", params.num_epochs);
    info!("  Batch size: {}", params.batch_size);
    info!("  Learning rate: {}", params.learning_rate);
    info!("  Dropout: {}", params.dropout);
    info!("  Test fraction: {}", params.test_fraction);
    info!("  Validation fraction: {}", params.validation_fraction);
    info!("  Seed: {}", params.seed);
    info!("");
}

fn run_training(config: &PipelineConfig) -> Result<()> {
    let paths = &config.paths;
    let params = &config.training;

    info!("Loading dataset...");
    let samples = read_samples(&paths.dataset)
        .with_context(|| format!("Failed to read dataset: {}", paths.dataset.display()))?;
    let stats = DatasetStatistics::compute(&samples);
    info!(
        "Loaded {} samples covering {} crops",
        stats.num_samples, stats.num_classes
    );

    let pipeline = FeaturePipeline::fit(&samples).context("Failed to fit encoders and scaler")?;
    let encoded = pipeline.encode_dataset(&samples)?;
    let split = train_test_split(encoded.len(), params.test_fraction, params.seed)?;
    let train = encoded.select(&split.train);
    let test = encoded.select(&split.test);
    info!("Split: {} training rows, {} test rows", train.len(), test.len());

    let progress = ProgressBar::new(params.num_epochs as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} epochs ({eta}) {msg}")?
            .progress_chars("=>-"),
    );

    let device = Default::default();
    let mut trainer = Trainer::new(params.clone());
    let model = trainer
        .fit::<TrainingBackend>(&train, &device, |metrics| {
            progress.set_message(format!("val_acc={:.4}", metrics.val_accuracy));
            progress.inc(1);
        })
        .context("Training failed")?;
    progress.finish_with_message("Training completed");
    let model = model.valid();

    let evaluation = Evaluator::new(&model, device.clone(), EVAL_BATCH_SIZE).evaluate(&test)?;
    info!("");
    info!("Training Summary:");
    info!(
        "  Best validation accuracy: {:.4} (epoch {})",
        trainer.state().best_val_accuracy,
        trainer.state().best_epoch
    );
    info!("  Macro F1: {:.4}", evaluation.macro_f1());
    println!("Test Accuracy: {:.4}", evaluation.accuracy);

    save_model(&model, &paths.model).context("Failed to save model")?;
    pipeline
        .save(paths)
        .context("Failed to save encoders and scaler")?;
    TrainingManifest::new(
        SoilClassifierConfig::from_params(params, pipeline.num_classes()),
        model.num_params(),
        params.num_epochs,
        train.len(),
        test.len(),
        trainer.state().best_val_accuracy,
        evaluation.accuracy,
        pipeline.class_names().to_vec(),
    )
    .save(&paths.manifest)
    .context("Failed to save training manifest")?;

    let prediction = predict(&model, &pipeline, &reference_reading(), &device)?;
    info!(
        "Reference reading -> {} (confidence {:.4})",
        prediction.plant, prediction.confidence
    );

    println!("----- firmware literals -----");
    print!("{}", FirmwareLiterals::from_pipeline(&pipeline));
    println!("-----------------------------");

    Ok(())
}
