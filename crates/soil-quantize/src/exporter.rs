//! Quantization stage orchestration.
//!
//! [`QuantizationExporter::prepare`] reloads everything the previous stages
//! froze; any failure there is fatal. [`QuantizationExporter::convert`] runs
//! the int8 conversion and writes its artifacts; its
//! [`Error::Quantization`] failures are recoverable for the caller.

use std::path::PathBuf;

use soil_core::{Error, PipelineConfig, Result, SoilSample, NUM_FEATURES};
use soil_dataset::{read_samples, FeaturePipeline};
use soil_training::{load_model, InferenceBackend, SoilClassifier, TrainingManifest};
use tracing::{info, warn};

use crate::calibration::CalibrationStream;
use crate::format;
use crate::header::write_c_header;
use crate::quantizer::{quantize_model, QuantizedModel};
use crate::report::{compare, AgreementReport};

/// Everything the conversion needs, loaded from the fixed artifact paths
pub struct ExportInputs {
    pub pipeline: FeaturePipeline,
    pub manifest: TrainingManifest,
    pub model: SoilClassifier<InferenceBackend>,
    pub samples: Vec<SoilSample>,
    pub calibration: Vec<[f32; NUM_FEATURES]>,
}

/// What a successful conversion produced
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub calibration_rows: usize,
    pub artifact_path: PathBuf,
    pub artifact_bytes: usize,
    pub header_path: PathBuf,
    pub agreement: AgreementReport,
    pub model: QuantizedModel,
}

pub struct QuantizationExporter<'a> {
    config: &'a PipelineConfig,
    device: <InferenceBackend as burn::tensor::backend::Backend>::Device,
}

impl<'a> QuantizationExporter<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            device: Default::default(),
        }
    }

    /// Reloads encoders, scaler, manifest, network and dataset, then
    /// transforms the calibration rows
    pub fn prepare(&self) -> Result<ExportInputs> {
        let paths = &self.config.paths;

        let pipeline = FeaturePipeline::load(paths)?;
        let manifest = TrainingManifest::load(&paths.manifest)?;
        if manifest.classes != pipeline.class_names() {
            return Err(Error::Model(
                "model manifest and plant encoder disagree on the class list".to_string(),
            ));
        }
        let model = load_model::<InferenceBackend>(&manifest.model, &paths.model, &self.device)?;

        let samples = read_samples(&paths.dataset)?;
        let calibration = CalibrationStream::new(
            &pipeline,
            &samples,
            self.config.quantization.max_calibration_rows,
        )
        .collect_vectors()?;
        info!(
            "Prepared {} calibration vectors from {} dataset rows",
            calibration.len(),
            samples.len()
        );

        Ok(ExportInputs {
            pipeline,
            manifest,
            model,
            samples,
            calibration,
        })
    }

    /// Quantizes the network, writes the artifact and firmware header, and
    /// checks the integer model against the float one
    pub fn convert(&self, inputs: &ExportInputs) -> Result<ExportSummary> {
        let paths = &self.config.paths;

        let quantized = quantize_model(&inputs.model, &inputs.calibration)?;

        let bytes = format::encode(&quantized)?;
        if format::decode(&bytes)? != quantized {
            return Err(Error::Quantization(
                "quantized artifact does not decode to the same model".to_string(),
            ));
        }
        let artifact_bytes = format::save(&quantized, &paths.quantized_model)?;
        write_c_header(&bytes, &paths.firmware_header)?;

        let agreement = compare(&inputs.model, &quantized, &inputs.calibration, &self.device)?;
        info!(
            "Float/int8 agreement: {}/{} rows ({:.2}%), max probability error {:.4}",
            agreement.agreeing,
            agreement.rows,
            agreement.agreement() * 100.0,
            agreement.max_probability_error
        );
        if agreement.agreement() < 0.9 {
            warn!("Int8 model disagrees with the float model on more than 10% of rows");
        }

        Ok(ExportSummary {
            calibration_rows: inputs.calibration.len(),
            artifact_path: paths.quantized_model.clone(),
            artifact_bytes,
            header_path: paths.firmware_header.clone(),
            agreement,
            model: quantized,
        })
    }

    /// Writes the frozen encoders and scaler back to their fixed paths
    pub fn resave_encoders(&self, pipeline: &FeaturePipeline) -> Result<()> {
        pipeline.save(&self.config.paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soil_core::{ArtifactPaths, CategoricalColumn, SoilReading, TrainingParams};
    use soil_dataset::{train_test_split, write_samples, DatasetGenerator};
    use soil_training::{
        predict, reference_reading, save_model, Evaluator, SoilClassifierConfig, Trainer,
        TrainingBackend,
    };
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PipelineConfig {
        let d = dir.path().join("models");
        PipelineConfig {
            paths: ArtifactPaths {
                dataset: d.join("data.csv"),
                model: d.join("model"),
                plant_encoder: d.join("plant.json"),
                region_encoder: d.join("region.json"),
                soil_encoder: d.join("soil.json"),
                season_encoder: d.join("season.json"),
                scaler: d.join("scaler.json"),
                manifest: d.join("manifest.json"),
                quantized_model: d.join("model.sqi8"),
                firmware_header: d.join("model.h"),
            },
            training: TrainingParams {
                num_epochs: 10,
                ..TrainingParams::default()
            },
            ..PipelineConfig::default()
        }
    }

    /// Runs the generate and train stages into `config.paths`
    fn run_upstream(config: &PipelineConfig) -> (FeaturePipeline, Vec<SoilSample>) {
        let samples = DatasetGenerator::isan(15).generate_seeded(Some(42)).unwrap();
        write_samples(&config.paths.dataset, &samples).unwrap();

        let samples = read_samples(&config.paths.dataset).unwrap();
        let pipeline = FeaturePipeline::fit(&samples).unwrap();
        let encoded = pipeline.encode_dataset(&samples).unwrap();
        let split = train_test_split(encoded.len(), 0.2, 42).unwrap();
        let train = encoded.select(&split.train);
        let test = encoded.select(&split.test);

        let device = Default::default();
        let mut trainer = Trainer::new(config.training.clone());
        let model = trainer
            .fit::<TrainingBackend>(&train, &device, |_| {})
            .unwrap();
        let model = burn::module::AutodiffModule::valid(&model);

        let evaluation = Evaluator::new(&model, device, 32).evaluate(&test).unwrap();
        save_model(&model, &config.paths.model).unwrap();
        pipeline.save(&config.paths).unwrap();
        TrainingManifest::new(
            SoilClassifierConfig::from_params(&config.training, pipeline.num_classes()),
            burn::module::Module::num_params(&model),
            config.training.num_epochs,
            train.len(),
            test.len(),
            trainer.state().best_val_accuracy,
            evaluation.accuracy,
            pipeline.class_names().to_vec(),
        )
        .save(&config.paths.manifest)
        .unwrap();

        (pipeline, samples)
    }

    #[test]
    fn test_end_to_end_export() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let (pipeline, samples) = run_upstream(&config);

        let exporter = QuantizationExporter::new(&config);
        let inputs = exporter.prepare().unwrap();

        // Reloaded pipeline transforms exactly like the one used for training.
        assert_eq!(inputs.pipeline, pipeline);
        assert_eq!(inputs.calibration.len(), samples.len());
        let reading = reference_reading();
        assert_eq!(
            inputs.pipeline.transform(&reading).unwrap().map(f32::to_bits),
            pipeline.transform(&reading).unwrap().map(f32::to_bits)
        );

        let summary = exporter.convert(&inputs).unwrap();
        assert_eq!(summary.calibration_rows, samples.len());
        assert!(summary.artifact_path.exists());
        assert!(summary.header_path.exists());
        assert_eq!(summary.model.num_classes(), 22);

        let loaded = format::load(&config.paths.quantized_model).unwrap();
        assert_eq!(loaded, summary.model);

        for vector in &inputs.calibration {
            let q = loaded.quantize_input(vector);
            assert_eq!(q.len(), NUM_FEATURES);
        }
        let prediction = loaded
            .predict(&inputs.pipeline.transform(&reading).unwrap())
            .unwrap();
        assert!(prediction.class < 22);

        let float = predict(&inputs.model, &inputs.pipeline, &reading, &Default::default()).unwrap();
        assert!(float.class < 22);
        assert!(summary.agreement.agreement() > 0.5);

        exporter.resave_encoders(&inputs.pipeline).unwrap();
        assert_eq!(FeaturePipeline::load(&config.paths).unwrap(), pipeline);
    }

    #[test]
    fn test_prepare_fails_on_unknown_category() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let (_, mut samples) = run_upstream(&config);

        samples[0].soil_type = "ดินลูกรัง".to_string();
        write_samples(&config.paths.dataset, &samples).unwrap();

        let err = QuantizationExporter::new(&config).prepare().err().unwrap();
        assert!(matches!(
            err,
            Error::UnknownCategory {
                column: CategoricalColumn::SoilType,
                ..
            }
        ));
    }

    #[test]
    fn test_prepare_fails_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        assert!(QuantizationExporter::new(&config).prepare().is_err());
    }

    #[test]
    fn test_empty_calibration_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        run_upstream(&config);

        let exporter = QuantizationExporter::new(&config);
        let mut inputs = exporter.prepare().unwrap();
        inputs.calibration.clear();

        let err = exporter.convert(&inputs).unwrap_err();
        assert!(matches!(err, Error::Quantization(_)));
        assert!(!config.paths.quantized_model.exists());

        // Encoders can still be written after a failed conversion.
        exporter.resave_encoders(&inputs.pipeline).unwrap();
        let reading = SoilReading::from(&inputs.samples[0]);
        assert!(FeaturePipeline::load(&config.paths)
            .unwrap()
            .transform(&reading)
            .is_ok());
    }
}
