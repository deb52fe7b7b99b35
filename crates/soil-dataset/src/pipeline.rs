//! The frozen feature encoding contract.
//!
//! A [`FeaturePipeline`] is fitted once by the trainer, persisted as one file
//! per encoder plus one for the scaler, and loaded unchanged by every later
//! stage. All transforms go through the same instance, so training and
//! calibration see bit-identical input vectors.

use soil_core::{
    ArtifactPaths, CategoricalColumn, Error, FeatureRow, Result, SoilSample, NUM_FEATURES,
};
use tracing::{debug, info};

use crate::encoder::LabelEncoder;
use crate::scaler::StandardScaler;

/// Encoded and scaled dataset ready for training
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    pub features: Vec<[f32; NUM_FEATURES]>,
    pub labels: Vec<usize>,
    pub num_classes: usize,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> EncodedDataset {
        EncodedDataset {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            num_classes: self.num_classes,
        }
    }
}

/// Fitted encoders for every categorical column plus the feature scaler
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePipeline {
    region: LabelEncoder,
    soil_type: LabelEncoder,
    season: LabelEncoder,
    plant: LabelEncoder,
    scaler: StandardScaler,
}

impl FeaturePipeline {
    /// Fits all four encoders and the scaler on `samples`
    pub fn fit(samples: &[SoilSample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::Dataset("cannot fit on an empty dataset".to_string()));
        }

        let fit_column = |column: CategoricalColumn| {
            LabelEncoder::fit(column, samples.iter().map(|s| s.category(column)))
        };
        let region = fit_column(CategoricalColumn::Region)?;
        let soil_type = fit_column(CategoricalColumn::SoilType)?;
        let season = fit_column(CategoricalColumn::Season)?;
        let plant = fit_column(CategoricalColumn::Plant)?;

        let raw = samples
            .iter()
            .map(|s| encode_row(&region, &soil_type, &season, s))
            .collect::<Result<Vec<_>>>()?;
        let scaler = StandardScaler::fit(&raw)?;

        info!(
            "Fitted feature pipeline: {} regions, {} soil types, {} seasons, {} plants",
            region.len(),
            soil_type.len(),
            season.len(),
            plant.len()
        );
        Self::from_parts(region, soil_type, season, plant, scaler)
    }

    /// Assembles a pipeline from already fitted parts
    pub fn from_parts(
        region: LabelEncoder,
        soil_type: LabelEncoder,
        season: LabelEncoder,
        plant: LabelEncoder,
        scaler: StandardScaler,
    ) -> Result<Self> {
        let parts = [
            (&region, CategoricalColumn::Region),
            (&soil_type, CategoricalColumn::SoilType),
            (&season, CategoricalColumn::Season),
            (&plant, CategoricalColumn::Plant),
        ];
        for (encoder, column) in parts {
            if encoder.column() != column {
                return Err(Error::InvalidArgument(format!(
                    "{} encoder passed in the {column} slot",
                    encoder.column()
                )));
            }
        }
        Ok(Self {
            region,
            soil_type,
            season,
            plant,
            scaler,
        })
    }

    pub fn encoder(&self, column: CategoricalColumn) -> &LabelEncoder {
        match column {
            CategoricalColumn::Region => &self.region,
            CategoricalColumn::SoilType => &self.soil_type,
            CategoricalColumn::Season => &self.season,
            CategoricalColumn::Plant => &self.plant,
        }
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Plant names in class-index order
    pub fn class_names(&self) -> &[String] {
        self.plant.classes()
    }

    pub fn num_classes(&self) -> usize {
        self.plant.len()
    }

    /// Unscaled feature vector `[moisture, pH, N, P, K, region, soil, season]`
    pub fn raw_features<R: FeatureRow + ?Sized>(&self, row: &R) -> Result<[f64; NUM_FEATURES]> {
        encode_row(&self.region, &self.soil_type, &self.season, row)
    }

    /// Encoded and standardized model input for one row
    pub fn transform<R: FeatureRow + ?Sized>(&self, row: &R) -> Result<[f32; NUM_FEATURES]> {
        Ok(self.scaler.transform(&self.raw_features(row)?))
    }

    pub fn transform_batch<R: FeatureRow>(&self, rows: &[R]) -> Result<Vec<[f32; NUM_FEATURES]>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }

    pub fn encode_label(&self, plant: &str) -> Result<usize> {
        self.plant.encode(plant)
    }

    pub fn decode_label(&self, class: usize) -> Result<&str> {
        self.plant.decode(class)
    }

    /// Transforms every sample and encodes its label
    pub fn encode_dataset(&self, samples: &[SoilSample]) -> Result<EncodedDataset> {
        let features = self.transform_batch(samples)?;
        let labels = samples
            .iter()
            .map(|s| self.encode_label(&s.plant))
            .collect::<Result<Vec<_>>>()?;
        Ok(EncodedDataset {
            features,
            labels,
            num_classes: self.num_classes(),
        })
    }

    /// Writes each encoder and the scaler to its fixed path, overwriting
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        for column in CategoricalColumn::ALL {
            let path = paths.encoder(column);
            self.encoder(column).save(path)?;
            debug!("Saved {column} encoder to {}", path.display());
        }
        self.scaler.save(&paths.scaler)?;
        info!("Saved encoders and scaler");
        Ok(())
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let load = |column: CategoricalColumn| LabelEncoder::load(paths.encoder(column), column);
        let pipeline = Self::from_parts(
            load(CategoricalColumn::Region)?,
            load(CategoricalColumn::SoilType)?,
            load(CategoricalColumn::Season)?,
            load(CategoricalColumn::Plant)?,
            StandardScaler::load(&paths.scaler)?,
        )?;
        info!(
            "Loaded feature pipeline ({} classes, scaler fitted on {} rows)",
            pipeline.num_classes(),
            pipeline.scaler.n_samples_seen
        );
        Ok(pipeline)
    }
}

fn encode_row<R: FeatureRow + ?Sized>(
    region: &LabelEncoder,
    soil_type: &LabelEncoder,
    season: &LabelEncoder,
    row: &R,
) -> Result<[f64; NUM_FEATURES]> {
    let [moisture, ph, nitrogen, phosphorus, potassium] = row.readings();
    Ok([
        moisture,
        ph,
        nitrogen,
        phosphorus,
        potassium,
        region.encode(row.region())? as f64,
        soil_type.encode(row.soil_type())? as f64,
        season.encode(row.season())? as f64,
    ])
}
