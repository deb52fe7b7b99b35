//! Core record types for the soil crop pipeline.

use serde::{Deserialize, Serialize};

/// Number of model input features
pub const NUM_FEATURES: usize = 8;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "moisture",
    "pH",
    "N",
    "P",
    "K",
    "region_encoded",
    "soil_type_encoded",
    "season_encoded",
];

/// CSV header of the dataset file
pub const CSV_HEADER: [&str; 9] = [
    "moisture",
    "pH",
    "N",
    "P",
    "K",
    "region",
    "soil_type",
    "season",
    "plant",
];

/// One soil-sensor reading with its categorical context and crop label.
///
/// Field order matches the dataset CSV columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    pub moisture: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    pub region: String,
    pub soil_type: String,
    pub season: String,
    pub plant: String,
}

impl SoilSample {
    /// Continuous readings in feature order (moisture, pH, N, P, K)
    pub fn readings(&self) -> [f64; 5] {
        [
            self.moisture,
            self.ph,
            self.nitrogen,
            self.phosphorus,
            self.potassium,
        ]
    }

    /// Value of a categorical column
    pub fn category(&self, column: CategoricalColumn) -> &str {
        match column {
            CategoricalColumn::Region => &self.region,
            CategoricalColumn::SoilType => &self.soil_type,
            CategoricalColumn::Season => &self.season,
            CategoricalColumn::Plant => &self.plant,
        }
    }
}

/// Unlabelled sensor reading, the input of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub moisture: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub region: String,
    pub soil_type: String,
    pub season: String,
}

/// Anything that carries the eight model input fields
pub trait FeatureRow {
    /// Continuous readings in feature order (moisture, pH, N, P, K)
    fn readings(&self) -> [f64; 5];
    fn region(&self) -> &str;
    fn soil_type(&self) -> &str;
    fn season(&self) -> &str;
}

impl FeatureRow for SoilSample {
    fn readings(&self) -> [f64; 5] {
        SoilSample::readings(self)
    }
    fn region(&self) -> &str {
        &self.region
    }
    fn soil_type(&self) -> &str {
        &self.soil_type
    }
    fn season(&self) -> &str {
        &self.season
    }
}

impl FeatureRow for SoilReading {
    fn readings(&self) -> [f64; 5] {
        [
            self.moisture,
            self.ph,
            self.nitrogen,
            self.phosphorus,
            self.potassium,
        ]
    }
    fn region(&self) -> &str {
        &self.region
    }
    fn soil_type(&self) -> &str {
        &self.soil_type
    }
    fn season(&self) -> &str {
        &self.season
    }
}

impl From<&SoilSample> for SoilReading {
    fn from(sample: &SoilSample) -> Self {
        Self {
            moisture: sample.moisture,
            ph: sample.ph,
            nitrogen: sample.nitrogen,
            phosphorus: sample.phosphorus,
            potassium: sample.potassium,
            region: sample.region.clone(),
            soil_type: sample.soil_type.clone(),
            season: sample.season.clone(),
        }
    }
}

/// Categorical columns that get a fitted label encoder
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    Region,
    SoilType,
    Season,
    Plant,
}

impl CategoricalColumn {
    /// Input-feature columns, in model input order
    pub const FEATURES: [CategoricalColumn; 3] = [
        CategoricalColumn::Region,
        CategoricalColumn::SoilType,
        CategoricalColumn::Season,
    ];

    /// All encoded columns
    pub const ALL: [CategoricalColumn; 4] = [
        CategoricalColumn::Region,
        CategoricalColumn::SoilType,
        CategoricalColumn::Season,
        CategoricalColumn::Plant,
    ];

    /// CSV column name
    pub fn name(&self) -> &'static str {
        match self {
            CategoricalColumn::Region => "region",
            CategoricalColumn::SoilType => "soil_type",
            CategoricalColumn::Season => "season",
            CategoricalColumn::Plant => "plant",
        }
    }
}

impl std::fmt::Display for CategoricalColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
