//! Synthetic soil-sensor dataset generation.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use soil_core::{Error, GenerationConfig, Result, SoilSample};
use tracing::{debug, info};

use crate::crops::{isan_profiles, CropProfile, RegionalMeans, REGION, SEASONS, SOIL_TYPES};

/// Generates one labelled row per (crop, replicate)
#[derive(Debug, Clone)]
pub struct DatasetGenerator {
    profiles: Vec<CropProfile>,
    means: RegionalMeans,
    region: String,
    soil_types: Vec<String>,
    seasons: Vec<String>,
    samples_per_crop: usize,
}

impl DatasetGenerator {
    /// Generator over the Isan crop table and Phang Khon means
    pub fn isan(samples_per_crop: usize) -> Self {
        Self {
            profiles: isan_profiles(),
            means: RegionalMeans::PHANG_KHON,
            region: REGION.to_string(),
            soil_types: SOIL_TYPES.iter().map(|s| s.to_string()).collect(),
            seasons: SEASONS.iter().map(|s| s.to_string()).collect(),
            samples_per_crop,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::isan(config.samples_per_crop)
    }

    /// Replaces the crop table
    pub fn with_profiles(mut self, profiles: Vec<CropProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn profiles(&self) -> &[CropProfile] {
        &self.profiles
    }

    /// Total rows a call to `generate` produces
    pub fn expected_rows(&self) -> usize {
        self.profiles.len() * self.samples_per_crop
    }

    /// Generates with a seeded RNG, or an OS-seeded one when `seed` is `None`
    pub fn generate_seeded(&self, seed: Option<u64>) -> Result<Vec<SoilSample>> {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.generate(&mut rng)
    }

    /// Draws every row: readings around the regional means clamped to the
    /// crop ranges, uniform soil type and season, constant region.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<SoilSample>> {
        if self.soil_types.is_empty() || self.seasons.is_empty() {
            return Err(Error::Dataset(
                "soil type and season vocabularies must not be empty".to_string(),
            ));
        }

        let mut samples = Vec::with_capacity(self.expected_rows());
        for profile in &self.profiles {
            for _ in 0..self.samples_per_crop {
                let [moisture, ph, nitrogen, phosphorus, potassium] =
                    profile.sample(&self.means, rng)?;

                let soil_type = self
                    .soil_types
                    .choose(rng)
                    .ok_or_else(|| Error::Dataset("empty soil types".to_string()))?;
                let season = self
                    .seasons
                    .choose(rng)
                    .ok_or_else(|| Error::Dataset("empty seasons".to_string()))?;

                samples.push(SoilSample {
                    moisture: round_to(moisture, 1),
                    ph: round_to(ph, 2),
                    nitrogen: round_to(nitrogen, 2),
                    phosphorus: round_to(phosphorus, 2),
                    potassium: round_to(potassium, 2),
                    region: self.region.clone(),
                    soil_type: soil_type.clone(),
                    season: season.clone(),
                    plant: profile.name.clone(),
                });
            }
            debug!("Generated {} rows for {}", self.samples_per_crop, profile.name);
        }

        info!(
            "Generated {} rows for {} crops",
            samples.len(),
            self.profiles.len()
        );
        Ok(samples)
    }
}

/// Rounds to `decimals` places. Range bounds carry at most two decimals, so
/// rounding a clamped value never leaves its range.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crops::FeatureRange;
    use std::collections::HashMap;

    #[test]
    fn test_one_row_per_crop_replicate() {
        let generator = DatasetGenerator::isan(10);
        let samples = generator.generate_seeded(Some(1)).unwrap();
        assert_eq!(samples.len(), 220);
        assert_eq!(generator.expected_rows(), 220);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for s in &samples {
            *counts.entry(s.plant.as_str()).or_default() += 1;
        }
        assert_eq!(counts.len(), 22);
        assert!(counts.values().all(|&c| c == 10));
    }

    #[test]
    fn test_every_reading_within_crop_bounds() {
        let generator = DatasetGenerator::isan(50);
        let samples = generator.generate_seeded(Some(7)).unwrap();
        let profiles: HashMap<_, _> = generator
            .profiles()
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect();

        for sample in &samples {
            let profile = &profiles[&sample.plant];
            for (value, range) in sample.readings().iter().zip(profile.ranges()) {
                assert!(
                    range.contains(*value),
                    "{} out of [{}, {}] for {}",
                    value,
                    range.min,
                    range.max,
                    sample.plant
                );
            }
        }
    }

    #[test]
    fn test_categoricals_from_fixed_vocabularies() {
        let samples = DatasetGenerator::isan(20).generate_seeded(Some(3)).unwrap();
        for s in &samples {
            assert_eq!(s.region, REGION);
            assert!(SOIL_TYPES.contains(&s.soil_type.as_str()));
            assert!(SEASONS.contains(&s.season.as_str()));
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let generator = DatasetGenerator::isan(5);
        let a = generator.generate_seeded(Some(99)).unwrap();
        let b = generator.generate_seeded(Some(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_range_mean_clamps_to_bounds() {
        let profile = CropProfile {
            name: "ทดสอบ".to_string(),
            moisture: FeatureRange::new(90.0, 95.0, 0.5),
            ph: FeatureRange::new(7.5, 8.0, 0.1),
            nitrogen: FeatureRange::new(100.0, 120.0, 1.0),
            phosphorus: FeatureRange::new(40.0, 50.0, 1.0),
            potassium: FeatureRange::new(10.0, 20.0, 1.0),
        };
        let samples = DatasetGenerator::isan(30)
            .with_profiles(vec![profile])
            .generate_seeded(Some(5))
            .unwrap();

        // Regional means sit far outside every range, so every draw clamps.
        for s in &samples {
            assert_eq!(s.moisture, 90.0);
            assert_eq!(s.ph, 7.5);
            assert_eq!(s.nitrogen, 100.0);
            assert_eq!(s.phosphorus, 40.0);
            assert_eq!(s.potassium, 20.0);
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(55.04, 1), 55.0);
        assert_eq!(round_to(5.126, 2), 5.13);
    }
}
