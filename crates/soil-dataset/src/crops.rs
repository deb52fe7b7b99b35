//! Crop profiles for Isan saline, acidic soils.
//!
//! Each crop carries a (min, max, spread) range for the five sensor readings.
//! Readings are drawn around the shared regional mean (Phang Khon soil survey
//! values), not around the crop's own midpoint, then clamped to the crop range.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use soil_core::{Error, Result};

/// Fixed region of every generated row
pub const REGION: &str = "อีสาน";

/// Soil types found in Isan, including saline clay
pub const SOIL_TYPES: [&str; 3] = ["ดินร่วนทราย", "ดินทราย", "ดินเหนียวเค็ม"];

/// Isan seasons
pub const SEASONS: [&str; 3] = ["ฝน", "ร้อน", "หนาว"];

/// Bounded range and sampling spread of one reading for one crop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
    /// Standard deviation of the normal draw
    pub spread: f64,
}

impl FeatureRange {
    pub const fn new(min: f64, max: f64, spread: f64) -> Self {
        Self { min, max, spread }
    }

    /// Clamps a raw draw into `[min, max]`
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Draws from Normal(`mean`, spread) and clamps to the range
    pub fn sample<R: Rng + ?Sized>(&self, mean: f64, rng: &mut R) -> Result<f64> {
        if !self.spread.is_finite() || self.spread < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "spread must be finite and non-negative, got {}",
                self.spread
            )));
        }
        let normal = Normal::new(mean, self.spread).map_err(|e| {
            Error::InvalidArgument(format!("invalid spread {}: {e}", self.spread))
        })?;
        Ok(self.clamp(normal.sample(rng)))
    }
}

/// Regional mean of each reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionalMeans {
    pub moisture: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl RegionalMeans {
    /// Phang Khon (Sakon Nakhon) survey means: low N, very low P, low-medium K
    pub const PHANG_KHON: RegionalMeans = RegionalMeans {
        moisture: 55.0,
        ph: 5.0,
        nitrogen: 35.0,
        phosphorus: 5.0,
        potassium: 90.0,
    };
}

impl Default for RegionalMeans {
    fn default() -> Self {
        Self::PHANG_KHON
    }
}

/// Sampling profile of one crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,
    pub moisture: FeatureRange,
    pub ph: FeatureRange,
    pub nitrogen: FeatureRange,
    pub phosphorus: FeatureRange,
    pub potassium: FeatureRange,
}

impl CropProfile {
    /// Ranges in feature order (moisture, pH, N, P, K)
    pub fn ranges(&self) -> [FeatureRange; 5] {
        [
            self.moisture,
            self.ph,
            self.nitrogen,
            self.phosphorus,
            self.potassium,
        ]
    }

    /// Draws the five readings, each clamped to this crop's range
    pub fn sample<R: Rng + ?Sized>(&self, means: &RegionalMeans, rng: &mut R) -> Result<[f64; 5]> {
        Ok([
            self.moisture.sample(means.moisture, rng)?,
            self.ph.sample(means.ph, rng)?,
            self.nitrogen.sample(means.nitrogen, rng)?,
            self.phosphorus.sample(means.phosphorus, rng)?,
            self.potassium.sample(means.potassium, rng)?,
        ])
    }
}

type Row = (&'static str, [(f64, f64, f64); 5]);

const ISAN_TABLE: [Row; 22] = [
    ("ข้าว", [(60.0, 80.0, 5.0), (5.0, 6.0, 0.3), (20.0, 50.0, 5.0), (1.0, 10.0, 2.0), (20.0, 160.0, 20.0)]),
    ("ข้าวโพด", [(50.0, 70.0, 5.0), (5.0, 6.5, 0.4), (30.0, 60.0, 5.0), (5.0, 15.0, 3.0), (50.0, 160.0, 20.0)]),
    ("มันสำปะหลัง", [(40.0, 60.0, 5.0), (4.5, 6.0, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 140.0, 20.0)]),
    ("อ้อย", [(50.0, 70.0, 5.0), (5.0, 7.0, 0.5), (30.0, 60.0, 5.0), (5.0, 15.0, 3.0), (50.0, 160.0, 25.0)]),
    ("ถั่วเขียว", [(50.0, 70.0, 5.0), (5.5, 6.5, 0.3), (20.0, 40.0, 5.0), (5.0, 10.0, 2.0), (20.0, 120.0, 15.0)]),
    ("ขิง", [(50.0, 70.0, 5.0), (5.0, 6.0, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 120.0, 15.0)]),
    ("ขมิ้น", [(50.0, 70.0, 5.0), (5.0, 6.0, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 120.0, 15.0)]),
    ("มะม่วง", [(40.0, 60.0, 5.0), (5.0, 6.5, 0.4), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 140.0, 20.0)]),
    ("กล้วย", [(60.0, 80.0, 5.0), (5.0, 6.0, 0.3), (30.0, 60.0, 5.0), (5.0, 15.0, 3.0), (50.0, 160.0, 25.0)]),
    ("ยางพารา", [(50.0, 70.0, 5.0), (4.5, 5.5, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 120.0, 15.0)]),
    ("ปาล์มน้ำมัน", [(50.0, 70.0, 5.0), (4.5, 6.0, 0.4), (20.0, 50.0, 5.0), (1.0, 10.0, 2.0), (20.0, 140.0, 20.0)]),
    ("สับปะรด", [(40.0, 60.0, 5.0), (4.5, 5.5, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 120.0, 15.0)]),
    ("ชา", [(50.0, 70.0, 5.0), (4.5, 5.5, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 120.0, 15.0)]),
    ("กาแฟ", [(50.0, 70.0, 5.0), (5.0, 6.0, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 140.0, 20.0)]),
    ("ข้าวเหนียวดำ", [(60.0, 80.0, 5.0), (5.0, 6.0, 0.3), (20.0, 50.0, 5.0), (1.0, 10.0, 2.0), (20.0, 160.0, 20.0)]),
    ("กล้วยน้ำว้า", [(60.0, 80.0, 5.0), (5.0, 6.0, 0.3), (30.0, 60.0, 5.0), (5.0, 15.0, 3.0), (50.0, 160.0, 25.0)]),
    ("สะตอ", [(50.0, 70.0, 5.0), (5.0, 6.0, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 140.0, 20.0)]),
    ("มะละกอ", [(50.0, 70.0, 5.0), (5.5, 7.0, 0.4), (30.0, 50.0, 5.0), (5.0, 15.0, 3.0), (50.0, 150.0, 20.0)]),
    ("มะม่วงหิมพานต์", [(40.0, 60.0, 5.0), (5.0, 6.5, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 120.0, 15.0)]),
    ("แตงโม", [(50.0, 70.0, 5.0), (5.5, 6.5, 0.3), (30.0, 60.0, 5.0), (5.0, 15.0, 3.0), (40.0, 140.0, 20.0)]),
    ("พริก", [(50.0, 65.0, 5.0), (5.0, 6.5, 0.4), (20.0, 50.0, 5.0), (5.0, 15.0, 3.0), (50.0, 150.0, 20.0)]),
    ("ยาสูบ", [(40.0, 60.0, 5.0), (5.0, 6.0, 0.3), (20.0, 40.0, 5.0), (1.0, 10.0, 2.0), (20.0, 100.0, 15.0)]),
];

/// The 22 Isan crop profiles, in table order
pub fn isan_profiles() -> Vec<CropProfile> {
    ISAN_TABLE
        .iter()
        .map(|(name, r)| {
            let range = |i: usize| FeatureRange::new(r[i].0, r[i].1, r[i].2);
            CropProfile {
                name: (*name).to_string(),
                moisture: range(0),
                ph: range(1),
                nitrogen: range(2),
                phosphorus: range(3),
                potassium: range(4),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_isan_profiles_are_unique() {
        let profiles = isan_profiles();
        assert_eq!(profiles.len(), 22);
        let names: HashSet<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), 22);
    }

    #[test]
    fn test_ranges_are_well_formed() {
        for profile in isan_profiles() {
            for range in profile.ranges() {
                assert!(range.min < range.max, "{}", profile.name);
                assert!(range.spread > 0.0, "{}", profile.name);
            }
        }
    }

    #[test]
    fn test_clamp_forces_out_of_range_draws_to_bounds() {
        let range = FeatureRange::new(60.0, 80.0, 5.0);
        assert_eq!(range.clamp(1_000.0), 80.0);
        assert_eq!(range.clamp(-1_000.0), 60.0);
        assert_eq!(range.clamp(70.0), 70.0);
    }

    #[test]
    fn test_sample_far_from_range_is_clamped() {
        // Regional mean 55 sits below the 60..80 range, and a huge spread
        // pushes most draws past both bounds.
        let range = FeatureRange::new(60.0, 80.0, 500.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let draws: Vec<f64> = (0..500)
            .map(|_| range.sample(55.0, &mut rng).unwrap())
            .collect();
        assert!(draws.iter().all(|&v| range.contains(v)));
        assert!(draws.iter().any(|&v| v == 60.0));
        assert!(draws.iter().any(|&v| v == 80.0));
    }

    #[test]
    fn test_invalid_spread_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for spread in [-1.0, f64::NAN, f64::INFINITY] {
            let range = FeatureRange::new(0.0, 1.0, spread);
            assert!(range.sample(0.5, &mut rng).is_err(), "spread {spread}");
        }
        assert!(FeatureRange::new(0.0, 1.0, 0.0).sample(0.5, &mut rng).is_ok());
    }

    #[test]
    fn test_profile_sample_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let means = RegionalMeans::default();
        for profile in isan_profiles() {
            for _ in 0..50 {
                let values = profile.sample(&means, &mut rng).unwrap();
                for (value, range) in values.iter().zip(profile.ranges()) {
                    assert!(range.contains(*value));
                }
            }
        }
    }
}
