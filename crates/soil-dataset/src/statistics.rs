//! Dataset statistics computation.

use std::collections::BTreeMap;

use soil_core::SoilSample;

/// Dataset statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStatistics {
    pub num_samples: usize,
    pub num_classes: usize,
    pub class_distribution: BTreeMap<String, usize>,
    pub soil_distribution: BTreeMap<String, usize>,
    pub season_distribution: BTreeMap<String, usize>,
    /// Per-reading (min, max) in feature order
    pub reading_ranges: [(f64, f64); 5],
}

impl DatasetStatistics {
    pub fn compute(samples: &[SoilSample]) -> Self {
        let mut stats = Self {
            reading_ranges: [(f64::INFINITY, f64::NEG_INFINITY); 5],
            ..Self::default()
        };

        for sample in samples {
            *stats.class_distribution.entry(sample.plant.clone()).or_default() += 1;
            *stats.soil_distribution.entry(sample.soil_type.clone()).or_default() += 1;
            *stats.season_distribution.entry(sample.season.clone()).or_default() += 1;
            for (range, value) in stats.reading_ranges.iter_mut().zip(sample.readings()) {
                range.0 = range.0.min(value);
                range.1 = range.1.max(value);
            }
        }

        stats.num_samples = samples.len();
        stats.num_classes = stats.class_distribution.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::DatasetGenerator;

    #[test]
    fn test_compute() {
        let samples = DatasetGenerator::isan(4).generate_seeded(Some(2)).unwrap();
        let stats = DatasetStatistics::compute(&samples);
        assert_eq!(stats.num_samples, 88);
        assert_eq!(stats.num_classes, 22);
        assert!(stats.class_distribution.values().all(|&c| c == 4));
        assert_eq!(stats.soil_distribution.values().sum::<usize>(), 88);
        assert!(stats.reading_ranges[0].0 >= 40.0);
        assert!(stats.reading_ranges[0].1 <= 80.0);
    }

    #[test]
    fn test_empty() {
        let stats = DatasetStatistics::compute(&[]);
        assert_eq!(stats.num_samples, 0);
        assert_eq!(stats.num_classes, 0);
    }
}
