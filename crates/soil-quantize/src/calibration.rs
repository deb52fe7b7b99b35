//! Calibration input for post-training quantization.
//!
//! Every dataset row passes through the frozen [`FeaturePipeline`] exactly
//! once, in file order, so the activation ranges are observed on the same
//! vectors the network was trained on.

use soil_core::{Result, SoilSample, NUM_FEATURES};
use soil_dataset::FeaturePipeline;

/// Lazily transforms dataset rows into model input vectors
pub struct CalibrationStream<'a> {
    pipeline: &'a FeaturePipeline,
    rows: std::slice::Iter<'a, SoilSample>,
    remaining: usize,
}

impl<'a> CalibrationStream<'a> {
    /// Streams `rows`, stopping after `limit` vectors when set
    pub fn new(pipeline: &'a FeaturePipeline, rows: &'a [SoilSample], limit: Option<usize>) -> Self {
        let remaining = limit.map_or(rows.len(), |limit| limit.min(rows.len()));
        Self {
            pipeline,
            rows: rows.iter(),
            remaining,
        }
    }

    /// Transforms every remaining row, failing on the first unknown category
    pub fn collect_vectors(self) -> Result<Vec<[f32; NUM_FEATURES]>> {
        self.collect()
    }
}

impl Iterator for CalibrationStream<'_> {
    type Item = Result<[f32; NUM_FEATURES]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let row = self.rows.next()?;
        self.remaining -= 1;
        Some(self.pipeline.transform(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for CalibrationStream<'_> {}

/// Running min/max over every observed value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeObserver {
    min: f32,
    max: f32,
    count: usize,
}

impl Default for RangeObserver {
    fn default() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            count: 0,
        }
    }
}

impl RangeObserver {
    pub fn observe(&mut self, values: &[f32]) {
        for &v in values {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.count += values.len();
    }

    /// Observed `(min, max)`, `None` before any value was seen
    pub fn range(&self) -> Option<(f32, f32)> {
        (self.count > 0).then_some((self.min, self.max))
    }

    pub fn count(&self) -> usize {
        self.count
    }
}
