//! Per-feature standardization.

use std::path::Path;

use serde::{Deserialize, Serialize};
use soil_core::{ensure_parent_dir, Error, Result, NUM_FEATURES};

/// Frozen per-feature mean and scale over the encoded feature matrix.
///
/// `scale` is the population standard deviation; constant columns (the region
/// column is always constant) get a scale of 1.0 so they map to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: [f64; NUM_FEATURES],
    pub scale: [f64; NUM_FEATURES],
    pub n_samples_seen: usize,
}

impl StandardScaler {
    pub fn fit(rows: &[[f64; NUM_FEATURES]]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Dataset("cannot fit scaler on zero rows".to_string()));
        }
        let n = rows.len() as f64;

        let mut mean = [0.0f64; NUM_FEATURES];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = [0.0f64; NUM_FEATURES];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }

        let mut scale = [1.0f64; NUM_FEATURES];
        for (s, v) in scale.iter_mut().zip(&var) {
            let std = (v / n).sqrt();
            if std.is_finite() && std > 10.0 * f64::EPSILON {
                *s = std;
            }
        }

        Ok(Self {
            mean,
            scale,
            n_samples_seen: rows.len(),
        })
    }

    /// Standardizes one encoded row
    pub fn transform(&self, row: &[f64; NUM_FEATURES]) -> [f32; NUM_FEATURES] {
        let mut out = [0.0f32; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            out[i] = ((row[i] - self.mean[i]) / self.scale[i]) as f32;
        }
        out
    }

    pub fn inverse_transform(&self, row: &[f32; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        let mut out = [0.0f64; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            out[i] = row[i] as f64 * self.scale[i] + self.mean[i];
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let scaler: StandardScaler = serde_json::from_str(&json)?;
        if scaler.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::Serialization(format!(
                "{} has a non-positive scale",
                path.display()
            )));
        }
        Ok(scaler)
    }
}
