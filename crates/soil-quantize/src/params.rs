//! Affine int8 quantization parameters and fixed-point rescaling.
//!
//! A real value `r` maps to `q = round(r / scale) + zero_point`, clamped to
//! `[-128, 127]`. Layer outputs are rescaled from the int32 accumulator with
//! an integer multiplier and shift instead of a float multiply.

use soil_core::{Error, Result};

/// Smallest range treated as non-degenerate
const MIN_RANGE: f32 = 1e-8;

/// Scale and zero point of one int8 tensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantParams {
    /// Softmax output encoding: 256 levels over [0, 1)
    pub const SOFTMAX_OUTPUT: QuantParams = QuantParams {
        scale: 1.0 / 256.0,
        zero_point: -128,
    };

    /// Asymmetric parameters covering `[min, max]`, widened to include zero
    pub fn asymmetric(min: f32, max: f32) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(Error::Quantization(format!(
                "invalid calibration range [{min}, {max}]"
            )));
        }
        let min = min.min(0.0);
        let max = max.max(0.0);
        let range = max - min;
        if range < MIN_RANGE {
            return Ok(Self {
                scale: 1.0,
                zero_point: 0,
            });
        }

        let scale = range / 255.0;
        let zero_point = (-128.0 - min / scale).round().clamp(-128.0, 127.0) as i32;
        Ok(Self { scale, zero_point })
    }

    /// Symmetric parameters for values within `[-abs_max, abs_max]`
    pub fn symmetric(abs_max: f32) -> Result<Self> {
        if !abs_max.is_finite() {
            return Err(Error::Quantization(format!(
                "non-finite weight magnitude {abs_max}"
            )));
        }
        let scale = if abs_max < MIN_RANGE {
            1.0
        } else {
            abs_max / 127.0
        };
        Ok(Self {
            scale,
            zero_point: 0,
        })
    }

    pub fn quantize(&self, value: f32) -> i8 {
        let q = (value / self.scale).round() + self.zero_point as f32;
        q.clamp(-128.0, 127.0) as i8
    }

    pub fn dequantize(&self, value: i8) -> f32 {
        (value as i32 - self.zero_point) as f32 * self.scale
    }
}

/// Real multiplier `m` encoded as `multiplier * 2^(shift - 31)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPointMultiplier {
    /// Q31 mantissa in `[2^30, 2^31)`
    pub multiplier: i32,
    pub shift: i32,
}

impl FixedPointMultiplier {
    /// Encodes a positive real multiplier below 2^30
    pub fn from_real(real: f64) -> Result<Self> {
        if !real.is_finite() || real <= 0.0 {
            return Err(Error::Quantization(format!(
                "requantization multiplier must be positive and finite, got {real}"
            )));
        }

        let mut mantissa = real;
        let mut shift = 0i32;
        while mantissa >= 1.0 {
            mantissa /= 2.0;
            shift += 1;
        }
        while mantissa < 0.5 {
            mantissa *= 2.0;
            shift -= 1;
        }

        let mut q = (mantissa * (1i64 << 31) as f64).round() as i64;
        if q == 1i64 << 31 {
            q /= 2;
            shift += 1;
        }
        if shift > 30 {
            return Err(Error::Quantization(format!(
                "requantization multiplier {real} is too large"
            )));
        }

        Ok(Self {
            multiplier: q as i32,
            shift,
        })
    }

    /// `round(acc * m)` computed with integer arithmetic only
    pub fn apply(&self, acc: i32) -> i32 {
        let total_shift = 31 - self.shift;
        if total_shift > 62 {
            return 0;
        }
        let product = acc as i64 * self.multiplier as i64;
        let rounding = 1i64 << (total_shift - 1);
        let scaled = (product + rounding) >> total_shift;
        scaled.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// The real multiplier this encoding represents
    pub fn to_real(&self) -> f64 {
        self.multiplier as f64 * 2f64.powi(self.shift - 31)
    }
}
