//! Binary layout of the quantized model artifact.
//!
//! All integers are little-endian.
//!
//! ```text
//! magic "SQI8" | version u16 | layer count u16
//! input scale f32 | input zero point i32
//! output scale f32 | output zero point i32
//! per layer:
//!   input size u32 | output size u32 | fused relu u8 | 3 reserved bytes
//!   weight scale f32 | output scale f32 | output zero point i32
//!   multiplier i32 | shift i32
//!   weights i8 * (input size * output size), output-major
//!   bias i32 * output size
//! ```

use std::fs;
use std::path::Path;

use soil_core::{ensure_parent_dir, Error, Result};
use tracing::info;

use crate::params::{FixedPointMultiplier, QuantParams};
use crate::quantizer::{QuantizedLayer, QuantizedModel};

pub const MAGIC: &[u8; 4] = b"SQI8";
pub const FORMAT_VERSION: u16 = 1;

/// Serializes a quantized model
pub fn encode(model: &QuantizedModel) -> Result<Vec<u8>> {
    let layer_count = u16::try_from(model.layers.len())
        .map_err(|_| Error::Quantization("too many layers to encode".to_string()))?;

    let mut out = Vec::with_capacity(32 + model.num_parameters() * 2);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&layer_count.to_le_bytes());
    put_params(&mut out, model.input);
    put_params(&mut out, model.output);

    for layer in &model.layers {
        put_u32(&mut out, layer.input_size)?;
        put_u32(&mut out, layer.output_size)?;
        out.push(layer.fused_relu as u8);
        out.extend_from_slice(&[0u8; 3]);
        out.extend_from_slice(&layer.weight_scale.to_le_bytes());
        put_params(&mut out, layer.output);
        out.extend_from_slice(&layer.multiplier.multiplier.to_le_bytes());
        out.extend_from_slice(&layer.multiplier.shift.to_le_bytes());
        out.extend(layer.weights.iter().map(|&w| w as u8));
        for bias in &layer.bias {
            out.extend_from_slice(&bias.to_le_bytes());
        }
    }
    Ok(out)
}

/// Parses bytes written by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<QuantizedModel> {
    let mut reader = Reader { bytes, pos: 0 };

    if reader.take(4)? != MAGIC {
        return Err(Error::Serialization("not a quantized soil model".to_string()));
    }
    let version = reader.u16()?;
    if version != FORMAT_VERSION {
        return Err(Error::Serialization(format!(
            "unsupported quantized model version {version}"
        )));
    }
    let layer_count = reader.u16()? as usize;
    let input = reader.params()?;
    let output = reader.params()?;

    let mut layers = Vec::with_capacity(layer_count);
    for _ in 0..layer_count {
        let input_size = reader.u32()? as usize;
        let output_size = reader.u32()? as usize;
        let fused_relu = match reader.take(4)?[0] {
            0 => false,
            1 => true,
            flag => {
                return Err(Error::Serialization(format!("invalid relu flag {flag}")));
            }
        };
        let weight_scale = reader.f32()?;
        let layer_output = reader.params()?;
        let multiplier = FixedPointMultiplier {
            multiplier: reader.i32()?,
            shift: reader.i32()?,
        };

        let weight_count = input_size
            .checked_mul(output_size)
            .ok_or_else(|| Error::Serialization("layer size overflow".to_string()))?;
        let weights = reader.take(weight_count)?.iter().map(|&b| b as i8).collect();
        let bias = (0..output_size)
            .map(|_| reader.i32())
            .collect::<Result<Vec<_>>>()?;

        layers.push(QuantizedLayer {
            input_size,
            output_size,
            weight_scale,
            weights,
            bias,
            output: layer_output,
            multiplier,
            fused_relu,
        });
    }

    if reader.pos != bytes.len() {
        return Err(Error::Serialization(format!(
            "{} trailing bytes after quantized model",
            bytes.len() - reader.pos
        )));
    }
    Ok(QuantizedModel {
        input,
        layers,
        output,
    })
}

/// Writes the encoded model, overwriting any previous artifact
pub fn save(model: &QuantizedModel, path: &Path) -> Result<usize> {
    let bytes = encode(model)?;
    ensure_parent_dir(path)?;
    fs::write(path, &bytes)?;
    info!("Quantized model ({} bytes) saved to {:?}", bytes.len(), path);
    Ok(bytes.len())
}

pub fn load(path: &Path) -> Result<QuantizedModel> {
    decode(&fs::read(path)?)
}

fn put_params(out: &mut Vec<u8>, params: QuantParams) {
    out.extend_from_slice(&params.scale.to_le_bytes());
    out.extend_from_slice(&params.zero_point.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: usize) -> Result<()> {
    let value = u32::try_from(value)
        .map_err(|_| Error::Quantization(format!("dimension {value} does not fit in u32")))?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                Error::Serialization(format!("quantized model truncated at byte {}", self.pos))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn params(&mut self) -> Result<QuantParams> {
        Ok(QuantParams {
            scale: self.f32()?,
            zero_point: self.i32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_model() -> QuantizedModel {
        let layer = |input_size: usize, output_size: usize, fused_relu: bool| QuantizedLayer {
            input_size,
            output_size,
            weight_scale: 0.01,
            weights: (0..input_size * output_size)
                .map(|i| (i % 255) as i32 - 127)
                .map(|v| v as i8)
                .collect(),
            bias: (0..output_size).map(|j| j as i32 * 1000 - 7).collect(),
            output: QuantParams {
                scale: 0.05,
                zero_point: -128,
            },
            multiplier: FixedPointMultiplier::from_real(0.0123).unwrap(),
            fused_relu,
        };
        QuantizedModel {
            input: QuantParams {
                scale: 0.02,
                zero_point: 3,
            },
            layers: vec![layer(8, 4, true), layer(4, 3, false)],
            output: QuantParams::SOFTMAX_OUTPUT,
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample_model()).unwrap();
        assert_eq!(&bytes[..4], b"SQI8");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 2);
    }

    #[test]
    fn test_decode_restores_model() {
        let model = sample_model();
        let decoded = decode(&encode(&model).unwrap()).unwrap();
        assert_eq!(decoded, model);
    }

    #[test]
    fn test_truncated_and_trailing_bytes() {
        let bytes = encode(&sample_model()).unwrap();
        assert!(decode(&bytes[..bytes.len() - 1]).is_err());

        let mut longer = bytes.clone();
        longer.push(0);
        assert!(decode(&longer).is_err());
    }

    #[test]
    fn test_bad_magic_and_version() {
        let mut bytes = encode(&sample_model()).unwrap();
        bytes[0] = b'X';
        assert!(decode(&bytes).is_err());

        let mut bytes = encode(&sample_model()).unwrap();
        bytes[4] = 9;
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("model.sqi8");
        let model = sample_model();

        let written = save(&model, &path).unwrap();
        assert_eq!(written, fs::metadata(&path).unwrap().len() as usize);
        assert_eq!(load(&path).unwrap(), model);
    }
}
