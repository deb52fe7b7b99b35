//! C header embedding the quantized model bytes for the firmware build.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use soil_core::{ensure_parent_dir, Result};
use tracing::info;

/// Name of the generated byte array
pub const ARRAY_NAME: &str = "soil_model_int8";

const BYTES_PER_LINE: usize = 12;

/// Renders `bytes` as a C array declaration with a length constant
pub fn render_c_header(bytes: &[u8], array_name: &str) -> String {
    let guard = format!("{}_H", array_name.to_uppercase());
    let mut out = String::with_capacity(bytes.len() * 6 + 256);

    let _ = writeln!(out, "// Generated by soil-quantize. Do not edit.");
    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}");
    let _ = writeln!(out);
    let _ = writeln!(out, "const unsigned int {array_name}_len = {};", bytes.len());
    let _ = writeln!(out, "const unsigned char {array_name}[] = {{");
    for chunk in bytes.chunks(BYTES_PER_LINE) {
        let line: Vec<String> = chunk.iter().map(|b| format!("0x{b:02x}")).collect();
        let _ = writeln!(out, "  {},", line.join(", "));
    }
    let _ = writeln!(out, "}};");
    let _ = writeln!(out);
    let _ = writeln!(out, "#endif  // {guard}");
    out
}

/// Writes the header for `bytes` to `path`, overwriting
pub fn write_c_header(bytes: &[u8], path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, render_c_header(bytes, ARRAY_NAME))?;
    info!("Firmware header saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let bytes: Vec<u8> = (0u8..14).collect();
        let header = render_c_header(&bytes, ARRAY_NAME);

        assert!(header.contains("#ifndef SOIL_MODEL_INT8_H"));
        assert!(header.contains("const unsigned int soil_model_int8_len = 14;"));
        assert!(header.contains("const unsigned char soil_model_int8[] = {"));
        assert!(header.contains("  0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b,\n"));
        assert!(header.contains("  0x0c, 0x0d,\n};"));
    }

    #[test]
    fn test_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("model.h");
        write_c_header(b"SQI8", &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("0x53, 0x51, 0x49, 0x38,"));
    }
}
