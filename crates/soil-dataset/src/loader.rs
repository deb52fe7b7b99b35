//! CSV reading and writing of soil samples.

use std::path::Path;

use soil_core::{ensure_parent_dir, Error, Result, SoilSample, CSV_HEADER};
use tracing::info;

/// Writes `samples` to `path`, overwriting any existing file
pub fn write_samples(path: &Path, samples: &[SoilSample]) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {}", samples.len(), path.display());
    Ok(())
}

/// Reads every row of a dataset CSV.
///
/// The header must be exactly `moisture,pH,N,P,K,region,soil_type,season,plant`.
pub fn read_samples(path: &Path) -> Result<Vec<SoilSample>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Csv(format!("Failed to open {}: {e}", path.display())))?;

    let headers = reader.headers()?.clone();
    if headers.iter().ne(CSV_HEADER.iter().copied()) {
        return Err(Error::Dataset(format!(
            "Unexpected header in {}: {:?} (expected {})",
            path.display(),
            headers.iter().collect::<Vec<_>>(),
            CSV_HEADER.join(",")
        )));
    }

    let mut samples = Vec::new();
    for (line, record) in reader.deserialize::<SoilSample>().enumerate() {
        let sample = record.map_err(|e| {
            Error::Csv(format!("{} line {}: {e}", path.display(), line + 2))
        })?;
        samples.push(sample);
    }

    info!("Loaded {} rows from {}", samples.len(), path.display());
    Ok(samples)
}
