//! Shared CLI helpers for the pipeline tools.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::PipelineConfig;
use crate::{Error, Result};

pub fn setup_cli_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logger: {e}")))?;

    Ok(())
}

pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config {}: {e}", path.display())))
}

/// Loads the pipeline config from `path`, or the fixed defaults when no path
/// is given, and validates it.
pub fn load_pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_toml_config::<PipelineConfig>(path)?
        }
        None => {
            debug!("No configuration file given, using defaults");
            PipelineConfig::default()
        }
    };
    config.validate()?;
    debug!("Artifact paths: {:?}", config.paths);
    Ok(config)
}

/// Creates the parent directory of an output file if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_toml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "[training]\nbatch_size = 16\n").unwrap();

        let config = load_pipeline_config(Some(&path)).unwrap();
        assert_eq!(config.training.batch_size, 16);
    }

    #[test]
    fn test_load_missing_config_fails() {
        let result = load_toml_config::<PipelineConfig>(Path::new("/nonexistent/pipeline.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "[training]\nlearning_rate = -1.0\n").unwrap();

        assert!(load_pipeline_config(Some(&path)).is_err());
    }

    #[test]
    fn test_defaults_without_path() {
        let config = load_pipeline_config(None).unwrap();
        assert_eq!(config.training.seed, 42);
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/file.json");
        ensure_parent_dir(&path).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
        ensure_parent_dir(Path::new("bare.json")).unwrap();
    }
}
