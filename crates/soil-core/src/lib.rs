//! Core types and utilities for the Isan soil crop pipeline.
//!
//! This crate provides the record types, configuration, error handling and
//! CLI helpers shared by the generator, trainer and quantization exporter.

pub mod cli;
pub mod config;
pub mod error;
pub mod types;

pub use cli::*;
pub use config::*;
pub use error::{Error, Result};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::cli::*;
    pub use crate::config::*;
    pub use crate::error::{Error, Result};
    pub use crate::types::*;
}
