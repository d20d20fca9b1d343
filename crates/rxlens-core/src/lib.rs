//! RxLens Core: prescription domain types, errors, configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DataPaths, ExtractorConfig, RxLensConfig};
pub use error::{Error, Result};
pub use types::*;
