//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Paths to all RxLens data files and directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Result Store file (`data/prescriptions.json`).
    pub store_file: PathBuf,
    /// Archive of individually saved results (`data/results/`).
    pub results: PathBuf,
    /// Temporary image uploads (`data/uploads/`).
    pub uploads: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            store_file: root.join("prescriptions.json"),
            results: root.join("results"),
            uploads: root.join("uploads"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.results)?;
        std::fs::create_dir_all(&self.uploads)?;
        Ok(())
    }
}

/// Settings for the external extraction model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// API key; extraction is disabled when absent.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.into(),
            api_base: DEFAULT_GEMINI_API_BASE.into(),
        }
    }
}

impl ExtractorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            api_base: std::env::var("GEMINI_API_BASE").unwrap_or(defaults.api_base),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Top-level RxLens configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RxLensConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Maximum accepted upload body size in bytes.
    pub max_upload_bytes: usize,
    pub extractor: ExtractorConfig,
}

impl RxLensConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let max_upload_mb = std::env::var("RXLENS_MAX_UPLOAD_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            extractor: ExtractorConfig::from_env(),
        })
    }

    /// Configuration rooted at `data_dir` with defaults only (no env lookups).
    pub fn with_defaults(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            port: DEFAULT_PORT,
            data_paths: DataPaths::new(data_dir)?,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            extractor: ExtractorConfig::default(),
        })
    }
}
