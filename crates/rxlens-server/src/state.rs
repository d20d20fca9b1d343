//! Shared application state.

use std::sync::Arc;

use rxlens_core::{Result, RxLensConfig};
use rxlens_extract::{Extractor, GeminiClient};
use rxlens_store::{JsonFileStore, RecordStore, ResultArchive};
use tracing::{info, warn};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: RxLensConfig,
    pub store: Arc<dyn RecordStore>,
    pub archive: ResultArchive,
    /// `None` when no model provider is configured.
    pub extractor: Option<Extractor>,
}

impl AppState {
    /// Assemble state around an explicit store and extractor, initializing both
    /// persistence layers.
    pub fn new(
        config: RxLensConfig,
        store: Arc<dyn RecordStore>,
        extractor: Option<Extractor>,
    ) -> Result<Self> {
        store.initialize()?;
        let archive = ResultArchive::new(&config.data_paths.results);
        archive.ensure_directory()?;

        Ok(Self {
            config,
            store,
            archive,
            extractor,
        })
    }

    /// Production state: JSON file store and a Gemini extractor when a key is set.
    pub fn from_config(config: RxLensConfig) -> Result<Self> {
        let store: Arc<dyn RecordStore> =
            Arc::new(JsonFileStore::new(&config.data_paths.store_file));

        let extractor = if config.extractor.is_configured() {
            let client = GeminiClient::from_config(&config.extractor)?;
            info!("Extraction enabled with model {}", config.extractor.model);
            Some(Extractor::new(Arc::new(client)))
        } else {
            warn!("GEMINI_API_KEY not set; /api/extract is disabled");
            None
        };

        Self::new(config, store, extractor)
    }
}
