//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::metadata::{Catalog, MetadataStore};
use crate::storage::ObjectStore;
use crate::transfer::{DownloadOrchestrator, RetryPolicy, UploadOrchestrator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    uploader: UploadOrchestrator,
    downloader: DownloadOrchestrator,
    catalog: Catalog,
}

impl AppState {
    /// Wire the orchestrators to the two stores
    pub fn new(
        config: Config,
        object_store: Arc<dyn ObjectStore>,
        metadata_store: Arc<dyn MetadataStore>,
    ) -> Self {
        let uploader =
            UploadOrchestrator::new(object_store.clone(), metadata_store.clone(), config.upload);
        let downloader =
            DownloadOrchestrator::new(object_store, RetryPolicy::from(config.download));
        let catalog = Catalog::new(metadata_store);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                uploader,
                downloader,
                catalog,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn uploader(&self) -> &UploadOrchestrator {
        &self.inner.uploader
    }

    pub fn downloader(&self) -> &DownloadOrchestrator {
        &self.inner.downloader
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }
}
