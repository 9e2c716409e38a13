use crate::config::AppConfig;
use crate::services::{labels::LabelDetector, storage::StorageService};
use std::sync::Arc;

pub mod delete;
pub mod search;
pub mod types;
pub mod upload;

pub use types::{ImageSummary, IncomingImage, UploadError, UploadResult};

/// Upload, search and delete operations over one user's images
pub struct ImageService {
    storage: Arc<dyn StorageService>,
    labels: Arc<dyn LabelDetector>,
    config: Arc<AppConfig>,
}

impl ImageService {
    pub fn new(
        storage: Arc<dyn StorageService>,
        labels: Arc<dyn LabelDetector>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            storage,
            labels,
            config,
        }
    }

    fn tagging_enabled(&self) -> bool {
        self.config.auto_tagging && self.labels.is_enabled()
    }
}
