use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{ClientError, GalleryClient, ProgressFn, UploadFile};
use crate::services::image_service::{ImageSummary, UploadResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Done,
    Cancelled,
}

/// One file waiting in, or finished by, the queue
#[derive(Debug, Clone)]
pub struct UploadQueueItem {
    pub file: UploadFile,
    pub progress: u8,
    pub status: QueueStatus,
    pub outcome: Option<UploadResult>,
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(
        &self,
        file: &UploadFile,
        progress: ProgressFn,
    ) -> Result<Vec<UploadResult>, ClientError>;
}

#[async_trait]
impl ImageUploader for GalleryClient {
    async fn upload(
        &self,
        file: &UploadFile,
        progress: ProgressFn,
    ) -> Result<Vec<UploadResult>, ClientError> {
        self.upload_with_progress(file, progress).await
    }
}

struct Entry {
    item: UploadQueueItem,
    token: CancellationToken,
}

/// Uploads a set of files concurrently, one request per file.
///
/// Every item carries a child token of the batch token, so a single item or
/// the whole batch can be cancelled while requests are in flight. A cancelled
/// item's request future is dropped and it issues no further calls.
pub struct UploadQueue {
    entries: Arc<Mutex<Vec<Entry>>>,
    batch: CancellationToken,
}

impl UploadQueue {
    pub fn new(files: Vec<UploadFile>) -> Self {
        let batch = CancellationToken::new();
        let entries = files
            .into_iter()
            .map(|file| Entry {
                item: UploadQueueItem {
                    file,
                    progress: 0,
                    status: QueueStatus::Pending,
                    outcome: None,
                },
                token: batch.child_token(),
            })
            .collect();

        Self {
            entries: Arc::new(Mutex::new(entries)),
            batch,
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        lock(&self.entries)
    }

    /// Progress sink for one item; ignored once the item left `Processing`
    fn progress_for(&self, index: usize) -> ProgressFn {
        let entries = self.entries.clone();
        Arc::new(move |percent| {
            if let Some(entry) = lock(&entries).get_mut(index) {
                if entry.item.status == QueueStatus::Processing {
                    entry.item.progress = percent;
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Cancel one item. Returns false when the index is out of range.
    pub fn cancel(&self, index: usize) -> bool {
        match self.entries().get(index) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.batch.cancel();
    }

    pub fn snapshot(&self) -> Vec<UploadQueueItem> {
        self.entries().iter().map(|e| e.item.clone()).collect()
    }

    fn update(&self, index: usize, f: impl FnOnce(&mut UploadQueueItem)) {
        if let Some(entry) = self.entries().get_mut(index) {
            f(&mut entry.item);
        }
    }

    /// Upload every pending item and return the images that were stored
    pub async fn run<U>(&self, uploader: &U) -> Vec<ImageSummary>
    where
        U: ImageUploader + ?Sized,
    {
        let count = self.len();
        info!("📦 [Queue] Uploading {} file(s)", count);

        let jobs = (0..count).map(|index| self.run_item(index, uploader));
        let uploaded: Vec<ImageSummary> = join_all(jobs).await.into_iter().flatten().collect();

        info!("✅ [Queue] {}/{} file(s) stored", uploaded.len(), count);
        uploaded
    }

    async fn run_item<U>(&self, index: usize, uploader: &U) -> Vec<ImageSummary>
    where
        U: ImageUploader + ?Sized,
    {
        let (file, token) = {
            let entries = self.entries();
            let Some(entry) = entries.get(index) else {
                return Vec::new();
            };
            if entry.item.status != QueueStatus::Pending {
                return Vec::new();
            }
            (entry.item.file.clone(), entry.token.clone())
        };

        if token.is_cancelled() {
            self.update(index, |item| item.status = QueueStatus::Cancelled);
            return Vec::new();
        }
        self.update(index, |item| item.status = QueueStatus::Processing);

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            res = uploader.upload(&file, self.progress_for(index)) => Some(res),
        };

        match response {
            None => {
                info!("⏹️  [Queue] Cancelled '{}'", file.filename);
                self.update(index, |item| item.status = QueueStatus::Cancelled);
                Vec::new()
            }
            Some(Ok(results)) => {
                let images: Vec<ImageSummary> =
                    results.iter().filter_map(UploadResult::image).collect();
                self.update(index, |item| {
                    item.status = QueueStatus::Done;
                    item.progress = 100;
                    item.outcome = results.into_iter().next();
                });
                images
            }
            Some(Err(e)) => {
                warn!("⚠️  [Queue] Upload of '{}' failed: {}", file.filename, e);
                self.update(index, |item| {
                    item.status = QueueStatus::Done;
                    item.progress = 100;
                    item.outcome = Some(UploadResult::error(file.filename.clone(), &e));
                });
                Vec::new()
            }
        }
    }
}

fn lock(entries: &Mutex<Vec<Entry>>) -> MutexGuard<'_, Vec<Entry>> {
    entries.lock().unwrap_or_else(|e| e.into_inner())
}
