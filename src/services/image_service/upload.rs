use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::ImageService;
use super::types::{IncomingImage, UploadError, UploadResult};
use crate::services::preprocess::to_baseline_jpeg_blocking;
use crate::utils::tags::normalize_labels;
use crate::utils::validation::{object_key, sanitize_filename};

/// Prefix for re-encoded copies handed to the label detector. User ids are
/// UUIDs, so this never collides with a user's prefix.
pub const LABELING_PREFIX: &str = "tmp/labeling";

fn ensure_active(cancel: &CancellationToken) -> Result<(), UploadError> {
    if cancel.is_cancelled() {
        Err(UploadError::Cancelled)
    } else {
        Ok(())
    }
}

impl ImageService {
    /// Upload every file concurrently. One result per file, in input order.
    pub async fn upload_batch(
        &self,
        user_id: &str,
        files: Vec<IncomingImage>,
        cancel: &CancellationToken,
    ) -> Vec<UploadResult> {
        info!(
            "📦 [Upload] Starting batch of {} file(s) for user {}",
            files.len(),
            user_id
        );

        let uploads = files
            .into_iter()
            .map(|file| self.upload_one(user_id, file, cancel.child_token()));
        let results = join_all(uploads).await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            "✅ [Upload] Batch finished for user {}: {}/{} stored",
            user_id,
            succeeded,
            results.len()
        );
        results
    }

    pub async fn upload_one(
        &self,
        user_id: &str,
        file: IncomingImage,
        cancel: CancellationToken,
    ) -> UploadResult {
        let original_name = file.filename.clone();

        let name = match sanitize_filename(&file.filename) {
            Ok(name) => name,
            Err(e) => {
                warn!("⚠️  [Upload] Rejected filename '{}': {}", original_name, e);
                return UploadResult::error(original_name, UploadError::from(e));
            }
        };
        let key = object_key(user_id, &name);

        match self.store_and_tag(&key, &name, file, &cancel).await {
            Ok(result) => result,
            Err(e) => {
                error!("❌ [Upload] (Key: {}): {}", key, e);
                UploadResult::error(name, e)
            }
        }
    }

    async fn store_and_tag(
        &self,
        key: &str,
        name: &str,
        file: IncomingImage,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        let content_type = resolve_content_type(&file)?;
        if file.data.len() > self.config.max_file_size {
            return Err(UploadError::TooLarge(self.config.max_file_size));
        }

        ensure_active(cancel)?;
        if self.storage.file_exists(key).await? {
            info!("⏭️  [Upload] Skipped '{}', already exists.", key);
            return Ok(UploadResult::already_exists(name));
        }

        ensure_active(cancel)?;
        self.storage
            .upload_file(key, file.data.clone(), &content_type)
            .await?;
        info!("✅ [Upload] Uploaded '{}' ({} bytes).", key, file.data.len());

        let mut tags = Vec::new();
        if self.tagging_enabled() && !cancel.is_cancelled() {
            tags = self.detect_tags(key, file.data, cancel).await;
            if !tags.is_empty() && !cancel.is_cancelled() {
                tags = self.apply_tags(key, tags).await;
            }
        }

        Ok(UploadResult::Success {
            name: name.to_string(),
            url: self.storage.public_url(key),
            tags,
        })
    }

    /// Labels for a freshly stored image. Any failure yields no tags.
    async fn detect_tags(
        &self,
        key: &str,
        data: bytes::Bytes,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let jpeg = match to_baseline_jpeg_blocking(data).await {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("⚠️  [Labels] Skipping '{}': {}", key, e);
                return Vec::new();
            }
        };

        if cancel.is_cancelled() {
            return Vec::new();
        }

        let temp_key = format!("{}/{}.jpg", LABELING_PREFIX, Uuid::new_v4());
        if let Err(e) = self
            .storage
            .upload_file(&temp_key, jpeg, mime::IMAGE_JPEG.essence_str())
            .await
        {
            error!("❌ [Labels] (Key: {}): failed to stage copy: {}", key, e);
            return Vec::new();
        }

        let detected = if cancel.is_cancelled() {
            Ok(Vec::new())
        } else {
            self.labels.detect_labels(&temp_key).await
        };

        // The staged copy goes away whatever the detector said
        if let Err(e) = self.storage.delete_file(&temp_key).await {
            warn!("⚠️  [Labels] Failed to remove '{}': {}", temp_key, e);
        }

        match detected {
            Ok(labels) => {
                let tags = normalize_labels(&labels);
                info!("🏷️  [Labels] Detected for {}: [{}]", key, tags.join(", "));
                tags
            }
            Err(e) => {
                error!("❌ [Labels] (Key: {}): {}", key, e);
                Vec::new()
            }
        }
    }

    /// Store tags on the object. Returns the tags actually applied.
    async fn apply_tags(&self, key: &str, tags: Vec<String>) -> Vec<String> {
        match self.storage.put_object_tags(key, &tags).await {
            Ok(()) => {
                info!("✅ [Tagging] Applied {} tag(s) to {}", tags.len(), key);
                tags
            }
            Err(e) => {
                error!("❌ [Tagging] (Key: {}): {}", key, e);
                Vec::new()
            }
        }
    }
}

/// Declared content type, falling back to sniffing the bytes. Only images pass.
fn resolve_content_type(file: &IncomingImage) -> Result<String, UploadError> {
    let declared = file
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty() && *ct != mime::APPLICATION_OCTET_STREAM.essence_str());

    let content_type = match declared {
        Some(ct) => ct.to_string(),
        None => infer::get(&file.data)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string()),
    };

    if content_type.starts_with("image/") {
        Ok(content_type)
    } else {
        Err(UploadError::UnsupportedType(content_type))
    }
}
