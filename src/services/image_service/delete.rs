use anyhow::Result;
use tracing::info;

use super::ImageService;
use crate::utils::validation::{object_key, validate_object_name};

impl ImageService {
    /// Remove one image by the name search reported for it. Deleting a
    /// missing key is not an error.
    pub async fn delete(&self, user_id: &str, name: &str) -> Result<()> {
        let key = object_key(user_id, validate_object_name(name)?);
        info!("🗑️  [Delete] Initiated for key: '{}' by user {}", key, user_id);

        self.storage.delete_file(&key).await?;

        info!("✅ [Delete] Successfully deleted '{}'", key);
        Ok(())
    }
}
