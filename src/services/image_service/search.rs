use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::ImageService;
use super::types::ImageSummary;
use crate::services::storage::ObjectSummary;
use crate::utils::tags::query_keywords;
use crate::utils::validation::user_prefix;

/// A parsed search query
#[derive(Debug, Clone, Default)]
pub struct ImageQuery {
    /// Lowercased full text, matched against filenames
    term: String,
    /// Singular keywords, matched against tags
    keywords: Vec<String>,
}

impl ImageQuery {
    pub fn parse(raw: &str) -> Self {
        let term = raw.trim().to_lowercase();
        let keywords = query_keywords(&term);
        Self { term, keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    pub fn matches(&self, name: &str, tags: &[String]) -> bool {
        let filename_match = self.term.is_empty() || name.to_lowercase().contains(&self.term);
        let tags_match = self.keywords.iter().any(|keyword| tags.contains(keyword));
        filename_match || tags_match
    }
}

impl ImageService {
    /// Images of a user whose filename or tags match `query`, in listing order
    pub async fn search(&self, user_id: &str, query: Option<&str>) -> Result<Vec<ImageSummary>> {
        let query = ImageQuery::parse(query.unwrap_or_default());
        let prefix = user_prefix(user_id);

        info!(
            "🔍 [Search] Initiated for user {} with keywords: [{}]",
            user_id,
            query.keywords.join(", ")
        );

        let objects = self.storage.list_objects(&prefix).await?;
        let candidates = objects
            .into_iter()
            .filter(|object| !object.is_directory_marker());

        let matches: Vec<Option<ImageSummary>> = stream::iter(candidates)
            .map(|object| self.evaluate(&prefix, object, &query))
            .buffered(self.config.search_concurrency.max(1))
            .collect()
            .await;

        let images: Vec<ImageSummary> = matches.into_iter().flatten().collect();
        info!(
            "✅ [Search] Found {} image(s) for user {}",
            images.len(),
            user_id
        );
        Ok(images)
    }

    async fn evaluate(
        &self,
        prefix: &str,
        object: ObjectSummary,
        query: &ImageQuery,
    ) -> Option<ImageSummary> {
        let name = object
            .key
            .strip_prefix(prefix)
            .unwrap_or(&object.key)
            .to_string();

        let tags = match self.storage.get_object_tags(&object.key).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("⚠️  [Search] (Key: {}): tag lookup failed: {}", object.key, e);
                Vec::new()
            }
        };

        query.matches(&name, &tags).then(|| ImageSummary {
            url: self.storage.public_url(&object.key),
            name,
            tags,
        })
    }
}
