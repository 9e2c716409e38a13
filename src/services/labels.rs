use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_rekognition::Client;
use aws_sdk_rekognition::types::{Image, S3Object};

/// Trait for image label detection
#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Raw labels for the image stored under `key`, most confident first
    async fn detect_labels(&self, key: &str) -> Result<Vec<String>>;

    /// Whether this detector can produce labels at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// AWS Rekognition DetectLabels reading the image straight from the bucket
pub struct RekognitionDetector {
    client: Client,
    bucket: String,
    max_labels: i32,
}

impl RekognitionDetector {
    pub fn new(client: Client, bucket: String, max_labels: i32) -> Self {
        Self {
            client,
            bucket,
            max_labels,
        }
    }
}

#[async_trait]
impl LabelDetector for RekognitionDetector {
    async fn detect_labels(&self, key: &str) -> Result<Vec<String>> {
        let image = Image::builder()
            .s3_object(S3Object::builder().bucket(&self.bucket).name(key).build())
            .build();

        let res = self
            .client
            .detect_labels()
            .image(image)
            .max_labels(self.max_labels)
            .send()
            .await?;

        Ok(res
            .labels()
            .iter()
            .filter_map(|label| label.name())
            .map(str::to_string)
            .collect())
    }
}

/// No-op detector used when auto-tagging is disabled
pub struct NoOpDetector;

#[async_trait]
impl LabelDetector for NoOpDetector {
    async fn detect_labels(&self, _key: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_detector_returns_nothing() {
        let detector = NoOpDetector;
        assert!(!detector.is_enabled());
        assert!(detector.detect_labels("u1/cat.png").await.unwrap().is_empty());
    }
}
