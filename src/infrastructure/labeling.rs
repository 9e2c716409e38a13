use crate::config::AppConfig;
use crate::services::labels::{LabelDetector, NoOpDetector, RekognitionDetector};
use aws_config::SdkConfig;
use std::sync::Arc;
use tracing::info;

pub fn setup_label_detector(config: &AppConfig, aws_config: &SdkConfig) -> Arc<dyn LabelDetector> {
    if !config.auto_tagging {
        info!("🏷️  Auto-tagging disabled");
        return Arc::new(NoOpDetector);
    }

    info!(
        "🏷️  Auto-tagging via Rekognition (max {} labels)",
        config.max_labels
    );
    let client = aws_sdk_rekognition::Client::new(aws_config);
    Arc::new(RekognitionDetector::new(
        client,
        config.s3_bucket.clone(),
        config.max_labels,
    ))
}
