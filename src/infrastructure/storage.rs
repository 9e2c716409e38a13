use crate::config::AppConfig;
use crate::services::storage::S3StorageService;
use aws_config::SdkConfig;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared AWS configuration for S3 and Rekognition
pub async fn load_aws_config(config: &AppConfig) -> SdkConfig {
    let mut loader = aws_config::from_env().region(Region::new(config.aws_region.clone()));

    if let (Some(access_key), Some(secret_key)) = (&config.s3_access_key, &config.s3_secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    loader.load().await
}

/// Base URL under which stored objects are publicly reachable
pub fn public_base_url(config: &AppConfig) -> String {
    if let Some(url) = &config.s3_public_url {
        return url.trim_end_matches('/').to_string();
    }
    match &config.s3_endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), config.s3_bucket),
        None => format!(
            "https://{}.s3.{}.amazonaws.com",
            config.s3_bucket, config.aws_region
        ),
    }
}

pub async fn setup_storage(config: &AppConfig, aws_config: &SdkConfig) -> Arc<S3StorageService> {
    let mut builder = aws_sdk_s3::config::Builder::from(aws_config);

    // Custom endpoint for MinIO/LocalStack
    if let Some(endpoint) = &config.s3_endpoint {
        info!("☁️  S3 Storage: {} (Bucket: {})", endpoint, config.s3_bucket);
        builder = builder.endpoint_url(endpoint);
    } else {
        info!(
            "☁️  S3 Storage: AWS {} (Bucket: {})",
            config.aws_region, config.s3_bucket
        );
    }
    if config.s3_force_path_style {
        builder = builder.force_path_style(true);
    }

    let s3_client = aws_sdk_s3::Client::from_conf(builder.build());

    match s3_client.head_bucket().bucket(&config.s3_bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", config.s3_bucket),
        Err(e) => warn!(
            "⚠️  Bucket '{}' is not reachable yet: {}",
            config.s3_bucket, e
        ),
    }

    Arc::new(S3StorageService::new(
        s3_client,
        config.s3_bucket.clone(),
        public_base_url(config),
    ))
}
