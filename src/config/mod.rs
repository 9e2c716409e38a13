use anyhow::{Context, Result};
use std::env;

/// Runtime configuration for the gallery backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port (default: 5000)
    pub port: u16,

    /// Database connection URL (default: local SQLite file)
    pub database_url: String,

    /// JWT Secret Key (Required in production)
    pub jwt_secret: String,

    /// Lifetime of issued bearer tokens in hours (default: 24)
    pub token_ttl_hours: i64,

    /// Bucket holding every user's images
    pub s3_bucket: String,

    /// AWS region for S3 and Rekognition (default: "us-east-1")
    pub aws_region: String,

    /// Custom S3 endpoint (MinIO, LocalStack)
    pub s3_endpoint: Option<String>,

    /// Static credentials for the custom endpoint. When unset the default AWS chain is used.
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// Use path-style bucket addressing (required by MinIO)
    pub s3_force_path_style: bool,

    /// Base URL used to build public image URLs, overrides the derived one
    pub s3_public_url: Option<String>,

    /// Run label detection and tagging on upload (default: true)
    pub auto_tagging: bool,

    /// Maximum number of labels requested per image (default: 10)
    pub max_labels: i32,

    /// Maximum size of a single image in bytes (default: 25 MB)
    pub max_file_size: usize,

    /// Maximum number of files accepted in one upload request (default: 20)
    pub max_files_per_batch: usize,

    /// Concurrent tag lookups during a search (default: 16)
    pub search_concurrency: usize,

    /// Allowed CORS Origins (comma separated, "*" allows any)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            database_url: "sqlite://gallery.db?mode=rwc".to_string(),
            jwt_secret: "secret".to_string(),
            token_ttl_hours: 24,
            s3_bucket: "image-gallery".to_string(),
            aws_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_force_path_style: false,
            s3_public_url: None,
            auto_tagging: true,
            max_labels: 10,
            max_file_size: 25 * 1024 * 1024, // 25 MB
            max_files_per_batch: 20,
            search_concurrency: 16,
            allowed_origins: vec![
                "http://localhost:3000".to_string(), // CRA dev server
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: parse_var("PORT").unwrap_or(default.port),
            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS").unwrap_or(default.token_ttl_hours),
            s3_bucket: env::var("S3_BUCKET").unwrap_or(default.s3_bucket),
            aws_region: env::var("AWS_REGION").unwrap_or(default.aws_region),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_access_key: env::var("S3_ACCESS_KEY").ok(),
            s3_secret_key: env::var("S3_SECRET_KEY").ok(),
            s3_force_path_style: flag_var("S3_FORCE_PATH_STYLE")
                .unwrap_or(default.s3_force_path_style),
            s3_public_url: env::var("S3_PUBLIC_URL")
                .ok()
                .map(|v| v.trim_end_matches('/').to_string()),
            auto_tagging: flag_var("AUTO_TAGGING").unwrap_or(default.auto_tagging),
            max_labels: parse_var("MAX_LABELS").unwrap_or(default.max_labels),
            max_file_size: parse_var("MAX_FILE_SIZE").unwrap_or(default.max_file_size),
            max_files_per_batch: parse_var("MAX_FILES_PER_BATCH")
                .unwrap_or(default.max_files_per_batch),
            search_concurrency: parse_var("SEARCH_CONCURRENCY")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(default.search_concurrency),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development (tagging off, any origin, in-memory database)
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            auto_tagging: false,
            allowed_origins: vec!["*".to_string()],
            ..Self::default()
        }
    }

    /// Create config for production (secret must come from the environment)
    pub fn production() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set in production")?;
        Ok(Self {
            jwt_secret,
            ..Self::from_env()
        })
    }

    /// Upper bound for a whole upload request body
    pub fn max_request_size(&self) -> usize {
        // 1 MB of headroom for multipart framing
        self.max_file_size
            .saturating_mul(self.max_files_per_batch)
            .saturating_add(1024 * 1024)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn flag_var(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v.to_lowercase() != "false" && v != "0")
}
