use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::utils::validation::FilenameError;

/// One file part of an upload request
#[derive(Debug, Clone)]
pub struct IncomingImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Outcome of one file in an upload batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UploadResult {
    Success {
        name: String,
        url: String,
        tags: Vec<String>,
    },
    AlreadyExists {
        name: String,
        message: String,
    },
    Error {
        name: String,
        error: String,
    },
}

impl UploadResult {
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            name: name.into(),
            message: "Already exists".to_string(),
        }
    }

    pub fn error(name: impl Into<String>, error: impl ToString) -> Self {
        Self::Error {
            name: name.into(),
            error: error.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Success { name, .. }
            | Self::AlreadyExists { name, .. }
            | Self::Error { name, .. } => name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The stored image, for successful uploads
    pub fn image(&self) -> Option<ImageSummary> {
        match self {
            Self::Success { name, url, tags } => Some(ImageSummary {
                name: name.clone(),
                url: url.clone(),
                tags: tags.clone(),
            }),
            _ => None,
        }
    }
}

/// An image as returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageSummary {
    pub name: String,
    pub url: String,
    pub tags: Vec<String>,
}

/// Per-file failures. The Display text is what the client sees.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid filename: {0}")]
    InvalidFilename(#[from] FilenameError),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File exceeds the maximum size of {0} bytes")]
    TooLarge(usize),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
