//! Typed HTTP client for the gallery API.
//!
//! Mirrors the browser upload flow: one request per file under the `image`
//! field, with [`queue::UploadQueue`] driving several of them at once.

pub mod queue;

use bytes::Bytes;
use futures::Stream;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, RequestBuilder, Response, StatusCode, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

use crate::api::handlers::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::api::handlers::images::MessageResponse;
use crate::services::image_service::{ImageSummary, UploadResult};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Not logged in")]
    MissingToken,
}

/// Receives the percentage of a file body handed to the connection so far
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

const PROGRESS_CHUNK: usize = 64 * 1024;

/// A file picked for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct GalleryClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl GalleryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::MissingToken)?;
        Ok(request.bearer_auth(token))
    }

    /// Register and keep the issued token
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let body = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.url("/api/users/register"))
            .json(&body)
            .send()
            .await?;
        let auth: AuthResponse = decode(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Log in and keep the issued token
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.url("/api/users/login"))
            .json(&body)
            .send()
            .await?;
        let auth: AuthResponse = decode(response).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Upload a single file. The server answers with one outcome per file.
    pub async fn upload(&self, file: &UploadFile) -> Result<Vec<UploadResult>, ClientError> {
        self.upload_with_progress(file, Arc::new(|_| {})).await
    }

    /// Like [`upload`](Self::upload), reporting progress while the body streams out
    pub async fn upload_with_progress(
        &self,
        file: &UploadFile,
        progress: ProgressFn,
    ) -> Result<Vec<UploadResult>, ClientError> {
        let length = file.data.len() as u64;
        let body = reqwest::Body::wrap_stream(counting_chunks(
            file.data.clone(),
            PROGRESS_CHUNK,
            progress,
        ));
        let part = multipart::Part::stream_with_length(body, length)
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;
        let form = multipart::Form::new().part("image", part);

        let request = self.http.post(self.url("/api/images/upload")).multipart(form);
        let response = self.authorized(request)?.send().await?;
        decode(response).await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<ImageSummary>, ClientError> {
        let request = self
            .http
            .get(self.url("/api/images/search"))
            .query(&[("q", query)]);
        let response = self.authorized(request)?.send().await?;
        decode(response).await
    }

    pub async fn delete(&self, name: &str) -> Result<String, ClientError> {
        let path = format!(
            "/api/images/delete/{}",
            utf8_percent_encode(name, NON_ALPHANUMERIC)
        );
        let request = self.http.delete(self.url(&path));
        let response = self.authorized(request)?.send().await?;
        let body: MessageResponse = decode(response).await?;
        Ok(body.message)
    }
}

fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (sent as u64 * 100 / total as u64) as u8
}

/// Split `data` into chunks, reporting progress as each one is pulled
fn counting_chunks(
    data: Bytes,
    chunk_size: usize,
    progress: ProgressFn,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let total = data.len();
    let chunk_size = chunk_size.max(1);
    if total == 0 {
        progress(100);
    }

    let chunks = (0..total).step_by(chunk_size).map(move |start| {
        let end = (start + chunk_size).min(total);
        let chunk = data.slice(start..end);
        progress(percent(end, total));
        Ok::<_, std::io::Error>(chunk)
    });
    futures::stream::iter(chunks)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);
    Err(ClientError::Status { status, message })
}
