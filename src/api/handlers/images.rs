use crate::api::error::AppError;
use crate::services::image_service::{ImageSummary, IncomingImage, UploadResult};
use crate::utils::auth::Claims;
use crate::utils::validation::{FilenameError, validate_object_name};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

/// Multipart field names accepted for image parts
const IMAGE_FIELDS: [&str; 2] = ["images", "image"];

/// Documentation-only shape of the upload form
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = Vec<String>, format = Binary)]
    pub images: Vec<Vec<u8>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Filename substring or tag keywords. Empty lists everything.
    pub q: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

#[utoipa::path(
    post,
    path = "/api/images/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-file upload outcomes", body = Vec<UploadResult>),
        (status = 400, description = "No file uploaded or malformed form"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "Request body too large")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "images"
)]
pub async fn upload_images(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadResult>>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if !IMAGE_FIELDS.contains(&name.as_str()) {
            continue;
        }

        if files.len() == state.config.max_files_per_batch {
            return Err(AppError::BadRequest(format!(
                "At most {} files can be uploaded at once",
                state.config.max_files_per_batch
            )));
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.map_err(multipart_error)?;

        files.push(IncomingImage {
            filename,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        warn!("⚠️  [Upload] No file was present in the request.");
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    // Dropping the request, or shutting down, stops calls for unfinished files
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let results = state
        .image_service
        .upload_batch(&claims.sub, files, &cancel)
        .await;

    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/api/images/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching images", body = Vec<ImageSummary>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Storage failure")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "images"
)]
pub async fn search_images(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ImageSummary>>, AppError> {
    let images = state
        .image_service
        .search(&claims.sub, params.q.as_deref())
        .await
        .map_err(|e| AppError::Storage(format!("Search failed: {}", e)))?;

    Ok(Json(images))
}

#[utoipa::path(
    delete,
    path = "/api/images/delete/{key}",
    params(
        ("key" = String, Path, description = "Image name as returned by search, percent-encoded")
    ),
    responses(
        (status = 200, description = "Image deleted", body = MessageResponse),
        (status = 400, description = "Missing or invalid key"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Storage failure")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "images"
)]
pub async fn delete_image(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let filename = validate_object_name(&key).map_err(|e| match e {
        FilenameError::Empty => AppError::BadRequest("Missing image key for deletion".to_string()),
        e => AppError::BadRequest(e.to_string()),
    })?;

    state
        .image_service
        .delete(&claims.sub, filename)
        .await
        .map_err(|e| AppError::Storage(format!("Deletion failed: {}", e)))?;

    Ok(Json(MessageResponse {
        message: format!("Successfully deleted {}", filename),
    }))
}
