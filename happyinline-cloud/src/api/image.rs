//! Image upload API
//!
//! POST /api/images:        multipart upload → validate → JPEG → SHA256 → S3
//! GET  /api/images/{hash}: presigned URL for one of the caller's images

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};

use crate::auth::UserIdentity;
use crate::state::AppState;
use crate::storage;

use super::ApiResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/images",
            post(upload_image).layer(DefaultBodyLimit::max(storage::MAX_FILE_SIZE + 64 * 1024)),
        )
        .route("/api/images/{hash}", get(get_image_url))
}

#[derive(Serialize)]
pub struct ImageUploadResponse {
    pub hash: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct ImageUrlResponse {
    pub url: String,
}

/// POST /api/images
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    mut multipart: Multipart,
) -> ApiResult<ImageUploadResponse> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::invalid_request(format!("Multipart error: {e}"))
    })? {
        if matches!(field.name(), Some("file") | Some("")) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(|e| {
                AppError::invalid_request(format!("Read error: {e}"))
            })?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) = upload.ok_or_else(|| AppError::new(ErrorCode::NoFileProvided))?;
    storage::validate_upload(&filename, &data)?;

    let jpeg = storage::compress_to_jpeg(&data)?;
    let hash = storage::content_hash(&jpeg);
    state.images.put(&identity.user_id, &hash, jpeg).await?;
    let url = state.images.presigned_url(&identity.user_id, &hash).await?;

    tracing::info!(user_id = %identity.user_id, hash = %hash, "Image uploaded to S3");
    Ok(Json(ImageUploadResponse { hash, url }))
}

/// GET /api/images/{hash}
pub async fn get_image_url(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(hash): Path<String>,
) -> ApiResult<ImageUrlResponse> {
    if !storage::is_valid_hash(&hash) {
        return Err(AppError::invalid_request("Invalid image hash").into());
    }
    let url = state.images.presigned_url(&identity.user_id, &hash).await?;
    Ok(Json(ImageUrlResponse { url }))
}
