use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::config::AppConfig;
use crate::error::json_error;
use crate::upload::{DiskStorage, IMAGES_DIR, ImageUploader, SingleImageUpload};

/// Room for multipart boundaries and text fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    filename: String,
    url: String,
    size: usize,
    mime_type: String,
    fields: BTreeMap<String, String>,
}

pub fn uploader_from_config(config: &AppConfig) -> ImageUploader {
    let storage = DiskStorage::new(&config.upload_root, &config.public_base_url)
        .with_max_size(config.max_upload_size);
    ImageUploader::new(&config.field_name, storage)
        .reject_unsupported(config.reject_unsupported_mime)
}

/// `POST /upload` stores one image, `GET /images/*` serves what was stored.
pub fn router(uploader: Arc<ImageUploader>) -> Router {
    let body_limit = uploader
        .storage()
        .max_size()
        .map(|limit| limit.saturating_add(MULTIPART_OVERHEAD));
    let images_dir = uploader.storage().root().join(IMAGES_DIR);

    let upload_route = post(handle_image_upload).layer(match body_limit {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    });

    Router::new()
        .route("/upload", upload_route)
        .nest_service("/images", ServeDir::new(images_dir))
        .with_state(uploader)
}

pub async fn handle_image_upload(
    State(uploader): State<Arc<ImageUploader>>,
    upload: SingleImageUpload,
) -> Response {
    let Some(file) = upload.file else {
        return json_error(StatusCode::BAD_REQUEST, "no image uploaded");
    };
    let url = uploader.storage().public_url(&file.filename);
    (
        StatusCode::CREATED,
        Json(UploadResponse {
            filename: file.filename,
            url,
            size: file.size,
            mime_type: file.mime_type,
            fields: upload.fields,
        }),
    )
        .into_response()
}
