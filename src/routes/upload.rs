use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::error::AppError;
use crate::routes::auth::AuthSession;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    tracing::warn!("Rejected multipart upload: {}", e);
    AppError::validation("file", "Could not read the uploaded file")
}

/// POST /api/images
/// Compresses the `file` field and hands it to the image host.
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field.bytes().await.map_err(multipart_error)?;
        let url = state.images.ingest(bytes.to_vec()).await?;
        tracing::info!(uid = %auth.identity.uid, url = %url, "Image uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { url })));
    }

    Err(AppError::validation("file", "No file provided"))
}
