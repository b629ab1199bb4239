//! Attachment upload: multipart in, public URL out.

use crate::models::messages::{attachment_kind_from_mime, Attachment};
use crate::models::profiles::Profile;
use crate::web::auth_middleware::require_session;
use crate::{ApiError, AppState};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::post,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// POST /api/attachments - stores the first file field and returns the
/// attachment descriptor the chat composer embeds in its send request.
async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<Profile>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read upload: {e}")))?;
        if bytes.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".to_string()));
        }

        let stored = state
            .storage
            .upload(profile.id, &filename, &bytes)
            .await
            .map_err(|e| {
                error!("Attachment upload failed: {:?}", e);
                ApiError::InternalServerError
            })?;

        let attachment = Attachment {
            id: Uuid::new_v4().to_string(),
            kind: attachment_kind_from_mime(&mime_type).to_string(),
            filename,
            url: state.storage.public_url(&stored.path),
            size: stored.size,
            mime_type,
        };

        info!(
            "Stored attachment {} ({} bytes) for user {}",
            attachment.filename, attachment.size, profile.id
        );
        return Ok((StatusCode::CREATED, Json(json!({ "attachment": attachment }))));
    }

    Err(ApiError::Validation("No file field in upload".to_string()))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/attachments", post(upload_attachment))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state)
}
