use axum::{
    extract::{multipart::Multipart, OriginalUri, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::auth::require_session_or_fail;
use crate::errors::AppError;
use crate::files::gateway::{serve_file, FileAccessError, FileResponse};
use crate::files::upload::{store_upload, UploadKind, UploadedFile};
use crate::state::AppState;

pub const FILES_PREFIX: &str = "/files/";
const UPLOAD_FIELD: &str = "file";

/// GET /files/*key
///
/// Reads the key from the raw request path rather than the `Path` extractor,
/// which would percent-decode the whole capture before it could be split.
pub async fn handle_get_file(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<FileResponse, FileAccessError> {
    let raw_key = uri.path().strip_prefix(FILES_PREFIX).unwrap_or_default();
    serve_file(
        state.sessions.as_ref(),
        state.files.as_ref(),
        &headers,
        raw_key,
    )
    .await
}

/// POST /api/v1/files/:kind
///
/// Multipart upload with a single `file` field; `kind` is `photo` or `pdf`.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(kind): Path<UploadKind>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadedFile>), AppError> {
    let session = require_session_or_fail(state.sessions.as_ref(), &headers).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let uploaded = store_upload(
            state.files.as_ref(),
            &session.user.id,
            kind,
            &content_type,
            body,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(uploaded)));
    }

    Err(AppError::Validation(format!(
        "multipart body must contain a '{UPLOAD_FIELD}' field"
    )))
}
