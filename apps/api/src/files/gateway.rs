//! The read side of user files: authenticate, authorize by key, fetch, respond.

use std::fmt;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::{require_session_or_fail, SessionError, SessionResolver};
use crate::files::key::{KeyError, ResourceKey};
use crate::storage::{BodyStream, ResourceStore};

pub const CACHE_CONTROL_PRIVATE: &str = "private, max-age=3600";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Outcomes of the gateway other than a served file.
///
/// Rendered as short plain-text bodies; internal causes are logged, never sent.
#[derive(Debug, Error)]
pub enum FileAccessError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Bad resource key: {0}")]
    BadKey(#[from] KeyError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for FileAccessError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthenticated => FileAccessError::Unauthenticated,
            SessionError::Lookup(e) => FileAccessError::Internal(e),
        }
    }
}

impl IntoResponse for FileAccessError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            FileAccessError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            FileAccessError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            FileAccessError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            FileAccessError::BadKey(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            FileAccessError::Internal(e) => {
                error!("File access failed: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, body).into_response()
    }
}

/// A file ready to send; the body is streamed from the store, not buffered.
pub struct FileResponse {
    pub body: BodyStream,
    pub content_type: String,
    pub etag: Option<String>,
    pub content_length: Option<u64>,
}

impl fmt::Debug for FileResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileResponse")
            .field("content_type", &self.content_type)
            .field("etag", &self.etag)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl IntoResponse for FileResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        let content_type = HeaderValue::from_str(&self.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        headers.insert(header::CONTENT_TYPE, content_type);
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_PRIVATE),
        );
        if let Some(etag) = self.etag.as_deref() {
            match HeaderValue::from_str(etag) {
                Ok(value) => {
                    headers.insert(header::ETAG, value);
                }
                Err(_) => warn!("Dropping unrepresentable ETag {etag:?}"),
            }
        }
        if let Some(length) = self.content_length {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        }
        (StatusCode::OK, headers, Body::from_stream(self.body)).into_response()
    }
}

/// Serves the object at `raw_key` (the still-encoded path after `/files/`).
///
/// The session is checked before anything else; an unauthenticated request
/// never reaches the store.
pub async fn serve_file(
    sessions: &dyn SessionResolver,
    store: &dyn ResourceStore,
    headers: &HeaderMap,
    raw_key: &str,
) -> Result<FileResponse, FileAccessError> {
    let session = require_session_or_fail(sessions, headers).await?;
    let key = ResourceKey::from_raw_path(raw_key)?;

    if !key.is_accessible_by(&session.user.id) {
        warn!("User {} denied access to {}", session.user.id, key);
        return Err(FileAccessError::Forbidden);
    }

    let object = store
        .get(key.as_str())
        .await?
        .ok_or(FileAccessError::NotFound)?;

    Ok(FileResponse {
        content_type: object
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        etag: object.etag,
        content_length: object.content_length,
        body: object.body,
    })
}
