//! Writer side of user files: validation limits and key allocation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::UserId;
use crate::errors::AppError;
use crate::files::key::ResourceKey;
use crate::storage::ResourceStore;

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

const PHOTO_TYPES: [(&str, &str); 3] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];
const PDF_TYPES: [(&str, &str); 1] = [("application/pdf", "pdf")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Photo,
    Pdf,
}

impl UploadKind {
    pub fn max_bytes(self) -> usize {
        match self {
            UploadKind::Photo => MAX_PHOTO_BYTES,
            UploadKind::Pdf => MAX_PDF_BYTES,
        }
    }

    fn accepted(self) -> &'static [(&'static str, &'static str)] {
        match self {
            UploadKind::Photo => &PHOTO_TYPES,
            UploadKind::Pdf => &PDF_TYPES,
        }
    }

    fn label(self) -> &'static str {
        match self {
            UploadKind::Photo => "photo",
            UploadKind::Pdf => "PDF",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

/// Strips parameters (`; charset=...`) and lowercases a declared MIME type.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Checks type and size; returns the normalized MIME type and the file extension.
pub fn validate_upload(
    kind: UploadKind,
    content_type: &str,
    size: usize,
) -> Result<(String, &'static str), AppError> {
    let mime = essence(content_type);
    let Some((_, extension)) = kind.accepted().iter().find(|(m, _)| *m == mime) else {
        let allowed: Vec<_> = kind.accepted().iter().map(|(m, _)| *m).collect();
        return Err(AppError::Validation(format!(
            "Unsupported {} type '{mime}'; expected one of: {}",
            kind.label(),
            allowed.join(", ")
        )));
    };

    if size == 0 {
        return Err(AppError::Validation("File is empty".to_string()));
    }
    if size > kind.max_bytes() {
        return Err(AppError::Validation(format!(
            "{} is {size} bytes; the limit is {} MiB",
            kind.label(),
            kind.max_bytes() / (1024 * 1024)
        )));
    }

    Ok((mime, *extension))
}

/// Validates and stores an upload under `users/<owner>/<uuid>.<ext>`.
pub async fn store_upload(
    store: &dyn ResourceStore,
    owner: &UserId,
    kind: UploadKind,
    content_type: &str,
    body: Bytes,
) -> Result<UploadedFile, AppError> {
    let (mime, extension) = validate_upload(kind, content_type, body.len())?;
    let key = ResourceKey::for_user(owner, &Uuid::new_v4().to_string(), extension)
        .map_err(anyhow::Error::from)?;
    let size = body.len();

    store
        .put(key.as_str(), body, &mime)
        .await
        .map_err(|e| AppError::S3(format!("{e:#}")))?;

    info!("Stored {} upload {key} ({size} bytes) for user {owner}", kind.label());

    Ok(UploadedFile {
        url: key.url_path(),
        key: key.to_string(),
        content_type: mime,
        size,
    })
}
