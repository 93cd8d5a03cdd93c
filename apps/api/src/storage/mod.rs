//! Blob storage behind a trait, so the gateway never talks to S3 directly.

pub mod s3;

use std::fmt;
use std::io;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};

pub use s3::S3ResourceStore;

/// Object contents as they arrive from the store, chunk by chunk.
pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// What the store hands back for a key.
pub struct StoredObject {
    pub body: BodyStream,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub content_length: Option<u64>,
}

impl StoredObject {
    /// An object whose contents are already in memory.
    pub fn from_bytes(body: Bytes, content_type: Option<String>, etag: Option<String>) -> Self {
        let content_length = Some(body.len() as u64);
        Self {
            body: stream::once(async move { Ok(body) }).boxed(),
            content_type,
            etag,
            content_length,
        }
    }
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("content_type", &self.content_type)
            .field("etag", &self.etag)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Returns `Ok(None)` when the key does not exist. The body is not read
    /// until the returned stream is polled.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>>;

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;
}
