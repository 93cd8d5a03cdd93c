use std::io;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info};

use super::{BodyStream, ResourceStore, StoredObject};

/// S3 / MinIO bucket as a [`ResourceStore`].
#[derive(Clone)]
pub struct S3ResourceStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ResourceStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

/// Forwards S3 chunks as they arrive; the stream ends after the first error.
fn into_body_stream(body: ByteStream) -> BodyStream {
    stream::unfold(Some(body), |state| async move {
        let mut body = state?;
        match body.try_next().await {
            Ok(Some(chunk)) => Some((Ok(chunk), Some(body))),
            Ok(None) => None,
            Err(e) => Some((Err(io::Error::new(io::ErrorKind::Other, e)), None)),
        }
    })
    .boxed()
}

#[async_trait]
impl ResourceStore for S3ResourceStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_key())
                {
                    debug!("s3://{}/{} does not exist", self.bucket, key);
                    return Ok(None);
                }
                return Err(anyhow!(
                    "S3 get_object failed for {key}: {}",
                    DisplayErrorContext(&err)
                ));
            }
        };

        Ok(Some(StoredObject {
            content_type: output.content_type().map(str::to_string),
            etag: output.e_tag().map(str::to_string),
            content_length: output.content_length().and_then(|n| u64::try_from(n).ok()),
            body: into_body_stream(output.body),
        }))
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow!("S3 upload failed: {}", DisplayErrorContext(&e)))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
