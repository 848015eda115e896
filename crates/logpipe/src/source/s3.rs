//! S3-backed object store.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use snafu::prelude::*;

use super::{ObjectStore, SourceObject};
use crate::error::{FetchError, UrlNoKeySnafu, UrlSchemeSnafu};

/// Object store backed by the AWS S3 API.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn fetch(&self, object: &SourceObject) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| FetchError::GetObject {
                bucket: object.bucket.clone(),
                key: object.key.clone(),
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| FetchError::ReadBody {
                bucket: object.bucket.clone(),
                key: object.key.clone(),
                message: e.to_string(),
            })?;

        Ok(data.into_bytes())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<SourceObject>, FetchError> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| FetchError::ListObjects {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: aws_sdk_s3::error::DisplayErrorContext(e).to_string(),
            })?;

            for item in response.contents() {
                if let Some(key) = item.key() {
                    objects.push(SourceObject::new(bucket, key));
                }
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }
}

/// Split an `s3://bucket/prefix` URL into bucket and prefix.
pub fn parse_s3_url(url: &str) -> Result<(String, String), FetchError> {
    let trimmed = url
        .strip_prefix("s3://")
        .context(UrlSchemeSnafu { url })?;
    let split = trimmed.find('/').context(UrlNoKeySnafu { url })?;
    Ok((trimmed[..split].to_string(), trimmed[split + 1..].to_string()))
}
