//! Source object identity and the object-store seam.

pub mod compression;
pub mod event;
pub mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Identifies one compressed source object in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceObject {
    pub bucket: String,
    pub key: String,
}

impl SourceObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SourceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Read access to the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object's compressed payload.
    async fn fetch(&self, object: &SourceObject) -> Result<Bytes, FetchError>;

    /// List all objects under a prefix, in listing order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<SourceObject>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_object_display() {
        let object = SourceObject::new("mybucket", "logs/2024/file.log.gz");
        assert_eq!(object.to_string(), "s3://mybucket/logs/2024/file.log.gz");
    }
}
