//! Object store gateway.
//!
//! A thin adapter over an S3-compatible store: the multipart primitives, the
//! single-object primitives and URL presigning. It holds no business state
//! and never retries; callers decide what an error means.

mod memory;
mod s3;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use parcel_model::{MAX_PART_NUMBER, PartDescriptor, PresignedGrant};

pub use memory::{MemoryObjectStore, MemoryStoreError, StoreReply};
pub use s3::S3ObjectStore;

/// Boxed backend error kept as the source of [`GatewayError::Backend`].
pub type BackendSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by a gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request is malformed before it reaches the store.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request conflicts with the upload's state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The upload or object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store rejected or failed the call.
    #[error("{operation} failed with {code}: {message}")]
    Backend {
        /// Gateway operation that failed.
        operation: &'static str,
        /// Backend error code (e.g. `EntityTooSmall`).
        code: String,
        /// Backend message.
        message: String,
        /// The original backend error.
        #[source]
        source: BackendSource,
    },
}

impl GatewayError {
    /// Backend error code, if this is a backend error.
    #[must_use]
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A freshly created multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartHandle {
    /// Store-issued upload id.
    pub upload_id: String,
    /// Key the upload assembles into.
    pub key: String,
}

/// Result of assembling a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedObject {
    /// Location of the object.
    pub location: String,
    /// Composite ETag.
    pub e_tag: String,
}

/// Object metadata returned by `head_object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    /// Object size in bytes.
    pub size: u64,
    /// ETag, when reported.
    pub e_tag: Option<String>,
    /// Stored content type, when reported.
    pub content_type: Option<String>,
    /// Last modification time, when reported.
    pub last_modified: Option<DateTime<Utc>>,
}

/// The object store primitives the coordinator drives.
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync + std::fmt::Debug {
    /// Bucket every key lives in.
    fn bucket(&self) -> &str;

    /// Start a multipart upload for `key`.
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartHandle, GatewayError>;

    /// Presign a PUT for one part.
    ///
    /// Returns [`GatewayError::InvalidArgument`] for part numbers outside
    /// `1..=10000`.
    async fn presign_part_upload(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError>;

    /// Parts received so far, ascending, at most `max_parts`.
    async fn list_parts(
        &self,
        key: &str,
        upload_id: &str,
        max_parts: u32,
    ) -> Result<Vec<PartDescriptor>, GatewayError>;

    /// Assemble `parts` (ascending) into the final object.
    ///
    /// Returns [`GatewayError::InvalidState`] for an empty part list.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<CompletedObject, GatewayError>;

    /// Discard the upload and its parts.
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str)
    -> Result<(), GatewayError>;

    /// Presign a GET for a whole object.
    async fn presign_object_get(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError>;

    /// Presign a PUT for a whole object.
    async fn presign_object_put(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError>;

    /// Store a small object directly.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), GatewayError>;

    /// Object metadata; [`GatewayError::NotFound`] when missing.
    async fn head_object(&self, key: &str) -> Result<ObjectHead, GatewayError>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), GatewayError>;
}

/// Reject part numbers outside `1..=10000`.
pub(crate) fn check_part_number(part_number: u32) -> Result<(), GatewayError> {
    if (1..=MAX_PART_NUMBER).contains(&part_number) {
        Ok(())
    } else {
        Err(GatewayError::InvalidArgument(format!(
            "Part number must be between 1 and {MAX_PART_NUMBER}, got {part_number}"
        )))
    }
}

/// Reject an empty completion list.
pub(crate) fn check_completion_parts(parts: &[PartDescriptor]) -> Result<(), GatewayError> {
    if parts.is_empty() {
        return Err(GatewayError::InvalidState(
            "Cannot complete a multipart upload without parts".to_owned(),
        ));
    }
    Ok(())
}

/// Percent-encode a key for use in a URL path, keeping `/`.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(parcel_auth::canonical::encode_component)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_part_number_bounds() {
        assert!(check_part_number(1).is_ok());
        assert!(check_part_number(10_000).is_ok());
        assert!(matches!(
            check_part_number(0),
            Err(GatewayError::InvalidArgument(_))
        ));
        assert!(matches!(
            check_part_number(10_001),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_should_refuse_empty_completion() {
        assert!(matches!(
            check_completion_parts(&[]),
            Err(GatewayError::InvalidState(_))
        ));
    }

    #[test]
    fn test_should_expose_memory_store_error_codes() {
        let missing = MemoryStoreError::NoSuchUpload("up-1".into());
        assert_eq!(missing.code(), "NoSuchUpload");
        assert_eq!(missing.status_code(), http::StatusCode::NOT_FOUND);
        assert_eq!(MemoryStoreError::InvalidPartOrder.code(), "InvalidPartOrder");
        assert_eq!(
            MemoryStoreError::InvalidPart(2).status_code(),
            http::StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_should_encode_key_segments() {
        assert_eq!(encode_key("resources/r 1/data.csv"), "resources/r%201/data.csv");
    }
}
