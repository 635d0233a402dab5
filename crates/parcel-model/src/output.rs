//! Action output types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::PartDescriptor;

/// Output of `create_multipart_upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadOutput {
    /// Store-issued upload id.
    pub upload_id: String,
    /// Object key the parts are assembled into.
    pub key: String,
    /// Entity id embedded in the key.
    pub record_id: String,
}

/// Output of `prepare_upload_parts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareUploadPartsOutput {
    /// Part number to presigned PUT URL. Only parts that were signed.
    pub presigned_urls: BTreeMap<u32, String>,
    /// Shared expiry of the issued URLs; absent when nothing was signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Output of `sign_part`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPartOutput {
    /// Signed part.
    pub part_number: u32,
    /// Presigned PUT URL.
    pub url: String,
    /// URL expiry.
    pub expires_at: DateTime<Utc>,
}

/// Output of `list_parts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPartsOutput {
    /// Parts in ascending part number order.
    pub parts: Vec<PartDescriptor>,
}

/// Output of `complete_multipart_upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultipartUploadOutput {
    /// Location of the assembled object.
    pub location: String,
    /// Composite ETag.
    pub e_tag: String,
    /// Object key.
    pub key: String,
    /// Whether the catalog record now points at the object.
    pub record_updated: bool,
    /// Why the record update failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_error: Option<String>,
}

/// Output of `abort_multipart_upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortMultipartUploadOutput {
    /// Always true on success.
    pub aborted: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Output of `get_signed_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSignedUrlOutput {
    /// Fresh record id the object is stored under.
    pub resource_id: String,
    /// Presigned PUT URL.
    pub signed_url: String,
    /// Object key.
    pub key: String,
    /// URL expiry.
    pub expires_at: DateTime<Utc>,
}

/// Output of `resource_download_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlOutput {
    /// Presigned GET URL.
    pub url: String,
    /// URL expiry.
    pub expires_at: DateTime<Utc>,
}

/// Output of `resource_object_delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDeleteOutput {
    /// Always true on success (deleting a missing object succeeds).
    pub deleted: bool,
    /// Key that was deleted.
    pub key: String,
}
