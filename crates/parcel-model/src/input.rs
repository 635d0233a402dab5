//! Action input types.
//!
//! Every field is optional at this level so that a missing value surfaces as
//! a field-specific validation error from the coordinator instead of a serde
//! error. Legacy snake_case and catalog-style names are accepted as aliases.

use serde::{Deserialize, Serialize};

/// Input for `create_multipart_upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadInput {
    /// Owning entity the key is scoped under.
    #[serde(default, alias = "packageId", alias = "package_id", alias = "owner_id")]
    pub owner_id: Option<String>,
    /// Client-chosen file name.
    #[serde(default, alias = "name")]
    pub filename: Option<String>,
    /// MIME type stored with the object.
    #[serde(default, alias = "content_type")]
    pub content_type: Option<String>,
    /// Existing record the upload belongs to.
    #[serde(default, alias = "resourceId", alias = "resource_id", alias = "record_id")]
    pub record_id: Option<String>,
}

/// Identifies an open multipart session. Flattened into session inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRef {
    /// Upload id returned by initiate.
    #[serde(default, alias = "upload_id")]
    pub upload_id: Option<String>,
    /// Object key returned by initiate.
    #[serde(default)]
    pub key: Option<String>,
    /// Owning entity.
    #[serde(default, alias = "packageId", alias = "package_id", alias = "owner_id")]
    pub owner_id: Option<String>,
}

/// Input for `prepare_upload_parts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepareUploadPartsInput {
    /// The session.
    #[serde(flatten)]
    pub upload: UploadRef,
    /// Requested parts: numbers, numeric strings, or `{"number": n}` objects.
    #[serde(default)]
    pub parts: Vec<serde_json::Value>,
}

/// Input for `sign_part`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignPartInput {
    /// The session.
    #[serde(flatten)]
    pub upload: UploadRef,
    /// Part to sign.
    #[serde(
        default,
        rename = "partNumber",
        alias = "part_number",
        alias = "number",
        alias = "PartNumber"
    )]
    pub part_number: Option<serde_json::Value>,
}

/// Input for `list_parts` and `abort_multipart_upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionInput {
    /// The session.
    #[serde(flatten)]
    pub upload: UploadRef,
}

/// One entry of a completion request, in any of the accepted spellings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmittedPart {
    /// Part number, possibly as a numeric string.
    #[serde(
        default,
        rename = "PartNumber",
        alias = "partNumber",
        alias = "part_number",
        alias = "number"
    )]
    pub part_number: Option<serde_json::Value>,
    /// ETag reported by the store for that part.
    #[serde(default, rename = "ETag", alias = "eTag", alias = "etag", alias = "e_tag")]
    pub e_tag: Option<serde_json::Value>,
}

/// Input for `complete_multipart_upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteMultipartUploadInput {
    /// The session.
    #[serde(flatten)]
    pub upload: UploadRef,
    /// Uploaded parts.
    #[serde(default)]
    pub parts: Vec<SubmittedPart>,
    /// Record to point at the assembled object.
    #[serde(
        default,
        rename = "recordId",
        alias = "resourceId",
        alias = "resource_id",
        alias = "record_id"
    )]
    pub record_id: Option<String>,
}

/// Input for `get_signed_url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSignedUrlInput {
    /// Owning entity.
    #[serde(default, alias = "packageId", alias = "package_id", alias = "owner_id")]
    pub owner_id: Option<String>,
    /// Client-chosen file name.
    #[serde(default, alias = "name")]
    pub filename: Option<String>,
}

/// Input for `resource_download_url` and `resource_object_delete`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordObjectInput {
    /// Owning entity.
    #[serde(default, alias = "packageId", alias = "package_id", alias = "owner_id")]
    pub owner_id: Option<String>,
    /// Record whose object is addressed.
    #[serde(default, alias = "resourceId", alias = "resource_id", alias = "record_id", alias = "id")]
    pub record_id: Option<String>,
}
