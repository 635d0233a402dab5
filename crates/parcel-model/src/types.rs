//! Shared value types.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest part number an upload may use.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// The authenticated caller, as supplied by the host authentication system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap a user name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The user name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A part as reported by the object store, or as submitted for completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartDescriptor {
    /// 1-based part number.
    pub part_number: u32,
    /// ETag returned by the store for this part.
    pub e_tag: String,
    /// Part size in bytes, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Upload time, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl PartDescriptor {
    /// A part known only by number and ETag.
    pub fn new(part_number: u32, e_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.into(),
            size: None,
            last_modified: None,
        }
    }
}

/// What a presigned URL allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PresignOperation {
    /// PUT of a whole object.
    PutObject,
    /// PUT of one multipart part.
    #[serde(rename_all = "camelCase")]
    PutPart {
        /// The part this URL uploads.
        part_number: u32,
    },
    /// GET of a whole object.
    GetObject,
}

/// A time-limited URL letting a client talk to the store directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedGrant {
    /// The presigned URL.
    pub url: String,
    /// Instant after which the store rejects the URL.
    pub expires_at: DateTime<Utc>,
    /// What the URL allows.
    pub operation: PresignOperation,
}

impl PresignedGrant {
    /// A grant issued at `issued_at` that lives for `ttl`.
    pub fn new(
        url: impl Into<String>,
        operation: PresignOperation,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            url: url.into(),
            expires_at: issued_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            operation,
        }
    }

    /// Whether the grant is no longer usable at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_fix_expiry_at_grant_time() {
        let issued = Utc::now();
        let grant = PresignedGrant::new(
            "http://example.com/x",
            PresignOperation::PutPart { part_number: 1 },
            issued,
            Duration::from_secs(3600),
        );
        assert_eq!(grant.expires_at - issued, chrono::Duration::seconds(3600));
        assert!(!grant.is_expired_at(issued));
        assert!(grant.is_expired_at(issued + chrono::Duration::seconds(3601)));
    }

    #[test]
    fn test_should_serialize_part_descriptor_in_camel_case() {
        let part = PartDescriptor {
            size: Some(5),
            ..PartDescriptor::new(2, "\"abc\"")
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["partNumber"], 2);
        assert_eq!(json["eTag"], "\"abc\"");
        assert_eq!(json["size"], 5);
        assert!(json.get("lastModified").is_none());
    }

    #[test]
    fn test_should_tag_presign_operation() {
        let json = serde_json::to_value(PresignOperation::PutPart { part_number: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "putPart", "partNumber": 7}));
    }
}
