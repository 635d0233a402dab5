//! Upload action enum.

use std::fmt;

/// All actions served under `/api/action/<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadAction {
    // Multipart lifecycle
    /// Open a multipart session.
    CreateMultipartUpload,
    /// Presign a batch of part uploads.
    PrepareUploadParts,
    /// Presign one part upload.
    SignPart,
    /// List parts the store has received.
    ListParts,
    /// Assemble the uploaded parts.
    CompleteMultipartUpload,
    /// Discard the session and its parts.
    AbortMultipartUpload,

    // Single objects
    /// Presigned PUT for a small file.
    GetSignedUrl,
    /// Presigned GET for a stored record.
    ResourceDownloadUrl,
    /// Delete the object behind a record.
    ResourceObjectDelete,
}

impl UploadAction {
    /// Every action, in routing order.
    pub const ALL: [Self; 9] = [
        Self::CreateMultipartUpload,
        Self::PrepareUploadParts,
        Self::SignPart,
        Self::ListParts,
        Self::CompleteMultipartUpload,
        Self::AbortMultipartUpload,
        Self::GetSignedUrl,
        Self::ResourceDownloadUrl,
        Self::ResourceObjectDelete,
    ];

    /// The action name used in the URL path.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateMultipartUpload => "create_multipart_upload",
            Self::PrepareUploadParts => "prepare_upload_parts",
            Self::SignPart => "sign_part",
            Self::ListParts => "list_parts",
            Self::CompleteMultipartUpload => "complete_multipart_upload",
            Self::AbortMultipartUpload => "abort_multipart_upload",
            Self::GetSignedUrl => "get_signed_url",
            Self::ResourceDownloadUrl => "resource_download_url",
            Self::ResourceObjectDelete => "resource_object_delete",
        }
    }

    /// Parse an action name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == name)
    }
}

impl fmt::Display for UploadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_resolve_every_action_by_name() {
        for action in UploadAction::ALL {
            assert_eq!(UploadAction::from_name(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_should_reject_unknown_action() {
        assert_eq!(UploadAction::from_name("resource_create"), None);
        assert_eq!(UploadAction::from_name(""), None);
    }
}
