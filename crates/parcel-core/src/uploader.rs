//! Uploader capability.
//!
//! A closed set of upload strategies behind one interface. Callers pick a
//! strategy with [`UploadKind`] and never branch on it again.

use std::sync::Arc;

use async_trait::async_trait;
use parcel_model::Principal;

use crate::coordinator::{InitiatedUpload, SignedPut, UploadCoordinator};
use crate::error::UploadResult;

/// Which upload strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// One presigned PUT for the whole object.
    SingleFile,
    /// A multipart session with per-part URLs.
    Multipart,
}

/// What an upload hands back to the client.
#[derive(Debug, Clone)]
pub enum UploadHandle {
    /// A presigned single-object PUT.
    Grant(SignedPut),
    /// An open multipart session.
    Session(InitiatedUpload),
}

/// Key derivation, upload start and object removal for one owner.
#[async_trait]
pub trait UploadTarget: Send + Sync {
    /// Key an object for `entity_id`/`filename` is stored under.
    fn path(&self, entity_id: &str, filename: &str) -> UploadResult<String>;

    /// Start an upload of `filename`.
    async fn upload(
        &self,
        principal: Option<&Principal>,
        filename: Option<&str>,
        content_type: Option<&str>,
        record_id: Option<&str>,
    ) -> UploadResult<UploadHandle>;

    /// Remove the object a record points at. Missing objects are fine.
    async fn delete(
        &self,
        principal: Option<&Principal>,
        record_id: Option<&str>,
    ) -> UploadResult<String>;
}

/// The upload strategies.
#[derive(Debug, Clone)]
pub enum Uploader {
    /// Single presigned PUT under `<entityType>/<recordId>/<filename>`.
    SingleFile {
        /// Coordinator doing the work.
        coordinator: Arc<UploadCoordinator>,
        /// Owner the upload belongs to.
        owner_id: Option<String>,
    },
    /// Multipart session under `<entityType>/<ownerId>/<recordId>/<filename>`.
    Multipart {
        /// Coordinator doing the work.
        coordinator: Arc<UploadCoordinator>,
        /// Owner the upload belongs to.
        owner_id: Option<String>,
    },
}

/// Build the uploader for `kind`.
pub fn uploader_for(
    kind: UploadKind,
    coordinator: Arc<UploadCoordinator>,
    owner_id: Option<String>,
) -> Uploader {
    match kind {
        UploadKind::SingleFile => Uploader::SingleFile {
            coordinator,
            owner_id,
        },
        UploadKind::Multipart => Uploader::Multipart {
            coordinator,
            owner_id,
        },
    }
}

impl Uploader {
    /// The strategy in use.
    #[must_use]
    pub fn kind(&self) -> UploadKind {
        match self {
            Self::SingleFile { .. } => UploadKind::SingleFile,
            Self::Multipart { .. } => UploadKind::Multipart,
        }
    }

    fn parts(&self) -> (&UploadCoordinator, Option<&str>) {
        match self {
            Self::SingleFile {
                coordinator,
                owner_id,
            }
            | Self::Multipart {
                coordinator,
                owner_id,
            } => (coordinator, owner_id.as_deref()),
        }
    }
}

#[async_trait]
impl UploadTarget for Uploader {
    fn path(&self, entity_id: &str, filename: &str) -> UploadResult<String> {
        let (coordinator, owner_id) = self.parts();
        match self {
            Self::SingleFile { .. } => coordinator.keys().build_path(entity_id, filename),
            Self::Multipart { .. } => coordinator.keys().build_scoped_path(
                owner_id.unwrap_or_default(),
                entity_id,
                &uuid::Uuid::new_v4().simple().to_string(),
                filename,
            ),
        }
    }

    async fn upload(
        &self,
        principal: Option<&Principal>,
        filename: Option<&str>,
        content_type: Option<&str>,
        record_id: Option<&str>,
    ) -> UploadResult<UploadHandle> {
        let (coordinator, owner_id) = self.parts();
        match self {
            Self::SingleFile { .. } => coordinator
                .signed_put_url(principal, owner_id, filename)
                .await
                .map(UploadHandle::Grant),
            Self::Multipart { .. } => coordinator
                .initiate(principal, owner_id, filename, content_type, record_id)
                .await
                .map(UploadHandle::Session),
        }
    }

    async fn delete(
        &self,
        principal: Option<&Principal>,
        record_id: Option<&str>,
    ) -> UploadResult<String> {
        let (coordinator, owner_id) = self.parts();
        coordinator
            .purge_record_object(principal, owner_id, record_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::UploadConfig;
    use crate::gateway::MemoryObjectStore;

    fn coordinator() -> Arc<UploadCoordinator> {
        let config = UploadConfig::default();
        Arc::new(UploadCoordinator::new(
            &config,
            Arc::new(MemoryObjectStore::from_config(&config).unwrap()),
            Arc::new(MemoryCatalog::development()),
        ))
    }

    #[test]
    fn test_should_build_uploader_for_kind() {
        let c = coordinator();
        let single = uploader_for(UploadKind::SingleFile, Arc::clone(&c), Some("pkg-1".into()));
        let multi = uploader_for(UploadKind::Multipart, c, Some("pkg-1".into()));
        assert_eq!(single.kind(), UploadKind::SingleFile);
        assert_eq!(multi.kind(), UploadKind::Multipart);
        assert_eq!(single.path("r-1", "a.csv").unwrap(), "resources/r-1/a.csv");
        let first = multi.path("r-1", "a.csv").unwrap();
        assert!(first.starts_with("resources/pkg-1/r-1/"));
        assert!(first.ends_with("/a.csv"));
        assert_ne!(first, multi.path("r-1", "a.csv").unwrap());
    }

    #[tokio::test]
    async fn test_should_upload_through_each_strategy() {
        let c = coordinator();
        let alice = Principal::new("alice");

        let single = uploader_for(UploadKind::SingleFile, Arc::clone(&c), Some("pkg-1".into()));
        let handle = single
            .upload(Some(&alice), Some("a.csv"), None, None)
            .await
            .unwrap();
        assert!(matches!(handle, UploadHandle::Grant(ref g) if g.key.ends_with("/a.csv")));

        let multi = uploader_for(UploadKind::Multipart, c, Some("pkg-1".into()));
        let handle = multi
            .upload(Some(&alice), Some("a.csv"), Some("text/csv"), Some("r-1"))
            .await
            .unwrap();
        match handle {
            UploadHandle::Session(initiated) => {
                assert!(initiated.session.key.starts_with("resources/pkg-1/r-1/"));
                assert!(initiated.session.key.ends_with("/a.csv"));
            }
            UploadHandle::Grant(_) => panic!("expected a multipart session"),
        }
    }

    #[tokio::test]
    async fn test_should_require_owner_for_upload() {
        let single = uploader_for(UploadKind::SingleFile, coordinator(), None);
        assert!(
            single
                .upload(Some(&Principal::new("alice")), Some("a.csv"), None, None)
                .await
                .is_err()
        );
    }
}
