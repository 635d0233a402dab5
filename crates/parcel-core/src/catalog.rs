//! Metadata catalog collaborator.
//!
//! The broker only needs a narrow view of the host catalog: does the owner
//! exist, may a principal act on it, what does a record point at, and a way
//! to point a record at a finished object.

use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use parcel_model::Principal;
use tracing::debug;

/// What a principal wants to do with an owner's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Create records and upload objects.
    Create,
    /// Read records and download objects.
    Read,
    /// Point records at new objects.
    Update,
    /// Delete records and their objects.
    Delete,
}

impl Permission {
    /// Every permission.
    pub const ALL: [Self; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Errors from the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Owner or record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The principal lacks the permission.
    #[error("{principal} is not authorized to {permission}")]
    NotAuthorized {
        /// Who asked.
        principal: String,
        /// What they asked for.
        permission: Permission,
    },

    /// The catalog could not be reached.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// An entity records are grouped under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecord {
    /// Owner id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A catalog record that may point at an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Record id.
    pub id: String,
    /// Owning entity.
    pub owner_id: String,
    /// Public URL of the object, if any.
    pub url: Option<String>,
    /// Key the object is stored under, once known.
    pub storage_key: Option<String>,
    /// Set once a multipart upload finished into this record.
    pub upload_complete: bool,
    /// Upload that produced the object.
    pub multipart_upload_id: Option<String>,
}

/// Fields written to a record when its upload completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationUpdate {
    /// Location reported by the store.
    pub url: String,
    /// Object key.
    pub storage_key: String,
    /// Upload that produced the object.
    pub upload_id: String,
}

/// Read and write access to the host catalog.
#[async_trait]
pub trait RecordCatalog: Send + Sync + fmt::Debug {
    /// Look up an owner.
    async fn fetch_owner(&self, owner_id: &str) -> Result<OwnerRecord, CatalogError>;

    /// Check `principal` may exercise `permission` on `owner_id`'s records.
    async fn check_access(
        &self,
        principal: &Principal,
        permission: Permission,
        owner_id: &str,
    ) -> Result<(), CatalogError>;

    /// Look up a record.
    async fn fetch_record(&self, record_id: &str) -> Result<ResourceRecord, CatalogError>;

    /// Point a record at a finished object, creating the record if needed.
    async fn attach_location(
        &self,
        owner_id: &str,
        record_id: &str,
        update: LocationUpdate,
    ) -> Result<ResourceRecord, CatalogError>;
}

/// In-process catalog.
///
/// In development mode unknown owners are created on first sight and every
/// principal holds every permission.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    owners: DashMap<String, OwnerRecord>,
    grants: DashMap<Principal, HashMap<String, HashSet<Permission>>>,
    records: DashMap<String, ResourceRecord>,
    development: bool,
}

impl MemoryCatalog {
    /// An empty catalog with explicit grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A permissive catalog for local use.
    #[must_use]
    pub fn development() -> Self {
        Self {
            development: true,
            ..Self::default()
        }
    }

    /// Register an owner.
    pub fn insert_owner(&self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        self.owners.insert(
            id.clone(),
            OwnerRecord {
                id,
                name: name.into(),
            },
        );
    }

    /// Grant permissions on one owner.
    pub fn grant(&self, principal: &Principal, owner_id: &str, permissions: &[Permission]) {
        self.grants
            .entry(principal.clone())
            .or_default()
            .entry(owner_id.to_owned())
            .or_default()
            .extend(permissions.iter().copied());
    }

    /// Insert or replace a record.
    pub fn insert_record(&self, record: ResourceRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// A record by id.
    #[must_use]
    pub fn record(&self, record_id: &str) -> Option<ResourceRecord> {
        self.records.get(record_id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl RecordCatalog for MemoryCatalog {
    async fn fetch_owner(&self, owner_id: &str) -> Result<OwnerRecord, CatalogError> {
        if let Some(owner) = self.owners.get(owner_id) {
            return Ok(owner.value().clone());
        }
        if self.development {
            debug!(owner_id, "Creating owner on first use");
            let owner = OwnerRecord {
                id: owner_id.to_owned(),
                name: owner_id.to_owned(),
            };
            self.owners.insert(owner_id.to_owned(), owner.clone());
            return Ok(owner);
        }
        Err(CatalogError::NotFound(format!("Owner {owner_id}")))
    }

    async fn check_access(
        &self,
        principal: &Principal,
        permission: Permission,
        owner_id: &str,
    ) -> Result<(), CatalogError> {
        if self.development {
            return Ok(());
        }
        let allowed = self
            .grants
            .get(principal)
            .and_then(|g| g.get(owner_id).map(|p| p.contains(&permission)))
            .unwrap_or(false);
        if allowed {
            Ok(())
        } else {
            Err(CatalogError::NotAuthorized {
                principal: principal.to_string(),
                permission,
            })
        }
    }

    async fn fetch_record(&self, record_id: &str) -> Result<ResourceRecord, CatalogError> {
        self.record(record_id)
            .ok_or_else(|| CatalogError::NotFound(format!("Record {record_id}")))
    }

    async fn attach_location(
        &self,
        owner_id: &str,
        record_id: &str,
        update: LocationUpdate,
    ) -> Result<ResourceRecord, CatalogError> {
        let mut record = self
            .records
            .entry(record_id.to_owned())
            .or_insert_with(|| ResourceRecord {
                id: record_id.to_owned(),
                owner_id: owner_id.to_owned(),
                ..ResourceRecord::default()
            });
        if record.owner_id != owner_id {
            return Err(CatalogError::NotFound(format!(
                "Record {record_id} under owner {owner_id}"
            )));
        }
        record.url = Some(update.url);
        record.storage_key = Some(update.storage_key);
        record.multipart_upload_id = Some(update.upload_id);
        record.upload_complete = true;
        Ok(record.value().clone())
    }
}
