//! Multipart upload protocol engine.
//!
//! Every operation re-checks authorization against the catalog before it
//! touches the store. The order is fixed: principal, owner id, catalog
//! permission, session state, key ownership, then the store.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parcel_model::input::SubmittedPart;
use parcel_model::{PartDescriptor, PresignedGrant, Principal};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::{LocationUpdate, Permission, RecordCatalog, ResourceRecord};
use crate::config::UploadConfig;
use crate::error::{UploadError, UploadResult};
use crate::gateway::{GatewayError, ObjectStoreGateway};
use crate::keys::KeyPathBuilder;
use crate::parts::{normalize_completion, parse_part_number};
use crate::session::{RecordSync, SessionStatus, UploadSession};
use crate::validation::{is_valid_filename, required, validate_filename};

/// Name of the probe object written by [`UploadCoordinator::check_store_access`].
pub const ACCESS_PROBE_KEY: &str = "exist.txt";

/// A freshly initiated multipart upload.
#[derive(Debug, Clone)]
pub struct InitiatedUpload {
    /// The session to hand back to the client.
    pub session: UploadSession,
    /// Entity id embedded in the key.
    pub entity_id: String,
}

/// Presigned part URLs for one `prepare_parts` call.
#[derive(Debug, Clone, Default)]
pub struct PreparedParts {
    /// Signed parts, ascending.
    pub grants: Vec<(u32, PresignedGrant)>,
}

/// Result of a successful completion.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    /// Location of the assembled object.
    pub location: String,
    /// Composite ETag.
    pub e_tag: String,
    /// Object key.
    pub key: String,
    /// Outcome of the best-effort catalog update.
    pub record: RecordSync,
}

/// A presigned single-object PUT.
#[derive(Debug, Clone)]
pub struct SignedPut {
    /// Fresh record id the object is stored under.
    pub resource_id: String,
    /// Object key.
    pub key: String,
    /// The grant.
    pub grant: PresignedGrant,
}

/// Drives uploads through the store and reconciles with the catalog.
#[derive(Debug, Clone)]
pub struct UploadCoordinator {
    keys: KeyPathBuilder,
    part_url_ttl: Duration,
    signed_url_ttl: Duration,
    max_list_parts: u32,
    store: Arc<dyn ObjectStoreGateway>,
    catalog: Arc<dyn RecordCatalog>,
}

impl UploadCoordinator {
    /// Create a coordinator.
    pub fn new(
        config: &UploadConfig,
        store: Arc<dyn ObjectStoreGateway>,
        catalog: Arc<dyn RecordCatalog>,
    ) -> Self {
        Self {
            keys: KeyPathBuilder::from_config(config),
            part_url_ttl: config.part_url_ttl(),
            signed_url_ttl: config.signed_url_ttl(),
            max_list_parts: config.max_list_parts,
            store,
            catalog,
        }
    }

    /// Key builder in use.
    #[must_use]
    pub fn keys(&self) -> &KeyPathBuilder {
        &self.keys
    }

    /// Write a small probe object to confirm the store accepts writes.
    pub async fn check_store_access(&self) -> UploadResult<()> {
        self.store
            .put_object(
                ACCESS_PROBE_KEY,
                Bytes::from_static(b"This file is used to check bucket access"),
                "text/plain",
            )
            .await
            .map_err(UploadError::from)?;
        info!(bucket = %self.store.bucket(), "Object store is writable");
        Ok(())
    }

    /// Start a multipart upload for `filename` under `owner_id`.
    pub async fn initiate(
        &self,
        principal: Option<&Principal>,
        owner_id: Option<&str>,
        filename: Option<&str>,
        content_type: Option<&str>,
        record_id: Option<&str>,
    ) -> UploadResult<InitiatedUpload> {
        let (principal, owner_id) = self
            .authorize(principal, owner_id, Permission::Create)
            .await?;
        let filename = validate_filename(filename)?;

        let record_id = record_id
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToOwned::to_owned);
        let entity_id = record_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let session_id = uuid::Uuid::new_v4().simple().to_string();
        let key = self
            .keys
            .build_scoped_path(owner_id, &entity_id, &session_id, filename)?;

        let content_type = content_type
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.essence_str())
            .to_owned();

        let handle = self
            .store
            .create_multipart_upload(&key, &content_type)
            .await?;

        info!(
            upload_id = %handle.upload_id,
            key = %handle.key,
            owner_id,
            principal = %principal,
            "Initiated multipart upload"
        );

        Ok(InitiatedUpload {
            session: UploadSession::initiated(
                handle.upload_id,
                handle.key,
                owner_id.to_owned(),
                principal.clone(),
                record_id,
                content_type,
            ),
            entity_id,
        })
    }

    /// Presign PUT URLs for the requested parts.
    ///
    /// Malformed entries and parts the store refuses are left out of the
    /// result. If nothing could be signed because the store failed, that
    /// failure is returned. An upload the store no longer knows is
    /// `NotFound`, so finished sessions never get fresh URLs.
    pub async fn prepare_parts(
        &self,
        principal: Option<&Principal>,
        session: &mut UploadSession,
        part_numbers: &[Value],
    ) -> UploadResult<PreparedParts> {
        self.authorize_session(principal, session, Permission::Create)
            .await?;
        self.ensure_upload_open(session).await?;
        session.mark_parts_in_flight();

        let mut prepared = PreparedParts::default();
        let mut last_failure = None;
        for entry in part_numbers {
            let Some(part_number) = parse_part_number(entry) else {
                debug!(upload_id = %session.upload_id, %entry, "Skipping malformed part entry");
                continue;
            };
            if prepared.grants.iter().any(|(n, _)| *n == part_number) {
                continue;
            }
            match self
                .store
                .presign_part_upload(
                    &session.key,
                    &session.upload_id,
                    part_number,
                    self.part_url_ttl,
                )
                .await
            {
                Ok(grant) => prepared.grants.push((part_number, grant)),
                Err(err) => {
                    warn!(
                        upload_id = %session.upload_id,
                        part_number,
                        error = %err,
                        "Skipping part the store refused to sign"
                    );
                    if !matches!(err, GatewayError::InvalidArgument(_)) {
                        last_failure = Some(err);
                    }
                }
            }
        }

        if prepared.grants.is_empty() {
            if let Some(err) = last_failure {
                return Err(err.into());
            }
        }
        prepared.grants.sort_by_key(|(n, _)| *n);
        debug!(
            upload_id = %session.upload_id,
            signed = prepared.grants.len(),
            requested = part_numbers.len(),
            "Prepared part URLs"
        );
        Ok(prepared)
    }

    /// Presign a PUT URL for one part.
    pub async fn sign_part(
        &self,
        principal: Option<&Principal>,
        session: &mut UploadSession,
        part_number: Option<&Value>,
    ) -> UploadResult<(u32, PresignedGrant)> {
        self.authorize_session(principal, session, Permission::Create)
            .await?;
        let part_number = part_number.and_then(parse_part_number).ok_or_else(|| {
            UploadError::validation(
                "partNumber",
                "partNumber must be an integer between 1 and 10000",
            )
        })?;
        self.ensure_upload_open(session).await?;
        session.mark_parts_in_flight();

        let grant = self
            .store
            .presign_part_upload(
                &session.key,
                &session.upload_id,
                part_number,
                self.part_url_ttl,
            )
            .await?;
        Ok((part_number, grant))
    }

    /// Parts the store has received, ascending.
    pub async fn list_parts(
        &self,
        principal: Option<&Principal>,
        session: &mut UploadSession,
    ) -> UploadResult<Vec<PartDescriptor>> {
        self.authorize_session(principal, session, Permission::Read)
            .await?;
        session.mark_parts_in_flight();

        let mut parts = self
            .store
            .list_parts(&session.key, &session.upload_id, self.max_list_parts)
            .await?;
        parts.sort_by_key(|p| p.part_number);
        Ok(parts)
    }

    /// Assemble the submitted parts and point the record at the result.
    pub async fn complete_upload(
        &self,
        principal: Option<&Principal>,
        session: &mut UploadSession,
        submitted: &[SubmittedPart],
        record_id: Option<&str>,
    ) -> UploadResult<CompletedUpload> {
        self.authorize_session(principal, session, Permission::Update)
            .await?;
        if submitted.is_empty() {
            return Err(UploadError::validation("parts", "parts must not be empty"));
        }

        let parts = normalize_completion(submitted);
        if parts.is_empty() {
            return Err(UploadError::InvalidState(
                "No valid parts to complete the upload with".to_owned(),
            ));
        }

        let completed = self
            .store
            .complete_multipart_upload(&session.key, &session.upload_id, &parts)
            .await?;
        session.mark_completed();
        info!(
            upload_id = %session.upload_id,
            key = %session.key,
            parts = parts.len(),
            "Completed multipart upload"
        );

        let record_id = record_id
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| session.associated_record_id.clone());
        let record = match record_id {
            None => RecordSync::NotRequested,
            Some(record_id) => self.sync_record(session, &record_id, &completed.location).await,
        };

        Ok(CompletedUpload {
            location: completed.location,
            e_tag: completed.e_tag,
            key: session.key.clone(),
            record,
        })
    }

    /// Discard the upload. Aborting twice succeeds.
    pub async fn abort_upload(
        &self,
        principal: Option<&Principal>,
        session: &mut UploadSession,
    ) -> UploadResult<()> {
        let (principal, _) = self
            .authorize(principal, Some(session.owner_id.as_str()), Permission::Delete)
            .await?;
        if session.status() == SessionStatus::Aborted {
            return Ok(());
        }
        session.ensure_active()?;
        self.check_key_ownership(session)?;

        match self
            .store
            .abort_multipart_upload(&session.key, &session.upload_id)
            .await
        {
            Ok(()) => {}
            Err(GatewayError::NotFound(_)) => match self.store.head_object(&session.key).await {
                Ok(_) => {
                    return Err(UploadError::InvalidState(format!(
                        "Upload {} was already completed",
                        session.upload_id
                    )));
                }
                Err(GatewayError::NotFound(_)) => {
                    debug!(upload_id = %session.upload_id, "Upload was already aborted");
                }
                Err(err) => return Err(err.into()),
            },
            Err(err) => return Err(err.into()),
        }

        session.mark_aborted();
        info!(
            upload_id = %session.upload_id,
            key = %session.key,
            principal = %principal,
            "Aborted multipart upload"
        );
        Ok(())
    }

    /// Presign a single-object PUT for a new record.
    pub async fn signed_put_url(
        &self,
        principal: Option<&Principal>,
        owner_id: Option<&str>,
        filename: Option<&str>,
    ) -> UploadResult<SignedPut> {
        let (_, owner_id) = self
            .authorize(principal, owner_id, Permission::Create)
            .await?;
        let filename = validate_filename(filename)?;

        let resource_id = uuid::Uuid::new_v4().to_string();
        let key = self.keys.build_path(&resource_id, filename)?;
        let grant = self
            .store
            .presign_object_put(&key, self.signed_url_ttl)
            .await
            .map_err(UploadError::Backend)?;

        debug!(owner_id, resource_id = %resource_id, key = %key, "Issued signed PUT URL");
        Ok(SignedPut {
            resource_id,
            key,
            grant,
        })
    }

    /// Presign a GET for the object a record points at.
    pub async fn download_url(
        &self,
        principal: Option<&Principal>,
        owner_id: Option<&str>,
        record_id: Option<&str>,
    ) -> UploadResult<PresignedGrant> {
        let (_, owner_id) = self.authorize(principal, owner_id, Permission::Read).await?;
        let record = self.owned_record(owner_id, record_id).await?;
        let key = self.record_key(&record)?;

        self.store.head_object(&key).await?;
        Ok(self
            .store
            .presign_object_get(&key, self.signed_url_ttl)
            .await?)
    }

    /// Delete the object a record points at. Returns the deleted key.
    pub async fn purge_record_object(
        &self,
        principal: Option<&Principal>,
        owner_id: Option<&str>,
        record_id: Option<&str>,
    ) -> UploadResult<String> {
        let (_, owner_id) = self
            .authorize(principal, owner_id, Permission::Delete)
            .await?;
        let record = self.owned_record(owner_id, record_id).await?;
        let key = self.record_key(&record)?;

        self.store.delete_object(&key).await?;
        info!(record_id = %record.id, key = %key, "Deleted record object");
        Ok(key)
    }

    async fn authorize<'p, 'o>(
        &self,
        principal: Option<&'p Principal>,
        owner_id: Option<&'o str>,
        permission: Permission,
    ) -> UploadResult<(&'p Principal, &'o str)> {
        let principal = principal
            .ok_or_else(|| UploadError::Unauthorized("Authentication required".to_owned()))?;
        let owner_id = required("ownerId", owner_id)?;
        self.catalog.fetch_owner(owner_id).await?;
        self.catalog
            .check_access(principal, permission, owner_id)
            .await?;
        Ok((principal, owner_id))
    }

    async fn authorize_session(
        &self,
        principal: Option<&Principal>,
        session: &UploadSession,
        permission: Permission,
    ) -> UploadResult<()> {
        self.authorize(principal, Some(session.owner_id.as_str()), permission)
            .await?;
        session.ensure_active()?;
        self.check_key_ownership(session)
    }

    /// Presigning is offline, so ask the store whether the upload is still open.
    async fn ensure_upload_open(&self, session: &UploadSession) -> UploadResult<()> {
        match self
            .store
            .list_parts(&session.key, &session.upload_id, 1)
            .await
        {
            Ok(_) => Ok(()),
            Err(GatewayError::NotFound(_)) => Err(UploadError::NotFound(format!(
                "Upload {} is no longer open",
                session.upload_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn check_key_ownership(&self, session: &UploadSession) -> UploadResult<()> {
        required("uploadId", Some(session.upload_id.as_str()))?;
        required("key", Some(session.key.as_str()))?;
        if self.keys.owns(&session.owner_id, &session.key) {
            Ok(())
        } else {
            Err(UploadError::Unauthorized(format!(
                "Key {} does not belong to owner {}",
                session.key, session.owner_id
            )))
        }
    }

    async fn sync_record(
        &self,
        session: &UploadSession,
        record_id: &str,
        location: &str,
    ) -> RecordSync {
        let update = LocationUpdate {
            url: location.to_owned(),
            storage_key: session.key.clone(),
            upload_id: session.upload_id.clone(),
        };
        match self
            .catalog
            .attach_location(&session.owner_id, record_id, update)
            .await
        {
            Ok(_) => RecordSync::Updated,
            Err(err) => {
                warn!(
                    upload_id = %session.upload_id,
                    record_id,
                    error = %err,
                    "Upload completed but the record was not updated"
                );
                RecordSync::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn owned_record(
        &self,
        owner_id: &str,
        record_id: Option<&str>,
    ) -> UploadResult<ResourceRecord> {
        let record_id = required("recordId", record_id)?;
        let record = self.catalog.fetch_record(record_id).await?;
        if record.owner_id != owner_id {
            return Err(UploadError::NotFound(format!(
                "Record {record_id} under owner {owner_id}"
            )));
        }
        Ok(record)
    }

    /// Key of the object a record points at.
    ///
    /// Prefers the key stored at completion. Older records only carry a URL;
    /// their key is rebuilt from the URL's file name the way single-file
    /// uploads derive it.
    fn record_key(&self, record: &ResourceRecord) -> UploadResult<String> {
        if let Some(key) = record.storage_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_owned());
        }
        let url = record
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| UploadError::NotFound(format!("Record {} has no object", record.id)))?;
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let filename = path.rsplit('/').next().unwrap_or(path);
        let filename = percent_encoding::percent_decode_str(filename).decode_utf8_lossy();
        if !is_valid_filename(&filename) {
            return Err(UploadError::validation(
                "url",
                format!("Cannot derive an object key from {url}"),
            ));
        }
        let key = self.keys.build_path(&record.id, &filename)?;
        warn!(record_id = %record.id, key = %key, "Rebuilt object key from record URL");
        Ok(key)
    }
}
