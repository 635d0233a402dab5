//! Action handler bridging the HTTP layer to the coordinator.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use parcel_http::ActionResponseBody;
use parcel_http::dispatch::{ActionFuture, ActionHandler, ObjectFuture};
use parcel_model::input::{
    CompleteMultipartUploadInput, GetSignedUrlInput, InitiateUploadInput,
    PrepareUploadPartsInput, RecordObjectInput, SessionInput, SignPartInput, UploadRef,
};
use parcel_model::output::{
    AbortMultipartUploadOutput, CompleteMultipartUploadOutput, DownloadUrlOutput,
    GetSignedUrlOutput, InitiateUploadOutput, ListPartsOutput, ObjectDeleteOutput,
    PrepareUploadPartsOutput, SignPartOutput,
};
use parcel_model::{ActionError, Principal, UploadAction};

use crate::coordinator::UploadCoordinator;
use crate::error::UploadError;
use crate::gateway::{MemoryObjectStore, MemoryStoreError, StoreReply};
use crate::session::{RecordSync, UploadSession};
use crate::uploader::{UploadHandle, UploadKind, UploadTarget, uploader_for};

/// Serves upload actions, and the data plane when the memory store is used.
#[derive(Debug, Clone)]
pub struct ParcelHandler {
    coordinator: Arc<UploadCoordinator>,
    data_plane: Option<Arc<MemoryObjectStore>>,
}

impl ParcelHandler {
    /// Handler for actions only.
    #[must_use]
    pub fn new(coordinator: Arc<UploadCoordinator>) -> Self {
        Self {
            coordinator,
            data_plane: None,
        }
    }

    /// Also serve presigned requests against `store`.
    #[must_use]
    pub fn with_data_plane(mut self, store: Arc<MemoryObjectStore>) -> Self {
        self.data_plane = Some(store);
        self
    }

    async fn run(
        &self,
        action: UploadAction,
        principal: Option<Principal>,
        body: Bytes,
    ) -> Result<serde_json::Value, ActionError> {
        let principal = principal.as_ref();
        match action {
            UploadAction::CreateMultipartUpload => {
                let input: InitiateUploadInput = parse(&body)?;
                let uploader = self.uploader(UploadKind::Multipart, input.owner_id.clone());
                let handle = uploader
                    .upload(
                        principal,
                        input.filename.as_deref(),
                        input.content_type.as_deref(),
                        input.record_id.as_deref(),
                    )
                    .await?;
                let UploadHandle::Session(initiated) = handle else {
                    return Err(unexpected_handle(action));
                };
                to_value(&InitiateUploadOutput {
                    upload_id: initiated.session.upload_id,
                    key: initiated.session.key,
                    record_id: initiated.entity_id,
                })
            }
            UploadAction::PrepareUploadParts => {
                let input: PrepareUploadPartsInput = parse(&body)?;
                let mut session = resume(principal, &input.upload)?;
                let prepared = self
                    .coordinator
                    .prepare_parts(principal, &mut session, &input.parts)
                    .await?;
                let expires_at = prepared.grants.first().map(|(_, g)| g.expires_at);
                let presigned_urls: BTreeMap<u32, String> = prepared
                    .grants
                    .into_iter()
                    .map(|(n, grant)| (n, grant.url))
                    .collect();
                to_value(&PrepareUploadPartsOutput {
                    presigned_urls,
                    expires_at,
                })
            }
            UploadAction::SignPart => {
                let input: SignPartInput = parse(&body)?;
                let mut session = resume(principal, &input.upload)?;
                let (part_number, grant) = self
                    .coordinator
                    .sign_part(principal, &mut session, input.part_number.as_ref())
                    .await?;
                to_value(&SignPartOutput {
                    part_number,
                    url: grant.url,
                    expires_at: grant.expires_at,
                })
            }
            UploadAction::ListParts => {
                let input: SessionInput = parse(&body)?;
                let mut session = resume(principal, &input.upload)?;
                let parts = self
                    .coordinator
                    .list_parts(principal, &mut session)
                    .await?;
                to_value(&ListPartsOutput { parts })
            }
            UploadAction::CompleteMultipartUpload => {
                let input: CompleteMultipartUploadInput = parse(&body)?;
                let mut session = resume(principal, &input.upload)?;
                let done = self
                    .coordinator
                    .complete_upload(
                        principal,
                        &mut session,
                        &input.parts,
                        input.record_id.as_deref(),
                    )
                    .await?;
                let record_error = match &done.record {
                    RecordSync::Failed { reason } => Some(reason.clone()),
                    RecordSync::NotRequested | RecordSync::Updated => None,
                };
                to_value(&CompleteMultipartUploadOutput {
                    location: done.location,
                    e_tag: done.e_tag,
                    key: done.key,
                    record_updated: done.record.is_updated(),
                    record_error,
                })
            }
            UploadAction::AbortMultipartUpload => {
                let input: SessionInput = parse(&body)?;
                let mut session = resume(principal, &input.upload)?;
                self.coordinator
                    .abort_upload(principal, &mut session)
                    .await?;
                to_value(&AbortMultipartUploadOutput {
                    aborted: true,
                    message: "Multipart upload aborted".to_owned(),
                })
            }
            UploadAction::GetSignedUrl => {
                let input: GetSignedUrlInput = parse(&body)?;
                let uploader = self.uploader(UploadKind::SingleFile, input.owner_id.clone());
                let handle = uploader
                    .upload(principal, input.filename.as_deref(), None, None)
                    .await?;
                let UploadHandle::Grant(signed) = handle else {
                    return Err(unexpected_handle(action));
                };
                to_value(&GetSignedUrlOutput {
                    resource_id: signed.resource_id,
                    signed_url: signed.grant.url,
                    key: signed.key,
                    expires_at: signed.grant.expires_at,
                })
            }
            UploadAction::ResourceDownloadUrl => {
                let input: RecordObjectInput = parse(&body)?;
                let grant = self
                    .coordinator
                    .download_url(
                        principal,
                        input.owner_id.as_deref(),
                        input.record_id.as_deref(),
                    )
                    .await?;
                to_value(&DownloadUrlOutput {
                    url: grant.url,
                    expires_at: grant.expires_at,
                })
            }
            UploadAction::ResourceObjectDelete => {
                let input: RecordObjectInput = parse(&body)?;
                let uploader = self.uploader(UploadKind::SingleFile, input.owner_id.clone());
                let key = uploader
                    .delete(principal, input.record_id.as_deref())
                    .await?;
                to_value(&ObjectDeleteOutput { deleted: true, key })
            }
        }
    }

    fn uploader(&self, kind: UploadKind, owner_id: Option<String>) -> impl UploadTarget {
        uploader_for(kind, Arc::clone(&self.coordinator), owner_id)
    }
}

impl ActionHandler for ParcelHandler {
    fn handle_action(
        &self,
        action: UploadAction,
        principal: Option<Principal>,
        body: Bytes,
    ) -> ActionFuture {
        let handler = self.clone();
        Box::pin(async move { handler.run(action, principal, body).await })
    }

    fn handle_object_request(&self, parts: http::request::Parts, body: Bytes) -> ObjectFuture {
        let store = self.data_plane.clone();
        Box::pin(async move {
            let Some(store) = store else {
                return store_error_response(&MemoryStoreError::BadRequest(
                    "no data plane is served".to_owned(),
                ));
            };
            if parts.method == http::Method::OPTIONS {
                return preflight_response();
            }
            match store.accept_presigned(&parts, body) {
                Ok(reply) => store_response(reply),
                Err(err) => {
                    debug!(path = %parts.uri.path(), error = %err, "Data plane request refused");
                    store_error_response(&err)
                }
            }
        })
    }
}

fn parse<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ActionError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(ActionError::malformed_body)
}

fn to_value<T: Serialize>(output: &T) -> Result<serde_json::Value, ActionError> {
    serde_json::to_value(output).map_err(|e| {
        ActionError::internal_error(format!("Failed to serialize response: {e}"))
    })
}

fn resume(principal: Option<&Principal>, upload: &UploadRef) -> Result<UploadSession, UploadError> {
    let principal = principal
        .ok_or_else(|| UploadError::Unauthorized("Authentication required".to_owned()))?;
    Ok(UploadSession::resume(
        upload.upload_id.clone().unwrap_or_default(),
        upload.key.clone().unwrap_or_default(),
        upload.owner_id.clone().unwrap_or_default(),
        principal.clone(),
    ))
}

fn unexpected_handle(action: UploadAction) -> ActionError {
    ActionError::internal_error(format!("{action} produced the wrong upload handle"))
}

fn store_response(reply: StoreReply) -> http::Response<ActionResponseBody> {
    let mut builder = http::Response::builder()
        .status(reply.status)
        .header("access-control-expose-headers", "ETag");
    if let Some(e_tag) = reply.e_tag {
        builder = builder.header(http::header::ETAG, e_tag);
    }
    let content_type = reply
        .content_type
        .and_then(|ct| http::HeaderValue::from_str(&ct).ok())
        .unwrap_or_else(|| http::HeaderValue::from_static("application/octet-stream"));
    builder = builder.header(http::header::CONTENT_TYPE, content_type);
    let body = if reply.body.is_empty() {
        ActionResponseBody::empty()
    } else {
        ActionResponseBody::from_bytes(reply.body)
    };
    builder.body(body).expect("valid store response")
}

fn store_error_response(err: &MemoryStoreError) -> http::Response<ActionResponseBody> {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{}</Code><Message>{}</Message></Error>",
        err.code(),
        escape_xml(&err.to_string()),
    );
    http::Response::builder()
        .status(err.status_code())
        .header(http::header::CONTENT_TYPE, "application/xml")
        .body(ActionResponseBody::from_bytes(xml))
        .expect("valid store error response")
}

fn preflight_response() -> http::Response<ActionResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("access-control-allow-methods", "GET, HEAD, PUT")
        .header("access-control-allow-headers", "*")
        .header("access-control-expose-headers", "ETag")
        .header("access-control-max-age", "3600")
        .body(ActionResponseBody::empty())
        .expect("valid preflight response")
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
