//! In-process S3-compatible object store.
//!
//! Tracks multipart uploads and objects in memory and issues real SigV4
//! presigned URLs pointing at its own data plane (`/_store/<bucket>/<key>`).
//! [`MemoryObjectStore::accept_presigned`] verifies those URLs and applies the
//! upload or download they authorize, so a browser can run the full multipart
//! protocol against a local server.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use md5::{Digest, Md5};
use rand::RngExt;
use tracing::{debug, info};

use parcel_auth::{
    AuthError, Credentials, PresignRequest, Presigner, StaticCredentialProvider, verify_presigned,
};
use parcel_model::{PartDescriptor, PresignOperation, PresignedGrant};

use super::{
    CompletedObject, GatewayError, MultipartHandle, ObjectHead, ObjectStoreGateway,
    check_completion_parts, check_part_number, encode_key,
};
use crate::config::UploadConfig;

/// Key pair used when no credentials are configured.
const LOCAL_ACCESS_KEY_ID: &str = "PARCELLOCALACCESSKEY";
const LOCAL_SECRET_ACCESS_KEY: &str = "parcel-local-secret-access-key";

/// Failures of the in-process store, named after the S3 error codes.
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    /// Unknown upload id, or the key does not match it.
    #[error("The specified upload does not exist: {0}")]
    NoSuchUpload(String),

    /// Unknown object key.
    #[error("The specified key does not exist: {0}")]
    NoSuchKey(String),

    /// A listed part was never uploaded or its ETag differs.
    #[error("Part {0} could not be found or its ETag does not match")]
    InvalidPart(u32),

    /// The completion list is not strictly ascending.
    #[error("The list of parts was not in ascending order")]
    InvalidPartOrder,

    /// A non-final part is below the minimum size.
    #[error("Part {part_number} is {size} bytes, below the {minimum} byte minimum")]
    EntityTooSmall {
        /// Offending part.
        part_number: u32,
        /// Its size.
        size: u64,
        /// Configured minimum.
        minimum: u64,
    },

    /// The presigned URL failed verification.
    #[error("Access denied: {0}")]
    AccessDenied(#[from] AuthError),

    /// The request does not map to a store operation.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl MemoryStoreError {
    /// S3 error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuchUpload(_) => "NoSuchUpload",
            Self::NoSuchKey(_) => "NoSuchKey",
            Self::InvalidPart(_) => "InvalidPart",
            Self::InvalidPartOrder => "InvalidPartOrder",
            Self::EntityTooSmall { .. } => "EntityTooSmall",
            Self::AccessDenied(AuthError::RequestExpired) => "ExpiredToken",
            Self::AccessDenied(AuthError::SignatureDoesNotMatch) => "SignatureDoesNotMatch",
            Self::AccessDenied(_) => "AccessDenied",
            Self::BadRequest(_) => "InvalidRequest",
        }
    }

    /// HTTP status the data plane answers with.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::NoSuchUpload(_) | Self::NoSuchKey(_) => http::StatusCode::NOT_FOUND,
            Self::AccessDenied(_) => http::StatusCode::FORBIDDEN,
            _ => http::StatusCode::BAD_REQUEST,
        }
    }

    fn into_gateway(self, operation: &'static str) -> GatewayError {
        match self {
            Self::NoSuchUpload(_) | Self::NoSuchKey(_) => GatewayError::NotFound(self.to_string()),
            other => GatewayError::Backend {
                operation,
                code: other.code().to_owned(),
                message: other.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Response of the data plane.
#[derive(Debug, Clone)]
pub struct StoreReply {
    /// HTTP status.
    pub status: http::StatusCode,
    /// ETag header value.
    pub e_tag: Option<String>,
    /// Content type header value.
    pub content_type: Option<String>,
    /// Response body (object bytes for GET, empty otherwise).
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct MultipartUpload {
    key: String,
    content_type: String,
    parts: BTreeMap<u32, UploadPart>,
}

#[derive(Debug, Clone)]
struct UploadPart {
    etag: String,
    md5_hex: String,
    last_modified: DateTime<Utc>,
    data: Bytes,
}

impl UploadPart {
    fn descriptor(&self, part_number: u32) -> PartDescriptor {
        PartDescriptor {
            part_number,
            e_tag: self.etag.clone(),
            size: Some(self.data.len() as u64),
            last_modified: Some(self.last_modified),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    etag: String,
    content_type: String,
    last_modified: DateTime<Utc>,
    data: Bytes,
}

/// In-memory [`ObjectStoreGateway`] with a presigned data plane.
#[derive(Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    endpoint: String,
    endpoint_path: String,
    signer: Presigner,
    read_signer: Presigner,
    verifier: StaticCredentialProvider,
    min_part_size: u64,
    uploads: DashMap<String, MultipartUpload>,
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    /// Build the store from configuration.
    ///
    /// Uses the configured key pairs when present and a fixed local pair
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidArgument`] if `public_endpoint` is not an
    /// absolute URL.
    pub fn from_config(config: &UploadConfig) -> Result<Self, GatewayError> {
        let write = config
            .write_credentials()
            .unwrap_or_else(|| Credentials::new(LOCAL_ACCESS_KEY_ID, LOCAL_SECRET_ACCESS_KEY));
        let read = config.readonly_credentials().unwrap_or_else(|| write.clone());

        let endpoint = config.public_endpoint.trim_end_matches('/').to_owned();
        let endpoint_path = endpoint
            .parse::<http::Uri>()
            .map_err(|e| GatewayError::InvalidArgument(format!("public endpoint: {e}")))?
            .path()
            .trim_end_matches('/')
            .to_owned();

        let signer = Presigner::new(&endpoint, config.region.clone(), write.clone())
            .map_err(|e| GatewayError::InvalidArgument(e.to_string()))?;
        let read_signer = Presigner::new(&endpoint, config.region.clone(), read.clone())
            .map_err(|e| GatewayError::InvalidArgument(e.to_string()))?;

        Ok(Self {
            bucket: config.bucket_name.clone(),
            endpoint,
            endpoint_path,
            signer,
            read_signer,
            verifier: StaticCredentialProvider::new([write, read]),
            min_part_size: config.min_part_size,
            uploads: DashMap::new(),
            objects: DashMap::new(),
        })
    }

    /// Path prefix the data plane is mounted at (e.g. `/_store`).
    #[must_use]
    pub fn endpoint_path(&self) -> &str {
        &self.endpoint_path
    }

    /// Number of multipart uploads still open.
    #[must_use]
    pub fn open_uploads(&self) -> usize {
        self.uploads.len()
    }

    /// Stored bytes of an object.
    #[must_use]
    pub fn object_bytes(&self, key: &str) -> Option<Bytes> {
        self.objects.get(key).map(|o| o.data.clone())
    }

    /// Store one part, as a presigned part PUT would. Returns the part ETag.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryStoreError::NoSuchUpload`] for an unknown upload or a
    /// key mismatch, and [`MemoryStoreError::BadRequest`] for an out-of-range
    /// part number.
    pub fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> Result<String, MemoryStoreError> {
        check_part_number(part_number).map_err(|e| MemoryStoreError::BadRequest(e.to_string()))?;

        let mut upload = self
            .uploads
            .get_mut(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| MemoryStoreError::NoSuchUpload(upload_id.to_owned()))?;

        let md5_hex = hex::encode(Md5::digest(&data));
        let etag = format!("\"{md5_hex}\"");
        upload.parts.insert(
            part_number,
            UploadPart {
                etag: etag.clone(),
                md5_hex,
                last_modified: Utc::now(),
                data,
            },
        );

        debug!(upload_id, part_number, "Stored part");
        Ok(etag)
    }

    /// Verify a presigned request and apply it.
    ///
    /// `PUT ?partNumber&uploadId` stores a part, plain `PUT` stores an object,
    /// `GET`/`HEAD` read an object.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryStoreError::AccessDenied`] when verification fails and
    /// the matching store error otherwise.
    pub fn accept_presigned(
        &self,
        parts: &http::request::Parts,
        body: Bytes,
    ) -> Result<StoreReply, MemoryStoreError> {
        verify_presigned(parts, &self.verifier)?;

        let key = self.key_from_path(parts.uri.path())?;
        let mut part_number = None;
        let mut upload_id = None;
        for (name, value) in form_urlencoded::parse(parts.uri.query().unwrap_or("").as_bytes()) {
            match name.as_ref() {
                "partNumber" => part_number = Some(value.into_owned()),
                "uploadId" => upload_id = Some(value.into_owned()),
                _ => {}
            }
        }

        let method = &parts.method;
        match (part_number, upload_id) {
            (Some(number), Some(upload_id)) if method == http::Method::PUT => {
                let number = number
                    .parse::<u32>()
                    .map_err(|_| MemoryStoreError::BadRequest(format!("partNumber {number}")))?;
                let etag = self.upload_part(&key, &upload_id, number, body)?;
                Ok(reply(http::StatusCode::OK, Some(etag), None, Bytes::new()))
            }
            (None, None) if method == http::Method::PUT => {
                let content_type = parts
                    .headers
                    .get(http::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string(), ToOwned::to_owned);
                let etag = self.store_object(&key, body, content_type);
                Ok(reply(http::StatusCode::OK, Some(etag), None, Bytes::new()))
            }
            (None, None) if method == http::Method::GET || method == http::Method::HEAD => {
                let object = self
                    .objects
                    .get(&key)
                    .map(|o| o.value().clone())
                    .ok_or_else(|| MemoryStoreError::NoSuchKey(key.clone()))?;
                let body = if method == http::Method::HEAD {
                    Bytes::new()
                } else {
                    object.data
                };
                Ok(reply(
                    http::StatusCode::OK,
                    Some(object.etag),
                    Some(object.content_type),
                    body,
                ))
            }
            _ => Err(MemoryStoreError::BadRequest(format!(
                "{method} is not a presigned store operation"
            ))),
        }
    }

    fn key_from_path(&self, path: &str) -> Result<String, MemoryStoreError> {
        let rest = path
            .strip_prefix(self.endpoint_path.as_str())
            .and_then(|p| p.strip_prefix('/'))
            .ok_or_else(|| MemoryStoreError::BadRequest(format!("path {path}")))?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| MemoryStoreError::BadRequest(format!("path {path}")))?;
        if bucket != self.bucket {
            return Err(MemoryStoreError::BadRequest(format!("unknown bucket {bucket}")));
        }
        let key = percent_encoding::percent_decode_str(key)
            .decode_utf8()
            .map_err(|_| MemoryStoreError::BadRequest("key is not UTF-8".to_owned()))?;
        if key.is_empty() {
            return Err(MemoryStoreError::BadRequest("empty key".to_owned()));
        }
        Ok(key.into_owned())
    }

    fn store_object(&self, key: &str, data: Bytes, content_type: String) -> String {
        let etag = format!("\"{}\"", hex::encode(Md5::digest(&data)));
        self.objects.insert(
            key.to_owned(),
            StoredObject {
                etag: etag.clone(),
                content_type,
                last_modified: Utc::now(),
                data,
            },
        );
        etag
    }

    fn location(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, encode_key(key))
    }

    fn presign(
        &self,
        signer: &Presigner,
        method: http::Method,
        key: &str,
        query: Vec<(&str, String)>,
        ttl: Duration,
        operation: PresignOperation,
    ) -> Result<PresignedGrant, GatewayError> {
        let issued_at = Utc::now();
        let path = format!("{}/{key}", self.bucket);
        let url = signer
            .presign(&PresignRequest {
                method,
                path: &path,
                query,
                issued_at,
                expires_in: ttl,
            })
            .map_err(|e| GatewayError::InvalidArgument(e.to_string()))?;
        Ok(PresignedGrant::new(url, operation, issued_at, ttl))
    }

    /// Validate the requested parts and concatenate their data.
    fn assemble(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<(Bytes, String, String), MemoryStoreError> {
        let upload = self
            .uploads
            .get(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| MemoryStoreError::NoSuchUpload(upload_id.to_owned()))?;

        let mut combined = BytesMut::new();
        let mut digests = Vec::with_capacity(parts.len() * 16);
        let mut previous = 0;
        for (index, requested) in parts.iter().enumerate() {
            if requested.part_number <= previous {
                return Err(MemoryStoreError::InvalidPartOrder);
            }
            previous = requested.part_number;

            let stored = upload
                .parts
                .get(&requested.part_number)
                .filter(|p| p.etag.trim_matches('"') == requested.e_tag.trim_matches('"'))
                .ok_or(MemoryStoreError::InvalidPart(requested.part_number))?;

            let size = stored.data.len() as u64;
            if index + 1 < parts.len() && size < self.min_part_size {
                return Err(MemoryStoreError::EntityTooSmall {
                    part_number: requested.part_number,
                    size,
                    minimum: self.min_part_size,
                });
            }

            if let Ok(bytes) = hex::decode(&stored.md5_hex) {
                digests.extend_from_slice(&bytes);
            }
            combined.extend_from_slice(&stored.data);
        }

        let etag = format!("\"{}-{}\"", hex::encode(Md5::digest(&digests)), parts.len());
        Ok((combined.freeze(), etag, upload.content_type.clone()))
    }
}

fn reply(
    status: http::StatusCode,
    e_tag: Option<String>,
    content_type: Option<String>,
    body: Bytes,
) -> StoreReply {
    StoreReply {
        status,
        e_tag,
        content_type,
        body,
    }
}

fn generate_upload_id() -> String {
    let mut rng = rand::rng();
    let mut buf = [0u8; 32];
    rng.fill(&mut buf);
    hex::encode(buf)
}

#[async_trait]
impl ObjectStoreGateway for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartHandle, GatewayError> {
        let upload_id = generate_upload_id();
        self.uploads.insert(
            upload_id.clone(),
            MultipartUpload {
                key: key.to_owned(),
                content_type: content_type.to_owned(),
                parts: BTreeMap::new(),
            },
        );
        debug!(upload_id = %upload_id, key, "Created in-memory multipart upload");
        Ok(MultipartHandle {
            upload_id,
            key: key.to_owned(),
        })
    }

    async fn presign_part_upload(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError> {
        check_part_number(part_number)?;
        self.presign(
            &self.signer,
            http::Method::PUT,
            key,
            vec![
                ("partNumber", part_number.to_string()),
                ("uploadId", upload_id.to_owned()),
            ],
            ttl,
            PresignOperation::PutPart { part_number },
        )
    }

    async fn list_parts(
        &self,
        key: &str,
        upload_id: &str,
        max_parts: u32,
    ) -> Result<Vec<PartDescriptor>, GatewayError> {
        let upload = self
            .uploads
            .get(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| {
                MemoryStoreError::NoSuchUpload(upload_id.to_owned()).into_gateway("list_parts")
            })?;
        let limit = usize::try_from(max_parts).unwrap_or(usize::MAX);
        Ok(upload
            .parts
            .iter()
            .take(limit)
            .map(|(number, part)| part.descriptor(*number))
            .collect())
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<CompletedObject, GatewayError> {
        check_completion_parts(parts)?;

        let (data, etag, content_type) = self
            .assemble(key, upload_id, parts)
            .map_err(|e| e.into_gateway("complete_multipart_upload"))?;

        // A concurrent abort wins if it removed the upload first.
        if self.uploads.remove(upload_id).is_none() {
            return Err(MemoryStoreError::NoSuchUpload(upload_id.to_owned())
                .into_gateway("complete_multipart_upload"));
        }

        let size = data.len();
        self.objects.insert(
            key.to_owned(),
            StoredObject {
                etag: etag.clone(),
                content_type,
                last_modified: Utc::now(),
                data,
            },
        );

        info!(upload_id, key, size, parts = parts.len(), "Assembled in-memory object");
        Ok(CompletedObject {
            location: self.location(key),
            e_tag: etag,
        })
    }

    async fn abort_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
    ) -> Result<(), GatewayError> {
        self.uploads
            .remove_if(upload_id, |_, upload| upload.key == key)
            .map(|_| ())
            .ok_or_else(|| {
                MemoryStoreError::NoSuchUpload(upload_id.to_owned())
                    .into_gateway("abort_multipart_upload")
            })
    }

    async fn presign_object_get(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError> {
        self.presign(
            &self.read_signer,
            http::Method::GET,
            key,
            Vec::new(),
            ttl,
            PresignOperation::GetObject,
        )
    }

    async fn presign_object_put(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError> {
        self.presign(
            &self.signer,
            http::Method::PUT,
            key,
            Vec::new(),
            ttl,
            PresignOperation::PutObject,
        )
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        self.store_object(key, body, content_type.to_owned());
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, GatewayError> {
        self.objects
            .get(key)
            .map(|o| ObjectHead {
                size: o.data.len() as u64,
                e_tag: Some(o.etag.clone()),
                content_type: Some(o.content_type.clone()),
                last_modified: Some(o.last_modified),
            })
            .ok_or_else(|| MemoryStoreError::NoSuchKey(key.to_owned()).into_gateway("head_object"))
    }

    async fn delete_object(&self, key: &str) -> Result<(), GatewayError> {
        if self.objects.remove(key).is_none() {
            debug!(key, "Delete of missing object treated as success");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "resources/pkg-1/r-1/data.csv";

    fn store_with_min_part(min_part_size: u64) -> MemoryObjectStore {
        let config = UploadConfig::builder().min_part_size(min_part_size).build();
        MemoryObjectStore::from_config(&config).unwrap()
    }

    fn request(method: http::Method, url: &str) -> http::request::Parts {
        http::Request::builder()
            .method(method)
            .uri(url)
            .header("host", "localhost:5080")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_should_assemble_parts_with_composite_etag() {
        let store = store_with_min_part(0);
        let handle = store.create_multipart_upload(KEY, "text/csv").await.unwrap();
        let e1 = store
            .upload_part(KEY, &handle.upload_id, 1, Bytes::from_static(b"hello "))
            .unwrap();
        let e2 = store
            .upload_part(KEY, &handle.upload_id, 2, Bytes::from_static(b"world"))
            .unwrap();

        let done = store
            .complete_multipart_upload(
                KEY,
                &handle.upload_id,
                &[PartDescriptor::new(1, e1), PartDescriptor::new(2, e2)],
            )
            .await
            .unwrap();

        assert!(done.e_tag.ends_with("-2\""));
        assert_eq!(
            done.location,
            "http://localhost:5080/_store/parcel-uploads/resources/pkg-1/r-1/data.csv"
        );
        assert_eq!(store.object_bytes(KEY).unwrap(), Bytes::from_static(b"hello world"));
        assert_eq!(store.open_uploads(), 0);
    }

    #[tokio::test]
    async fn test_should_reject_small_non_final_part() {
        let store = store_with_min_part(10);
        let handle = store.create_multipart_upload(KEY, "text/csv").await.unwrap();
        let e1 = store
            .upload_part(KEY, &handle.upload_id, 1, Bytes::from_static(b"tiny"))
            .unwrap();
        let e2 = store
            .upload_part(KEY, &handle.upload_id, 2, Bytes::from_static(b"last"))
            .unwrap();

        let err = store
            .complete_multipart_upload(
                KEY,
                &handle.upload_id,
                &[PartDescriptor::new(1, e1), PartDescriptor::new(2, e2)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.backend_code(), Some("EntityTooSmall"));
    }

    #[tokio::test]
    async fn test_should_reject_mismatched_etag_as_invalid_part() {
        let store = store_with_min_part(0);
        let handle = store.create_multipart_upload(KEY, "text/csv").await.unwrap();
        store
            .upload_part(KEY, &handle.upload_id, 1, Bytes::from_static(b"data"))
            .unwrap();

        let err = store
            .complete_multipart_upload(KEY, &handle.upload_id, &[PartDescriptor::new(1, "\"nope\"")])
            .await
            .unwrap_err();
        assert_eq!(err.backend_code(), Some("InvalidPart"));
    }

    #[tokio::test]
    async fn test_should_report_unknown_upload_as_not_found() {
        let store = store_with_min_part(0);
        let err = store.abort_multipart_upload(KEY, "missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));

        let err = store.list_parts(KEY, "missing", 1000).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_should_list_no_parts_before_upload() {
        let store = store_with_min_part(0);
        let handle = store.create_multipart_upload(KEY, "text/csv").await.unwrap();
        let parts = store.list_parts(KEY, &handle.upload_id, 1000).await.unwrap();
        assert!(parts.is_empty());
    }

    #[tokio::test]
    async fn test_should_accept_presigned_part_upload() {
        let store = store_with_min_part(0);
        let handle = store.create_multipart_upload(KEY, "text/csv").await.unwrap();
        let grant = store
            .presign_part_upload(KEY, &handle.upload_id, 3, Duration::from_secs(3600))
            .await
            .unwrap();

        let reply = store
            .accept_presigned(
                &request(http::Method::PUT, &grant.url),
                Bytes::from_static(b"part three"),
            )
            .unwrap();
        assert_eq!(reply.status, http::StatusCode::OK);

        let parts = store.list_parts(KEY, &handle.upload_id, 1000).await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].part_number, 3);
        assert_eq!(Some(parts[0].e_tag.clone()), reply.e_tag);
    }

    #[tokio::test]
    async fn test_should_refuse_tampered_presigned_url() {
        let store = store_with_min_part(0);
        let grant = store
            .presign_object_put(KEY, Duration::from_secs(60))
            .await
            .unwrap();
        let tampered = grant.url.replace("data.csv", "other.csv");

        let err = store
            .accept_presigned(&request(http::Method::PUT, &tampered), Bytes::new())
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
        assert!(store.object_bytes("resources/pkg-1/r-1/other.csv").is_none());
    }

    #[tokio::test]
    async fn test_should_round_trip_object_through_presigned_urls() {
        let store = store_with_min_part(0);
        let put = store
            .presign_object_put(KEY, Duration::from_secs(60))
            .await
            .unwrap();
        store
            .accept_presigned(&request(http::Method::PUT, &put.url), Bytes::from_static(b"a,b\n"))
            .unwrap();

        let head = store.head_object(KEY).await.unwrap();
        assert_eq!(head.size, 4);

        let get = store
            .presign_object_get(KEY, Duration::from_secs(60))
            .await
            .unwrap();
        let reply = store
            .accept_presigned(&request(http::Method::GET, &get.url), Bytes::new())
            .unwrap();
        assert_eq!(reply.body, Bytes::from_static(b"a,b\n"));
    }

    #[tokio::test]
    async fn test_should_treat_missing_object_delete_as_success() {
        let store = store_with_min_part(0);
        assert!(store.delete_object("resources/none/x.txt").await.is_ok());
        assert!(matches!(
            store.head_object("resources/none/x.txt").await,
            Err(GatewayError::NotFound(_))
        ));
    }
}
