//! Gateway over a real S3-compatible bucket.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use parcel_model::{PartDescriptor, PresignOperation, PresignedGrant};

use super::{
    CompletedObject, GatewayError, MultipartHandle, ObjectHead, ObjectStoreGateway,
    check_completion_parts, check_part_number, encode_key,
};
use crate::config::{MAX_LIST_PARTS_PAGE, UploadConfig};

/// A response field S3 always sends was absent.
#[derive(Debug, thiserror::Error)]
#[error("S3 response is missing {0}")]
struct IncompleteResponse(&'static str);

/// [`ObjectStoreGateway`] backed by `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    read_client: Client,
    bucket: String,
    acl: ObjectCannedAcl,
    location_base: String,
    download_proxy: Option<String>,
}

impl S3ObjectStore {
    /// Build clients from configuration.
    ///
    /// Without a configured key pair the SDK default credential chain is
    /// used. A read-only pair gets its own client for download URLs.
    pub async fn from_config(config: &UploadConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(creds) = config.write_credentials() {
            loader = loader.credentials_provider(sdk_credentials(creds));
        }
        let shared = loader.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(config.force_path_style)
                .build(),
        );
        let read_client = config.readonly_credentials().map_or_else(
            || client.clone(),
            |creds| {
                Client::from_conf(
                    aws_sdk_s3::config::Builder::from(&shared)
                        .credentials_provider(sdk_credentials(creds))
                        .force_path_style(config.force_path_style)
                        .build(),
                )
            },
        );

        let location_base = match &config.endpoint_url {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket_name),
            None => format!(
                "https://{}.s3.{}.amazonaws.com",
                config.bucket_name, config.region
            ),
        };

        Self {
            client,
            read_client,
            bucket: config.bucket_name.clone(),
            acl: ObjectCannedAcl::from(config.acl.as_str()),
            location_base,
            download_proxy: config
                .download_proxy
                .as_ref()
                .map(|p| p.trim_end_matches('/').to_owned()),
        }
    }

    fn presigning(ttl: Duration) -> Result<PresigningConfig, GatewayError> {
        PresigningConfig::expires_in(ttl).map_err(|e| GatewayError::InvalidArgument(e.to_string()))
    }
}

fn sdk_credentials(creds: parcel_auth::Credentials) -> aws_sdk_s3::config::Credentials {
    aws_sdk_s3::config::Credentials::new(
        creds.access_key_id,
        creds.secret_access_key,
        None,
        None,
        "parcel-config",
    )
}

/// Map an SDK failure onto the gateway taxonomy, keeping the original error.
fn backend_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(ToOwned::to_owned);
    let message = err
        .as_service_error()
        .and_then(|e| e.message())
        .map_or_else(|| DisplayErrorContext(&err).to_string(), ToOwned::to_owned);

    match code.as_deref() {
        Some("NoSuchUpload" | "NoSuchKey" | "NotFound") => GatewayError::NotFound(message),
        _ => GatewayError::Backend {
            operation,
            code: code.unwrap_or_else(|| "Unknown".to_owned()),
            message,
            source: Box::new(err),
        },
    }
}

fn incomplete(operation: &'static str, field: &'static str) -> GatewayError {
    GatewayError::Backend {
        operation,
        code: "IncompleteResponse".to_owned(),
        message: format!("response is missing {field}"),
        source: Box::new(IncompleteResponse(field)),
    }
}

fn to_i32(operation: &'static str, part_number: u32) -> Result<i32, GatewayError> {
    i32::try_from(part_number)
        .map_err(|_| GatewayError::InvalidArgument(format!("{operation}: part {part_number}")))
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

/// Replace the scheme and host of `url` with `proxy`.
fn apply_download_proxy(url: &str, proxy: &str) -> String {
    let Some((_, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    match rest.split_once('/') {
        Some((_, path)) => format!("{proxy}/{path}"),
        None => format!("{proxy}/"),
    }
}

#[async_trait]
impl ObjectStoreGateway for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartHandle, GatewayError> {
        let out = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .acl(self.acl.clone())
            .send()
            .await
            .map_err(|e| backend_error("create_multipart_upload", e))?;

        let upload_id = out
            .upload_id()
            .ok_or_else(|| incomplete("create_multipart_upload", "UploadId"))?
            .to_owned();
        info!(upload_id = %upload_id, key, "Created S3 multipart upload");

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
        let issued_at = Utc::now();
        let request = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(to_i32("presign_part_upload", part_number)?)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| backend_error("presign_part_upload", e))?;

        Ok(PresignedGrant::new(
            request.uri(),
            PresignOperation::PutPart { part_number },
            issued_at,
            ttl,
        ))
    }

    async fn list_parts(
        &self,
        key: &str,
        upload_id: &str,
        max_parts: u32,
    ) -> Result<Vec<PartDescriptor>, GatewayError> {
        let limit = usize::try_from(max_parts).unwrap_or(usize::MAX);
        let page_size = i32::try_from(max_parts.min(MAX_LIST_PARTS_PAGE)).unwrap_or(1000);
        let mut parts = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let out = self
                .client
                .list_parts()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .max_parts(page_size)
                .set_part_number_marker(marker.take())
                .send()
                .await
                .map_err(|e| backend_error("list_parts", e))?;

            for part in out.parts() {
                let (Some(number), Some(e_tag)) = (part.part_number(), part.e_tag()) else {
                    continue;
                };
                let Ok(part_number) = u32::try_from(number) else {
                    continue;
                };
                parts.push(PartDescriptor {
                    part_number,
                    e_tag: e_tag.to_owned(),
                    size: part.size().and_then(|s| u64::try_from(s).ok()),
                    last_modified: part.last_modified().and_then(to_chrono),
                });
            }

            if parts.len() >= limit || out.is_truncated() != Some(true) {
                break;
            }
            marker = out.next_part_number_marker().map(ToOwned::to_owned);
            if marker.is_none() {
                break;
            }
        }

        parts.truncate(limit);
        debug!(upload_id, key, count = parts.len(), "Listed S3 parts");
        Ok(parts)
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartDescriptor],
    ) -> Result<CompletedObject, GatewayError> {
        check_completion_parts(parts)?;

        let completed = parts
            .iter()
            .map(|p| {
                Ok(CompletedPart::builder()
                    .part_number(to_i32("complete_multipart_upload", p.part_number)?)
                    .e_tag(&p.e_tag)
                    .build())
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        let out = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| backend_error("complete_multipart_upload", e))?;

        let location = out
            .location()
            .map_or_else(|| format!("{}/{}", self.location_base, encode_key(key)), ToOwned::to_owned);
        let e_tag = out
            .e_tag()
            .ok_or_else(|| incomplete("complete_multipart_upload", "ETag"))?
            .to_owned();

        info!(upload_id, key, parts = parts.len(), "Completed S3 multipart upload");
        Ok(CompletedObject { location, e_tag })
    }

    async fn abort_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
    ) -> Result<(), GatewayError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| backend_error("abort_multipart_upload", e))?;
        info!(upload_id, key, "Aborted S3 multipart upload");
        Ok(())
    }

    async fn presign_object_get(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError> {
        let issued_at = Utc::now();
        let request = self
            .read_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| backend_error("presign_object_get", e))?;

        let url = match &self.download_proxy {
            Some(proxy) => apply_download_proxy(request.uri(), proxy),
            None => request.uri().to_owned(),
        };
        Ok(PresignedGrant::new(
            url,
            PresignOperation::GetObject,
            issued_at,
            ttl,
        ))
    }

    async fn presign_object_put(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<PresignedGrant, GatewayError> {
        let issued_at = Utc::now();
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| backend_error("presign_object_put", e))?;

        Ok(PresignedGrant::new(
            request.uri(),
            PresignOperation::PutObject,
            issued_at,
            ttl,
        ))
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), GatewayError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .acl(self.acl.clone())
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| backend_error("put_object", e))?;
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, GatewayError> {
        let out = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => out,
            Err(err) if err.as_service_error().is_some_and(HeadObjectError::is_not_found) => {
                return Err(GatewayError::NotFound(format!("object {key}")));
            }
            Err(err) => return Err(backend_error("head_object", err)),
        };

        Ok(ObjectHead {
            size: out
                .content_length()
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or_default(),
            e_tag: out.e_tag().map(ToOwned::to_owned),
            content_type: out.content_type().map(ToOwned::to_owned),
            last_modified: out.last_modified().and_then(to_chrono),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), GatewayError> {
        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend_error("delete_object", e))
        {
            Ok(_) | Err(GatewayError::NotFound(_)) => {
                debug!(key, "Deleted S3 object");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_rewrite_download_url_host() {
        let url = "https://bucket.s3.us-east-1.amazonaws.com/resources/r1/a.csv?X-Amz-Signature=abc";
        assert_eq!(
            apply_download_proxy(url, "https://downloads.example.org"),
            "https://downloads.example.org/resources/r1/a.csv?X-Amz-Signature=abc"
        );
    }

    #[test]
    fn test_should_leave_url_without_scheme_untouched() {
        assert_eq!(apply_download_proxy("not-a-url", "https://p"), "not-a-url");
    }

    #[tokio::test]
    async fn test_should_derive_location_base_from_endpoint() {
        let config = UploadConfig::builder()
            .endpoint_url(Some("http://localhost:9000/".into()))
            .access_key_id(Some("minio".into()))
            .secret_access_key(Some("minio-secret".into()))
            .force_path_style(true)
            .build();
        let store = S3ObjectStore::from_config(&config).await;
        assert_eq!(store.location_base, "http://localhost:9000/parcel-uploads");
        assert_eq!(store.bucket(), "parcel-uploads");
    }

    #[tokio::test]
    async fn test_should_presign_part_url_with_upload_id() {
        let config = UploadConfig::builder()
            .endpoint_url(Some("http://localhost:9000".into()))
            .access_key_id(Some("minio".into()))
            .secret_access_key(Some("minio-secret".into()))
            .force_path_style(true)
            .build();
        let store = S3ObjectStore::from_config(&config).await;

        let grant = store
            .presign_part_upload("resources/p/r/a.csv", "up-1", 4, Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(grant.url.contains("uploadId=up-1"));
        assert!(grant.url.contains("partNumber=4"));

        let err = store
            .presign_part_upload("resources/p/r/a.csv", "up-1", 0, Duration::from_secs(3600))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }
}
