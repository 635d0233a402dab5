//! Query-string SigV4 presigning.
//!
//! The signer always signs the `host` header only and uses
//! `UNSIGNED-PAYLOAD`, which is what S3 and [`crate::presigned`] expect from
//! browser uploads that cannot compute a body hash up front.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::canonical::{
    build_canonical_headers, build_canonical_query_string, build_canonical_uri,
    build_presigned_canonical_request, encode_component,
};
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::sigv4::{
    ALGORITHM, DATE_FORMAT, TIMESTAMP_FORMAT, build_string_to_sign, compute_signature,
    credential_scope, derive_signing_key,
};

/// Longest lifetime a SigV4 presigned URL may carry (seven days).
pub const MAX_EXPIRY_SECS: u64 = 604_800;

/// One URL to presign.
#[derive(Debug, Clone)]
pub struct PresignRequest<'a> {
    /// HTTP method the URL authorizes.
    pub method: http::Method,
    /// Path below the endpoint, e.g. `bucket/key`. Not yet encoded.
    pub path: &'a str,
    /// Extra query parameters that become part of the signature.
    pub query: Vec<(&'a str, String)>,
    /// Signing time.
    pub issued_at: DateTime<Utc>,
    /// Lifetime of the URL.
    pub expires_in: Duration,
}

/// Issues presigned URLs against one endpoint with one key pair.
#[derive(Debug, Clone)]
pub struct Presigner {
    scheme: String,
    host: String,
    base_path: String,
    region: String,
    service: String,
    credentials: Credentials,
}

impl Presigner {
    /// Create a presigner for `endpoint` (`scheme://host[:port][/base]`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEndpoint`] if the endpoint has no scheme or
    /// host.
    pub fn new(
        endpoint: &str,
        region: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, AuthError> {
        let uri: http::Uri = endpoint
            .parse()
            .map_err(|e| AuthError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| AuthError::InvalidEndpoint(format!("{endpoint}: missing scheme")))?;
        let host = uri
            .authority()
            .ok_or_else(|| AuthError::InvalidEndpoint(format!("{endpoint}: missing host")))?;

        Ok(Self {
            scheme: scheme.to_owned(),
            host: host.as_str().to_owned(),
            base_path: uri.path().trim_end_matches('/').to_owned(),
            region: region.into(),
            service: "s3".to_owned(),
            credentials,
        })
    }

    /// The access key this presigner signs with.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.credentials.access_key_id
    }

    /// Produce the presigned URL for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidExpiry`] for a zero lifetime or one longer
    /// than [`MAX_EXPIRY_SECS`].
    pub fn presign(&self, request: &PresignRequest<'_>) -> Result<String, AuthError> {
        let expires = request.expires_in.as_secs();
        if expires == 0 || expires > MAX_EXPIRY_SECS {
            return Err(AuthError::InvalidExpiry(expires));
        }

        let timestamp = request.issued_at.format(TIMESTAMP_FORMAT).to_string();
        let date = request.issued_at.format(DATE_FORMAT).to_string();
        let scope = credential_scope(&date, &self.region, &self.service);

        let path = format!("{}/{}", self.base_path, request.path.trim_start_matches('/'));
        let canonical_uri = build_canonical_uri(&path);

        let credential = format!("{}/{scope}", self.credentials.access_key_id);
        let mut pairs: Vec<(String, String)> = request
            .query
            .iter()
            .map(|(k, v)| (encode_component(k), encode_component(v)))
            .collect();
        pairs.extend([
            ("X-Amz-Algorithm".to_owned(), ALGORITHM.to_owned()),
            ("X-Amz-Credential".to_owned(), encode_component(&credential)),
            ("X-Amz-Date".to_owned(), timestamp.clone()),
            ("X-Amz-Expires".to_owned(), expires.to_string()),
            ("X-Amz-SignedHeaders".to_owned(), "host".to_owned()),
        ]);
        let raw_query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let canonical_query = build_canonical_query_string(&raw_query);

        let canonical_headers = build_canonical_headers(&[("host", self.host.as_str())], &["host"]);
        let canonical_request = build_presigned_canonical_request(
            request.method.as_str(),
            &canonical_uri,
            &canonical_query,
            &canonical_headers,
            "host",
        );
        let string_to_sign = build_string_to_sign(&timestamp, &scope, &canonical_request);
        let signing_key = derive_signing_key(
            &self.credentials.secret_access_key,
            &date,
            &self.region,
            &self.service,
        );
        let signature = compute_signature(&signing_key, &string_to_sign);

        debug!(
            method = %request.method,
            path = %canonical_uri,
            expires,
            "Issued presigned URL"
        );

        Ok(format!(
            "{}://{}{canonical_uri}?{canonical_query}&X-Amz-Signature={signature}",
            self.scheme, self.host
        ))
    }
}
