//! Error types for presigning and presigned URL verification.

/// Errors raised while issuing or checking a presigned URL.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The signing algorithm is not supported (only AWS4-HMAC-SHA256 is).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A header named in `X-Amz-SignedHeaders` is missing from the request.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The `X-Amz-Credential` value is not `AKID/date/region/service/aws4_request`.
    #[error("Invalid credential format")]
    InvalidCredential,

    /// The access key ID was not found in the credential store.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The current time is past `X-Amz-Date` + `X-Amz-Expires`.
    #[error("Request has expired")]
    RequestExpired,

    /// A required presigning query parameter is missing or malformed.
    #[error("Missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// The requested lifetime is zero or longer than seven days.
    #[error("Invalid presign expiry: {0} seconds")]
    InvalidExpiry(u64),

    /// The endpoint the URL should point at cannot be used.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
