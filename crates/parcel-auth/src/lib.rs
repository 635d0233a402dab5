//! SigV4 query-string presigning for Parcel.
//!
//! Two halves of the same protocol live here:
//!
//! - [`presign`] issues presigned URLs the way S3 does (host-only signed
//!   headers, `UNSIGNED-PAYLOAD`), used by the in-process object store.
//! - [`presigned`] verifies such URLs when a client comes back with them.
//!
//! # Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use parcel_auth::{Credentials, PresignRequest, Presigner};
//!
//! let signer = Presigner::new(
//!     "http://localhost:5080/_store",
//!     "us-east-1",
//!     Credentials::new("AKID", "secret"),
//! )
//! .unwrap();
//! let url = signer
//!     .presign(&PresignRequest {
//!         method: http::Method::PUT,
//!         path: "bucket/resources/r1/data.csv",
//!         query: vec![],
//!         issued_at: chrono::Utc::now(),
//!         expires_in: Duration::from_secs(60),
//!     })
//!     .unwrap();
//! assert!(url.contains("X-Amz-Signature="));
//! ```

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod presign;
pub mod presigned;
pub mod sigv4;

pub use credentials::{CredentialProvider, Credentials, StaticCredentialProvider};
pub use error::AuthError;
pub use presign::{MAX_EXPIRY_SECS, PresignRequest, Presigner};
pub use presigned::{AuthResult, verify_presigned};
