//! Upload broker configuration.
//!
//! [`UploadConfig`] is built once at startup, validated, and handed to the
//! gateway and the coordinator. Nothing reads the environment after that.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use parcel_auth::{Credentials, MAX_EXPIRY_SECS};
use parcel_model::MAX_PART_NUMBER;

/// Smallest size S3 accepts for a part that is not the last one.
pub const DEFAULT_MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Hard cap S3 places on one `ListParts` page.
pub const MAX_LIST_PARTS_PAGE: u32 = 1000;

/// Default cap on a buffered request body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Errors found while validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required option is unset or empty.
    #[error("Missing required configuration option: {0}")]
    Missing(&'static str),

    /// An option is set to an unusable value.
    #[error("Invalid value for {option}: {reason}")]
    Invalid {
        /// The option name.
        option: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Which object store backs the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store serving its own presigned data plane.
    #[default]
    Memory,
    /// A real S3-compatible bucket.
    S3,
}

impl StoreBackend {
    /// Parse `memory` or `s3` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("memory") {
            Some(Self::Memory)
        } else if value.eq_ignore_ascii_case("s3") {
            Some(Self::S3)
        } else {
            None
        }
    }
}

/// Upload broker configuration.
///
/// # Examples
///
/// ```
/// use parcel_core::config::UploadConfig;
///
/// let config = UploadConfig::default();
/// assert_eq!(config.bucket_name, "parcel-uploads");
/// assert_eq!(config.part_url_expiry, 3600);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    /// Bind address for the HTTP server.
    #[builder(default = String::from("0.0.0.0:5080"))]
    pub gateway_listen: String,

    /// Object store backend.
    #[builder(default)]
    pub backend: StoreBackend,

    /// Bucket every key lives in.
    #[builder(default = String::from("parcel-uploads"))]
    pub bucket_name: String,

    /// Bucket region.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Custom S3 endpoint (MinIO, LocalStack, ...).
    #[builder(default)]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing.
    #[builder(default = false)]
    pub force_path_style: bool,

    /// Access key for writes. Unset means the SDK default chain.
    #[builder(default)]
    pub access_key_id: Option<String>,

    /// Secret paired with `access_key_id`.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,

    /// Access key used to sign download URLs.
    #[builder(default)]
    pub readonly_access_key_id: Option<String>,

    /// Secret paired with `readonly_access_key_id`.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub readonly_secret_access_key: Option<String>,

    /// Canned ACL applied to created objects.
    #[builder(default = String::from("public-read"))]
    pub acl: String,

    /// Key prefix under the bucket. Empty means none.
    #[builder(default)]
    pub storage_path: String,

    /// Entity type segment of every key.
    #[builder(default = String::from("resources"))]
    pub entity_type: String,

    /// Lifetime of single-object PUT and GET URLs, in seconds.
    #[builder(default = 60)]
    pub signed_url_expiry: u64,

    /// Lifetime of part upload URLs, in seconds.
    #[builder(default = 3600)]
    pub part_url_expiry: u64,

    /// Upper bound on parts returned by `list_parts`. Larger values are
    /// fetched in pages of [`MAX_LIST_PARTS_PAGE`].
    #[builder(default = MAX_PART_NUMBER)]
    pub max_list_parts: u32,

    /// Base URL replacing the scheme and host of download URLs.
    #[builder(default)]
    pub download_proxy: Option<String>,

    /// Write a probe object at startup and fail fast if that fails.
    #[builder(default = true)]
    pub check_access_on_startup: bool,

    /// Externally reachable base URL of the in-process store's data plane.
    #[builder(default = String::from("http://localhost:5080/_store"))]
    pub public_endpoint: String,

    /// Minimum size of non-final parts enforced by the in-process store.
    #[builder(default = DEFAULT_MIN_PART_SIZE)]
    pub min_part_size: u64,

    /// API tokens as `token=user` pairs separated by commas.
    #[builder(default)]
    #[serde(skip_serializing)]
    pub api_tokens: String,

    /// Catalog grants as `user@owner` pairs separated by commas. Each pair
    /// registers the owner and gives the user every permission on it.
    #[builder(default)]
    pub grants: String,

    /// Create owners on first sight and give every principal every
    /// permission. Local use only.
    #[builder(default)]
    pub dev_catalog: bool,

    /// Largest request body buffered by the HTTP layer, in bytes.
    #[builder(default = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: usize,

    /// Log level filter (e.g. `info`, `debug`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:5080"),
            backend: StoreBackend::Memory,
            bucket_name: String::from("parcel-uploads"),
            region: String::from("us-east-1"),
            endpoint_url: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            readonly_access_key_id: None,
            readonly_secret_access_key: None,
            acl: String::from("public-read"),
            storage_path: String::new(),
            entity_type: String::from("resources"),
            signed_url_expiry: 60,
            part_url_expiry: 3600,
            max_list_parts: MAX_PART_NUMBER,
            download_proxy: None,
            check_access_on_startup: true,
            public_endpoint: String::from("http://localhost:5080/_store"),
            min_part_size: DEFAULT_MIN_PART_SIZE,
            api_tokens: String::new(),
            grants: String::new(),
            dev_catalog: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_level: String::from("info"),
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:5080` |
    /// | `PARCEL_BACKEND` | `memory` |
    /// | `PARCEL_BUCKET_NAME` | `parcel-uploads` |
    /// | `PARCEL_REGION` | `us-east-1` |
    /// | `PARCEL_ENDPOINT_URL` | unset |
    /// | `PARCEL_FORCE_PATH_STYLE` | `false` |
    /// | `PARCEL_ACCESS_KEY_ID` | unset |
    /// | `PARCEL_SECRET_ACCESS_KEY` | unset |
    /// | `PARCEL_READONLY_ACCESS_KEY_ID` | unset |
    /// | `PARCEL_READONLY_SECRET_ACCESS_KEY` | unset |
    /// | `PARCEL_ACL` | `public-read` |
    /// | `PARCEL_STORAGE_PATH` | empty |
    /// | `PARCEL_ENTITY_TYPE` | `resources` |
    /// | `PARCEL_SIGNED_URL_EXPIRY` | `60` |
    /// | `PARCEL_PART_URL_EXPIRY` | `3600` |
    /// | `PARCEL_MAX_LIST_PARTS` | `10000` |
    /// | `PARCEL_DOWNLOAD_PROXY` | unset |
    /// | `PARCEL_CHECK_ACCESS_ON_STARTUP` | `true` |
    /// | `PARCEL_PUBLIC_ENDPOINT` | `http://localhost:5080/_store` |
    /// | `PARCEL_MIN_PART_SIZE` | `5242880` |
    /// | `PARCEL_API_TOKENS` | empty |
    /// | `PARCEL_GRANTS` | empty |
    /// | `PARCEL_DEV_CATALOG` | `false` |
    /// | `PARCEL_MAX_BODY_SIZE` | `67108864` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparseable numbers and backends keep their defaults;
    /// [`UploadConfig::validate`] catches the rest.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(backend) = std::env::var("PARCEL_BACKEND")
            .ok()
            .and_then(|v| StoreBackend::parse(&v))
        {
            config.backend = backend;
        }
        if let Ok(v) = std::env::var("PARCEL_BUCKET_NAME") {
            config.bucket_name = v;
        }
        if let Ok(v) = std::env::var("PARCEL_REGION") {
            config.region = v;
        }
        config.endpoint_url = non_empty_var("PARCEL_ENDPOINT_URL");
        if let Ok(v) = std::env::var("PARCEL_FORCE_PATH_STYLE") {
            config.force_path_style = parse_bool(&v);
        }
        config.access_key_id = non_empty_var("PARCEL_ACCESS_KEY_ID");
        config.secret_access_key = non_empty_var("PARCEL_SECRET_ACCESS_KEY");
        config.readonly_access_key_id = non_empty_var("PARCEL_READONLY_ACCESS_KEY_ID");
        config.readonly_secret_access_key = non_empty_var("PARCEL_READONLY_SECRET_ACCESS_KEY");
        if let Ok(v) = std::env::var("PARCEL_ACL") {
            config.acl = v;
        }
        if let Ok(v) = std::env::var("PARCEL_STORAGE_PATH") {
            config.storage_path = v;
        }
        if let Ok(v) = std::env::var("PARCEL_ENTITY_TYPE") {
            config.entity_type = v;
        }
        if let Some(n) = parsed_var("PARCEL_SIGNED_URL_EXPIRY") {
            config.signed_url_expiry = n;
        }
        if let Some(n) = parsed_var("PARCEL_PART_URL_EXPIRY") {
            config.part_url_expiry = n;
        }
        if let Some(n) = parsed_var("PARCEL_MAX_LIST_PARTS") {
            config.max_list_parts = n;
        }
        config.download_proxy = non_empty_var("PARCEL_DOWNLOAD_PROXY");
        if let Ok(v) = std::env::var("PARCEL_CHECK_ACCESS_ON_STARTUP") {
            config.check_access_on_startup = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("PARCEL_PUBLIC_ENDPOINT") {
            config.public_endpoint = v;
        }
        if let Some(n) = parsed_var("PARCEL_MIN_PART_SIZE") {
            config.min_part_size = n;
        }
        if let Ok(v) = std::env::var("PARCEL_API_TOKENS") {
            config.api_tokens = v;
        }
        if let Ok(v) = std::env::var("PARCEL_GRANTS") {
            config.grants = v;
        }
        if let Ok(v) = std::env::var("PARCEL_DEV_CATALOG") {
            config.dev_catalog = parse_bool(&v);
        }
        if let Some(n) = parsed_var("PARCEL_MAX_BODY_SIZE") {
            config.max_body_size = n;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an empty bucket, region or entity
    /// type and for half-configured key pairs, and [`ConfigError::Invalid`]
    /// for out-of-range expiries and list sizes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_name.trim().is_empty() {
            return Err(ConfigError::Missing("bucket_name"));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Missing("region"));
        }
        if self.entity_type.trim().is_empty() || self.entity_type.contains('/') {
            return Err(ConfigError::Missing("entity_type"));
        }

        check_pair(
            self.access_key_id.as_ref(),
            self.secret_access_key.as_ref(),
            ("access_key_id", "secret_access_key"),
        )?;
        check_pair(
            self.readonly_access_key_id.as_ref(),
            self.readonly_secret_access_key.as_ref(),
            ("readonly_access_key_id", "readonly_secret_access_key"),
        )?;

        check_expiry("signed_url_expiry", self.signed_url_expiry)?;
        check_expiry("part_url_expiry", self.part_url_expiry)?;

        if self.max_list_parts == 0 || self.max_list_parts > MAX_PART_NUMBER {
            return Err(ConfigError::Invalid {
                option: "max_list_parts",
                reason: format!("must be between 1 and {MAX_PART_NUMBER}"),
            });
        }

        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                option: "max_body_size",
                reason: "must be greater than zero".into(),
            });
        }

        if self.backend == StoreBackend::Memory && self.public_endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("public_endpoint"));
        }

        Ok(())
    }

    /// Lifetime of part upload URLs.
    #[must_use]
    pub fn part_url_ttl(&self) -> Duration {
        Duration::from_secs(self.part_url_expiry)
    }

    /// Lifetime of single-object URLs.
    #[must_use]
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_expiry)
    }

    /// The configured write key pair, if both halves are set.
    #[must_use]
    pub fn write_credentials(&self) -> Option<Credentials> {
        pair(self.access_key_id.as_ref(), self.secret_access_key.as_ref())
    }

    /// The configured read-only key pair, if both halves are set.
    #[must_use]
    pub fn readonly_credentials(&self) -> Option<Credentials> {
        pair(
            self.readonly_access_key_id.as_ref(),
            self.readonly_secret_access_key.as_ref(),
        )
    }

    /// Parse `api_tokens` into `(token, user)` pairs, skipping malformed entries.
    #[must_use]
    pub fn api_token_table(&self) -> Vec<(String, String)> {
        self.api_tokens
            .split(',')
            .filter_map(|entry| {
                let (token, user) = entry.trim().split_once('=')?;
                let (token, user) = (token.trim(), user.trim());
                (!token.is_empty() && !user.is_empty()).then(|| (token.to_owned(), user.to_owned()))
            })
            .collect()
    }

    /// Parse `grants` into `(user, owner)` pairs, skipping malformed entries.
    #[must_use]
    pub fn grant_table(&self) -> Vec<(String, String)> {
        self.grants
            .split(',')
            .filter_map(|entry| {
                let (user, owner) = entry.trim().split_once('@')?;
                let (user, owner) = (user.trim(), owner.trim());
                (!user.is_empty() && !owner.is_empty()).then(|| (user.to_owned(), owner.to_owned()))
            })
            .collect()
    }
}

fn pair(id: Option<&String>, secret: Option<&String>) -> Option<Credentials> {
    match (id, secret) {
        (Some(id), Some(secret)) => Some(Credentials::new(id.clone(), secret.clone())),
        _ => None,
    }
}

fn check_pair(
    id: Option<&String>,
    secret: Option<&String>,
    names: (&'static str, &'static str),
) -> Result<(), ConfigError> {
    match (id, secret) {
        (Some(_), None) => Err(ConfigError::Missing(names.1)),
        (None, Some(_)) => Err(ConfigError::Missing(names.0)),
        _ => Ok(()),
    }
}

fn check_expiry(option: &'static str, seconds: u64) -> Result<(), ConfigError> {
    if seconds == 0 || seconds > MAX_EXPIRY_SECS {
        return Err(ConfigError::Invalid {
            option,
            reason: format!("must be between 1 and {MAX_EXPIRY_SECS} seconds"),
        });
    }
    Ok(())
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
