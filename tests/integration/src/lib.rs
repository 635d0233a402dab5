//! Integration tests for the Parcel server.
//!
//! These tests require a running server with the in-memory backend and a
//! known API token:
//!
//! ```text
//! PARCEL_API_TOKENS=dev-token=alice PARCEL_DEV_CATALOG=true PARCEL_MIN_PART_SIZE=1 parcel-server
//! cargo test -p parcel-integration -- --ignored
//! ```
//!
//! `PARCEL_URL` and `PARCEL_TOKEN` override the defaults below.

use std::sync::Once;

use serde_json::Value;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Base URL of the server.
#[must_use]
pub fn base_url() -> String {
    std::env::var("PARCEL_URL").unwrap_or_else(|_| "http://localhost:5080".to_owned())
}

/// API token accepted by the server.
#[must_use]
pub fn token() -> String {
    std::env::var("PARCEL_TOKEN").unwrap_or_else(|_| "dev-token".to_owned())
}

/// Thin client for the action API.
#[derive(Debug, Clone)]
pub struct ParcelClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ParcelClient {
    /// Client authenticated with the configured token.
    #[must_use]
    pub fn new() -> Self {
        init_tracing();
        Self {
            http: reqwest::Client::new(),
            base: base_url(),
            token: Some(token()),
        }
    }

    /// Client sending no `Authorization` header.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            token: None,
            ..Self::new()
        }
    }

    /// Underlying HTTP client, for talking to presigned URLs.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Call an action and return the status with the decoded envelope.
    pub async fn call(&self, action: &str, body: Value) -> anyhow::Result<(u16, Value)> {
        let mut req = self
            .http
            .post(format!("{}/api/action/{action}", self.base))
            .json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let json = resp.json::<Value>().await?;
        tracing::debug!(action, status, %json, "action response");
        Ok((status, json))
    }

    /// Call an action that must succeed and return its `result`.
    pub async fn ok(&self, action: &str, body: Value) -> Value {
        let (status, json) = self
            .call(action, body)
            .await
            .unwrap_or_else(|e| panic!("{action} request failed: {e}"));
        assert_eq!(status, 200, "{action} failed: {json}");
        assert_eq!(json["success"], true, "{action} envelope: {json}");
        json["result"].clone()
    }
}

impl Default for ParcelClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a unique owner id for a test.
#[must_use]
pub fn test_owner_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("{prefix}-{id}")
}

mod test_errors;
mod test_multipart;
mod test_records;
