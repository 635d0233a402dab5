//! HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;

use parcel_model::ActionError;

use crate::body::ActionResponseBody;
use crate::dispatch::{ActionHandler, dispatch_action};
use crate::principal::{PrincipalResolver, StaticTokenResolver};
use crate::response::{
    CONTENT_TYPE, REQUEST_ID_HEADER, error_to_response, health_response, json_response,
    success_to_json,
};
use crate::router::{Route, resolve_route};

/// Configuration for the action service.
#[derive(Clone)]
pub struct ActionHttpConfig {
    /// Resolves the caller from request headers.
    pub principal_resolver: Arc<dyn PrincipalResolver>,
    /// Mount point of the object data plane, if served.
    pub store_prefix: Option<String>,
    /// Version reported by the health check.
    pub version: String,
    /// Largest request body buffered before dispatch, in bytes.
    pub max_body_size: usize,
}

/// Default for [`ActionHttpConfig::max_body_size`].
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

impl fmt::Debug for ActionHttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHttpConfig")
            .field("principal_resolver", &"...")
            .field("store_prefix", &self.store_prefix)
            .field("version", &self.version)
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}

impl Default for ActionHttpConfig {
    fn default() -> Self {
        Self {
            principal_resolver: Arc::new(StaticTokenResolver::default()),
            store_prefix: None,
            version: env!("CARGO_PKG_VERSION").to_owned(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Hyper `Service` routing requests to an [`ActionHandler`].
#[derive(Debug)]
pub struct ActionHttpService<H: ActionHandler> {
    handler: Arc<H>,
    config: Arc<ActionHttpConfig>,
}

impl<H: ActionHandler> ActionHttpService<H> {
    /// Create a new service.
    pub fn new(handler: Arc<H>, config: ActionHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }
}

impl<H: ActionHandler> Clone for ActionHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: ActionHandler> hyper::service::Service<http::Request<Incoming>> for ActionHttpService<H> {
    type Response = http::Response<ActionResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.config);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), &config, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Run one request through the pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    config: &ActionHttpConfig,
    request_id: &str,
) -> http::Response<ActionResponseBody>
where
    H: ActionHandler,
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, incoming) = req.into_parts();

    // 1. Route.
    let route = match resolve_route(parts.uri.path(), config.store_prefix.as_deref()) {
        Ok(route) => route,
        Err(err) => return error_to_response(&err, request_id),
    };

    let action = match route {
        Route::Health => return health_response(&config.version, request_id),
        Route::Store => {
            let body = match collect_body(incoming, config.max_body_size).await {
                Ok(body) => body,
                Err(err) => return error_to_response(&err, request_id),
            };
            return handler.handle_object_request(parts, body).await;
        }
        Route::Action(action) => action,
    };

    // 2. Actions only accept POST.
    if parts.method != http::Method::POST {
        return error_to_response(&ActionError::method_not_allowed(&parts.method), request_id);
    }

    // 3. Resolve the principal before looking at the body.
    let Some(principal) = config.principal_resolver.resolve(&parts.headers) else {
        tracing::debug!(action = %action, "rejecting unauthenticated request");
        return error_to_response(
            &ActionError::unauthorized("Authentication required"),
            request_id,
        );
    };

    // 4. Collect body.
    let body = match collect_body(incoming, config.max_body_size).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 5. Dispatch.
    match dispatch_action(handler, action, Some(principal), body).await {
        Ok(result) => json_response(success_to_json(&result), request_id),
        Err(err) => {
            if err.status_code.is_server_error() {
                tracing::warn!(action = %action, error = %err, "action failed");
            }
            error_to_response(&err, request_id)
        }
    }
}

/// Collect the request body into one buffer of at most `limit` bytes.
async fn collect_body<B>(incoming: B, limit: usize) -> Result<Bytes, ActionError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(incoming, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ActionError::payload_too_large(limit)),
        Err(e) => Err(ActionError::internal_error(format!("Failed to read request body: {e}"))),
    }
}

/// Headers every response carries.
fn add_common_headers(
    mut response: http::Response<ActionResponseBody>,
    request_id: &str,
) -> http::Response<ActionResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    headers
        .entry(http::header::CONTENT_TYPE)
        .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));

    headers.insert("server", http::HeaderValue::from_static("Parcel"));

    headers.insert(
        "access-control-allow-origin",
        http::HeaderValue::from_static("*"),
    );

    response
}
