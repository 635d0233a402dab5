//! Handler trait and action dispatch.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use parcel_model::{ActionError, Principal, UploadAction};

use crate::body::ActionResponseBody;

/// Future returned by [`ActionHandler::handle_action`].
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, ActionError>> + Send>>;

/// Future returned by [`ActionHandler::handle_object_request`].
pub type ObjectFuture = Pin<Box<dyn Future<Output = http::Response<ActionResponseBody>> + Send>>;

/// Boundary between the HTTP transport and the upload logic.
///
/// The handler gets the parsed action, the resolved principal (if any) and
/// the raw JSON body, and returns the `result` value of the envelope.
pub trait ActionHandler: Send + Sync + 'static {
    /// Handle one action.
    fn handle_action(
        &self,
        action: UploadAction,
        principal: Option<Principal>,
        body: Bytes,
    ) -> ActionFuture;

    /// Handle a request addressed to the object data plane.
    ///
    /// Only handlers backed by an in-process store serve one.
    fn handle_object_request(&self, parts: http::request::Parts, body: Bytes) -> ObjectFuture {
        let _ = body;
        Box::pin(async move {
            tracing::debug!(path = %parts.uri.path(), "no object data plane");
            http::Response::builder()
                .status(http::StatusCode::NOT_FOUND)
                .body(ActionResponseBody::empty())
                .expect("valid not-found response")
        })
    }
}

/// Dispatch an action to the handler.
pub async fn dispatch_action<H: ActionHandler>(
    handler: &H,
    action: UploadAction,
    principal: Option<Principal>,
    body: Bytes,
) -> Result<serde_json::Value, ActionError> {
    tracing::debug!(action = %action, "dispatching action");
    handler.handle_action(action, principal, body).await
}

/// Handler that refuses every action.
#[derive(Debug, Clone, Default)]
pub struct NotImplementedHandler;

impl ActionHandler for NotImplementedHandler {
    fn handle_action(
        &self,
        action: UploadAction,
        _principal: Option<Principal>,
        _body: Bytes,
    ) -> ActionFuture {
        Box::pin(async move { Err(ActionError::unknown_action(action.as_str())) })
    }
}
