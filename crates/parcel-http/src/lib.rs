//! HTTP transport for the Parcel upload broker.
//!
//! Actions are `POST /api/action/<name>` with a JSON body and answer with a
//! `{"success": ..., "result" | "error": ...}` envelope:
//!
//! - **Router**: maps the path to an action, the health check or the store
//! - **Handler trait**: the boundary between HTTP and upload logic
//! - **Principal**: resolves the caller from the `Authorization` header
//! - **Service**: hyper `Service` running the request pipeline
//! - **Response helpers**: envelope formatting

pub mod body;
pub mod dispatch;
pub mod principal;
pub mod response;
pub mod router;
pub mod service;

pub use body::ActionResponseBody;
pub use dispatch::{ActionHandler, NotImplementedHandler};
pub use principal::{PrincipalResolver, StaticTokenResolver};
pub use service::{ActionHttpConfig, ActionHttpService, DEFAULT_MAX_BODY_SIZE};
