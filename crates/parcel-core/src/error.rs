//! Upload coordination errors.

use parcel_model::{ActionError, ActionErrorCode};

use crate::catalog::CatalogError;
use crate::gateway::GatewayError;

/// Errors returned by [`UploadCoordinator`](crate::coordinator::UploadCoordinator).
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// No principal, or the principal lacks the permission.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A caller-supplied value is missing or unsafe.
    #[error("Validation error on {field}: {message}")]
    Validation {
        /// Offending input field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The owner, record, upload or object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The session is terminal or was finished by someone else.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The object store failed the call.
    #[error("Backend error: {0}")]
    Backend(#[source] GatewayError),

    /// The catalog could not answer.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

/// Convenience alias.
pub type UploadResult<T> = Result<T, UploadError>;

impl UploadError {
    /// Build a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<GatewayError> for UploadError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidArgument(msg) => Self::validation("partNumber", msg),
            GatewayError::InvalidState(msg) => Self::InvalidState(msg),
            GatewayError::NotFound(msg) => Self::NotFound(msg),
            err @ GatewayError::Backend { .. } => Self::Backend(err),
        }
    }
}

impl From<CatalogError> for UploadError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(what) => Self::NotFound(what),
            CatalogError::NotAuthorized { principal, permission } => Self::Unauthorized(format!(
                "{principal} may not {permission} on this owner"
            )),
            CatalogError::Unavailable(reason) => Self::CatalogUnavailable(reason),
        }
    }
}

impl From<UploadError> for ActionError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Unauthorized(msg) => Self::unauthorized(msg),
            UploadError::Validation { field, message } => Self::validation(field, message),
            UploadError::NotFound(msg) => Self::not_found(msg),
            UploadError::InvalidState(msg) => {
                Self::with_message(ActionErrorCode::InvalidState, msg)
            }
            UploadError::Backend(source) => {
                Self::with_message(ActionErrorCode::BackendError, source.to_string())
                    .with_source(source)
            }
            UploadError::CatalogUnavailable(msg) => Self::internal_error(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_gateway_errors() {
        assert!(matches!(
            UploadError::from(GatewayError::InvalidState("x".into())),
            UploadError::InvalidState(_)
        ));
        assert!(matches!(
            UploadError::from(GatewayError::NotFound("x".into())),
            UploadError::NotFound(_)
        ));
        assert!(matches!(
            UploadError::from(GatewayError::InvalidArgument("x".into())),
            UploadError::Validation { .. }
        ));
    }

    #[test]
    fn test_should_keep_backend_error_as_source() {
        let gateway = GatewayError::Backend {
            operation: "complete_multipart_upload",
            code: "EntityTooSmall".into(),
            message: "part too small".into(),
            source: Box::new(std::io::Error::other("boom")),
        };
        let action: ActionError = UploadError::from(gateway).into();
        assert_eq!(action.code, ActionErrorCode::BackendError);
        assert_eq!(action.status_code, http::StatusCode::BAD_GATEWAY);
        assert!(std::error::Error::source(&action).is_some());
        assert!(action.message.contains("EntityTooSmall"));
    }

    #[test]
    fn test_should_map_validation_with_field() {
        let action: ActionError = UploadError::validation("filename", "bad").into();
        assert_eq!(action.code, ActionErrorCode::ValidationError);
        assert_eq!(action.field.as_deref(), Some("filename"));
    }
}
