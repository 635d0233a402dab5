//! Wire error type.
//!
//! Errors are rendered inside the action envelope as
//! `{"success": false, "error": {"__type": <code>, "message": ...}}`.

use std::fmt;

/// Error codes visible to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ActionErrorCode {
    /// Missing principal or insufficient rights.
    Unauthorized,
    /// Malformed or unsafe input.
    #[default]
    ValidationError,
    /// Owner, record, upload or object does not exist.
    NotFound,
    /// The session is in a state that forbids the request.
    InvalidState,
    /// The object store rejected or failed the call.
    BackendError,
    /// No action with that name.
    UnknownAction,
    /// Actions are POST only.
    MethodNotAllowed,
    /// The request body exceeds the configured limit.
    PayloadTooLarge,
    /// Unexpected server-side failure.
    InternalError,
}

impl ActionErrorCode {
    /// Short code string used for `__type`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::ValidationError => "ValidationError",
            Self::NotFound => "NotFound",
            Self::InvalidState => "InvalidState",
            Self::BackendError => "BackendError",
            Self::UnknownAction => "UnknownAction",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::InternalError => "InternalError",
        }
    }

    /// Default HTTP status for this code.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::Unauthorized => http::StatusCode::FORBIDDEN,
            Self::ValidationError | Self::UnknownAction => http::StatusCode::BAD_REQUEST,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::InvalidState => http::StatusCode::CONFLICT,
            Self::BackendError => http::StatusCode::BAD_GATEWAY,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ActionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned from an action.
#[derive(Debug)]
pub struct ActionError {
    /// The error code.
    pub code: ActionErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Offending input field, for validation errors.
    pub field: Option<String>,
    /// HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl ActionError {
    /// Create an error with the default message for `code`.
    #[must_use]
    pub fn new(code: ActionErrorCode) -> Self {
        Self::with_message(code, code.as_str())
    }

    /// Create an error with a custom message.
    #[must_use]
    pub fn with_message(code: ActionErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            field: None,
            code,
            source: None,
        }
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach an already boxed underlying error.
    #[must_use]
    pub fn with_boxed_source(mut self, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }

    // -- Convenience constructors --

    /// Missing or insufficient principal.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_message(ActionErrorCode::Unauthorized, message)
    }

    /// Invalid input for `field`.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::with_message(ActionErrorCode::ValidationError, message);
        err.field = Some(field.into());
        err
    }

    /// Unparseable request body.
    #[must_use]
    pub fn malformed_body(detail: impl fmt::Display) -> Self {
        Self::with_message(
            ActionErrorCode::ValidationError,
            format!("Malformed request body: {detail}"),
        )
    }

    /// Resource not found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ActionErrorCode::NotFound, message)
    }

    /// Unknown action name.
    #[must_use]
    pub fn unknown_action(name: &str) -> Self {
        Self::with_message(
            ActionErrorCode::UnknownAction,
            format!("Unknown action: {name}"),
        )
    }

    /// Non-POST request to an action.
    #[must_use]
    pub fn method_not_allowed(method: &http::Method) -> Self {
        Self::with_message(
            ActionErrorCode::MethodNotAllowed,
            format!("Actions require POST, got {method}"),
        )
    }

    /// Request body over `limit` bytes.
    #[must_use]
    pub fn payload_too_large(limit: usize) -> Self {
        Self::with_message(
            ActionErrorCode::PayloadTooLarge,
            format!("Request body exceeds {limit} bytes"),
        )
    }

    /// Internal failure.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ActionErrorCode::InternalError, message)
    }
}
