//! Response envelopes.

use parcel_model::ActionError;

use crate::body::ActionResponseBody;

/// Content type of every action response.
pub const CONTENT_TYPE: &str = "application/json";

/// Request id header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Serialize an error envelope.
///
/// ```json
/// {
///   "success": false,
///   "error": {"__type": "ValidationError", "message": "...", "field": "filename"}
/// }
/// ```
#[must_use]
pub fn error_to_json(error: &ActionError) -> Vec<u8> {
    let mut detail = serde_json::json!({
        "__type": error.code.as_str(),
        "message": error.message,
    });
    if let Some(field) = &error.field {
        detail["field"] = serde_json::Value::String(field.clone());
    }
    serde_json::to_vec(&serde_json::json!({
        "success": false,
        "error": detail,
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Turn an [`ActionError`] into a complete HTTP response.
#[must_use]
pub fn error_to_response(error: &ActionError, request_id: &str) -> http::Response<ActionResponseBody> {
    json_with_status(error.status_code, error_to_json(error), request_id)
}

/// Serialize a success envelope around `result`.
#[must_use]
pub fn success_to_json(result: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "success": true,
        "result": result,
    }))
    .expect("JSON serialization of result cannot fail")
}

/// Build a `200 OK` JSON response.
#[must_use]
pub fn json_response(json: Vec<u8>, request_id: &str) -> http::Response<ActionResponseBody> {
    json_with_status(http::StatusCode::OK, json, request_id)
}

/// Health check body.
#[must_use]
pub fn health_response(version: &str, request_id: &str) -> http::Response<ActionResponseBody> {
    let json = serde_json::to_vec(&serde_json::json!({
        "status": "running",
        "version": version,
    }))
    .expect("JSON serialization of health cannot fail");
    json_response(json, request_id)
}

fn json_with_status(
    status: http::StatusCode,
    json: Vec<u8>,
    request_id: &str,
) -> http::Response<ActionResponseBody> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(ActionResponseBody::from_bytes(json))
        .expect("valid JSON response")
}
