//! Request router.
//!
//! ```text
//! POST /api/action/<action-name>    JSON action
//! GET  /_health                     liveness
//! *    /_store/<bucket>/<key>       presigned data plane (memory store only)
//! ```

use parcel_model::{ActionError, UploadAction};

/// Path prefix of every action.
pub const ACTION_PREFIX: &str = "/api/action/";

/// Health check path.
pub const HEALTH_PATH: &str = "/_health";

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// A JSON action.
    Action(UploadAction),
    /// The health check.
    Health,
    /// The object data plane.
    Store,
}

/// Resolve the route for `path`.
///
/// `store_prefix` is the mount point of the data plane, when one is served.
pub fn resolve_route(path: &str, store_prefix: Option<&str>) -> Result<Route, ActionError> {
    if let Some(name) = path.strip_prefix(ACTION_PREFIX) {
        let name = name.trim_end_matches('/');
        return UploadAction::from_name(name)
            .map(Route::Action)
            .ok_or_else(|| ActionError::unknown_action(name));
    }

    if path == HEALTH_PATH || path == "/_health/" {
        return Ok(Route::Health);
    }

    if let Some(prefix) = store_prefix.filter(|p| !p.is_empty()) {
        if path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
        {
            return Ok(Route::Store);
        }
    }

    Err(ActionError::not_found(format!("No route for {path}")))
}

#[cfg(test)]
mod tests {
    use parcel_model::ActionErrorCode;

    use super::*;

    #[test]
    fn test_should_resolve_all_actions() {
        let cases = [
            (
                "/api/action/create_multipart_upload",
                UploadAction::CreateMultipartUpload,
            ),
            (
                "/api/action/prepare_upload_parts",
                UploadAction::PrepareUploadParts,
            ),
            ("/api/action/sign_part", UploadAction::SignPart),
            ("/api/action/list_parts/", UploadAction::ListParts),
            (
                "/api/action/complete_multipart_upload",
                UploadAction::CompleteMultipartUpload,
            ),
            (
                "/api/action/abort_multipart_upload",
                UploadAction::AbortMultipartUpload,
            ),
            ("/api/action/get_signed_url", UploadAction::GetSignedUrl),
            (
                "/api/action/resource_download_url",
                UploadAction::ResourceDownloadUrl,
            ),
            (
                "/api/action/resource_object_delete",
                UploadAction::ResourceObjectDelete,
            ),
        ];
        for (path, expected) in cases {
            assert_eq!(
                resolve_route(path, None).unwrap(),
                Route::Action(expected),
                "failed for path: {path}"
            );
        }
    }

    #[test]
    fn test_should_error_on_unknown_action() {
        let err = resolve_route("/api/action/package_create", None).unwrap_err();
        assert_eq!(err.code, ActionErrorCode::UnknownAction);
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_resolve_health_and_store() {
        assert_eq!(resolve_route("/_health", None).unwrap(), Route::Health);
        assert_eq!(
            resolve_route("/_store/bucket/a/b.csv", Some("/_store")).unwrap(),
            Route::Store
        );
        assert!(resolve_route("/_store/bucket/a", None).is_err());
        assert!(resolve_route("/_storex/bucket/a", Some("/_store")).is_err());
    }

    #[test]
    fn test_should_error_on_unknown_path() {
        let err = resolve_route("/", None).unwrap_err();
        assert_eq!(err.code, ActionErrorCode::NotFound);
    }
}
