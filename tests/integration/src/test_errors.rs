//! Error surface integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{ParcelClient, base_url, test_owner_id};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let resp = reqwest::get(format!("{}/_health", base_url()))
            .await
            .expect("health");
        assert_eq!(resp.status().as_u16(), 200);
        let json: serde_json::Value = resp.json().await.expect("json");
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_anonymous_caller() {
        let client = ParcelClient::anonymous();
        let (status, json) = client
            .call(
                "create_multipart_upload",
                json!({"ownerId": "o-1", "filename": "a.csv"}),
            )
            .await
            .expect("call");
        assert_eq!(status, 403);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["__type"], "Unauthorized");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_action() {
        let (status, json) = ParcelClient::new()
            .call("rename_object", json!({}))
            .await
            .expect("call");
        assert_eq!(status, 400);
        assert_eq!(json["error"]["__type"], "UnknownAction");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unsafe_filenames() {
        let client = ParcelClient::new();
        let owner = test_owner_id("bad");
        for filename in ["../etc/passwd", "a/b.csv", "", "CON"] {
            let (status, json) = client
                .call(
                    "create_multipart_upload",
                    json!({"ownerId": owner, "filename": filename}),
                )
                .await
                .expect("call");
            assert_eq!(status, 400, "{filename}: {json}");
            assert_eq!(json["error"]["field"], "filename", "{filename}");
        }
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_require_session_fields() {
        let client = ParcelClient::new();
        let owner = test_owner_id("fields");
        let (status, json) = client
            .call("list_parts", json!({"ownerId": owner, "key": "x"}))
            .await
            .expect("call");
        assert_eq!(status, 400);
        assert_eq!(json["error"]["__type"], "ValidationError");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_refuse_key_of_another_owner() {
        let client = ParcelClient::new();
        let owner = test_owner_id("mine");
        let other = test_owner_id("theirs");

        let created = client
            .ok(
                "create_multipart_upload",
                json!({"ownerId": other, "filename": "secret.bin"}),
            )
            .await;
        let (status, json) = client
            .call(
                "list_parts",
                json!({"uploadId": created["uploadId"], "key": created["key"], "ownerId": owner}),
            )
            .await
            .expect("call");
        assert_eq!(status, 403, "{json}");
    }
}
