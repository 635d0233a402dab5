//! Record-backed object integration tests: download and purge.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{ParcelClient, test_owner_id};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_download_and_purge_completed_record() {
        let client = ParcelClient::new();
        let owner = test_owner_id("rec");
        let record = uuid::Uuid::new_v4().to_string();

        let created = client
            .ok(
                "create_multipart_upload",
                json!({"ownerId": owner, "filename": "notes.txt", "recordId": record}),
            )
            .await;
        assert_eq!(created["recordId"], record);
        let session = json!({
            "uploadId": created["uploadId"],
            "key": created["key"],
            "ownerId": owner,
        });

        let mut sign = session.clone();
        sign["partNumber"] = json!(1);
        let signed = client.ok("sign_part", sign).await;
        let resp = client
            .http()
            .put(signed["url"].as_str().expect("url"))
            .body("hello parcel")
            .send()
            .await
            .expect("put part");
        let etag = resp
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .expect("etag")
            .to_owned();

        let mut complete = session;
        complete["parts"] = json!([{"PartNumber": 1, "ETag": etag}]);
        complete["recordId"] = json!(record);
        let done = client.ok("complete_multipart_upload", complete).await;
        assert_eq!(done["recordUpdated"], true);

        let lookup = json!({"ownerId": owner, "recordId": record});
        let download = client.ok("resource_download_url", lookup.clone()).await;
        let body = client
            .http()
            .get(download["url"].as_str().expect("url"))
            .send()
            .await
            .expect("get object")
            .bytes()
            .await
            .expect("body");
        assert_eq!(body.as_ref(), b"hello parcel");

        let deleted = client.ok("resource_object_delete", lookup.clone()).await;
        assert_eq!(deleted["deleted"], true);
        assert_eq!(deleted["key"], created["key"]);

        let (status, json) = client
            .call("resource_download_url", lookup)
            .await
            .expect("call");
        assert_eq!(status, 404, "{json}");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_accept_single_file_put() {
        let client = ParcelClient::new();
        let owner = test_owner_id("single");

        let signed = client
            .ok(
                "get_signed_url",
                json!({"ownerId": owner, "filename": "small.json"}),
            )
            .await;
        let resource_id = signed["resourceId"].as_str().expect("resourceId");
        let key = signed["key"].as_str().expect("key");
        assert!(key.contains(resource_id));
        assert!(key.ends_with("/small.json"));

        let resp = client
            .http()
            .put(signed["signedUrl"].as_str().expect("signedUrl"))
            .body(r#"{"ok":true}"#)
            .send()
            .await
            .expect("put object");
        assert_eq!(resp.status().as_u16(), 200);
        assert!(resp.headers().contains_key("etag"));
    }
}
