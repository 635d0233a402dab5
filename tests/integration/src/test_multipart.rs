//! Multipart lifecycle integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{ParcelClient, test_owner_id};

    async fn put_part(client: &ParcelClient, url: &str, data: Vec<u8>) -> String {
        let resp = client
            .http()
            .put(url)
            .body(data)
            .send()
            .await
            .expect("put part");
        assert_eq!(resp.status().as_u16(), 200, "part upload rejected");
        resp.headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .expect("etag header")
            .to_owned()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_complete_multipart_upload() {
        let client = ParcelClient::new();
        let owner = test_owner_id("mpu");

        let created = client
            .ok(
                "create_multipart_upload",
                json!({"ownerId": owner, "filename": "table.csv", "contentType": "text/csv"}),
            )
            .await;
        let upload_id = created["uploadId"].as_str().expect("uploadId").to_owned();
        let key = created["key"].as_str().expect("key").to_owned();
        assert!(key.ends_with("/table.csv"));
        assert!(key.contains(&owner));

        let session = json!({"uploadId": upload_id, "key": key, "ownerId": owner});
        let mut prepare = session.clone();
        prepare["parts"] = json!([1, "2"]);
        let prepared = client.ok("prepare_upload_parts", prepare).await;
        let url1 = prepared["presignedUrls"]["1"].as_str().expect("url 1").to_owned();
        let url2 = prepared["presignedUrls"]["2"].as_str().expect("url 2").to_owned();

        let e1 = put_part(&client, &url1, vec![0xAA; 1024]).await;
        let e2 = put_part(&client, &url2, vec![0xBB; 512]).await;

        let listed = client.ok("list_parts", session.clone()).await;
        let parts = listed["parts"].as_array().expect("parts");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["partNumber"], 1);

        let mut complete = session.clone();
        complete["parts"] = json!([
            {"PartNumber": 2, "ETag": e2},
            {"PartNumber": 1, "ETag": e1},
        ]);
        let done = client.ok("complete_multipart_upload", complete).await;
        assert_eq!(done["key"], key);
        assert!(done["eTag"].as_str().expect("eTag").ends_with("-2\""));
        assert!(done["location"].as_str().expect("location").ends_with(&key));

        // A finished session cannot be reused.
        let (status, json) = client.call("list_parts", session).await.expect("call");
        assert_eq!(status, 404, "{json}");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_sign_single_part() {
        let client = ParcelClient::new();
        let owner = test_owner_id("sign");

        let created = client
            .ok(
                "create_multipart_upload",
                json!({"ownerId": owner, "filename": "one.bin"}),
            )
            .await;
        let mut sign = json!({
            "uploadId": created["uploadId"],
            "key": created["key"],
            "ownerId": owner,
        });
        sign["partNumber"] = json!(3);
        let signed = client.ok("sign_part", sign.clone()).await;
        assert_eq!(signed["partNumber"], 3);
        assert!(signed["url"].as_str().expect("url").contains("partNumber=3"));

        sign["partNumber"] = json!(0);
        let (status, json) = client.call("sign_part", sign.clone()).await.expect("call");
        assert_eq!(status, 400);
        assert_eq!(json["error"]["field"], "partNumber");

        client.ok("abort_multipart_upload", sign).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_abort_multipart_upload_idempotently() {
        let client = ParcelClient::new();
        let owner = test_owner_id("abort");

        let created = client
            .ok(
                "create_multipart_upload",
                json!({"ownerId": owner, "filename": "gone.bin"}),
            )
            .await;
        let session = json!({
            "uploadId": created["uploadId"],
            "key": created["key"],
            "ownerId": owner,
        });

        let aborted = client.ok("abort_multipart_upload", session.clone()).await;
        assert_eq!(aborted["aborted"], true);
        let again = client.ok("abort_multipart_upload", session.clone()).await;
        assert_eq!(again["aborted"], true);

        let mut prepare = session;
        prepare["parts"] = json!([1]);
        let (status, json) = client
            .call("prepare_upload_parts", prepare)
            .await
            .expect("call");
        assert_eq!(status, 404, "{json}");
        assert_eq!(json["error"]["__type"], "NotFound");
    }
}
