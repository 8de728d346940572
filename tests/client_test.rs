//! Tests for DriveClient with mocked HTTP responses.

use drive_download::client::{DriveClient, Exporter, Lister};
use drive_download::error::{DriveError, ErrorKind};
use mockito::{Matcher, Server};
use serde_json::json;

const TOKEN: &str = "ya29.test-token";

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_list_single_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageSize".into(), "3".into()),
                Matcher::UrlEncoded(
                    "fields".into(),
                    "nextPageToken, files(id, name, mimeType)".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "nextPageToken": "more",
                    "files": [
                        {"id": "v1", "name": "clip", "mimeType": "application/vnd.google-apps.video"},
                        {"id": "f1", "name": "Photos", "mimeType": "application/vnd.google-apps.folder"},
                        {"id": "d1", "name": "notes", "mimeType": "application/vnd.google-apps.document"}
                    ]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = DriveClient::with_base_url(TOKEN.to_string(), server.url());
        let files = client.list(3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].id, "v1");
        assert_eq!(files[1].mime_type, "application/vnd.google-apps.folder");
        assert_eq!(files[2].name, "notes");
    }

    #[tokio::test]
    async fn test_list_empty_account() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let client = DriveClient::with_base_url(TOKEN.to_string(), server.url());
        let files = client.list(10).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_passes_negative_count_through() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded("pageSize".into(), "-1".into()))
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"error": {"code": 400, "message": "Invalid value '-1'. Values must be within the range: [1, 1000]"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = DriveClient::with_base_url(TOKEN.to_string(), server.url());
        let err = client.list(-1).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, DriveError::ApiError { status: 400, .. }));
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[tokio::test]
    async fn test_list_unauthorized_google_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({"error": {"code": 401, "message": "Invalid Credentials"}}).to_string())
            .create_async()
            .await;

        let client = DriveClient::with_base_url(TOKEN.to_string(), server.url());
        match client.list(5).await {
            Err(DriveError::ApiError { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid Credentials");
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_plain_error_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = DriveClient::with_base_url(TOKEN.to_string(), server.url());
        match client.list(5).await {
            Err(DriveError::ApiError { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }
}

mod export {
    use super::*;

    #[tokio::test]
    async fn test_export_returns_bytes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/files/d1/export")
            .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
            .match_query(Matcher::UrlEncoded("mimeType".into(), "application/pdf".into()))
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.4 test".to_vec())
            .create_async()
            .await;

        let client = DriveClient::with_base_url(TOKEN.to_string(), server.url());
        let bytes = client.export("d1", "application/pdf").await.unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_export_failure_is_remote_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/files/bin1/export")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"error": {"code": 403, "message": "Export only supports Docs Editors files."}})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = DriveClient::with_base_url(TOKEN.to_string(), server.url());
        let err = client.export("bin1", "application/pdf").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(err.to_string().contains("Export only supports Docs Editors files."));
    }
}

mod base_url {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = DriveClient::with_base_url(TOKEN.to_string(), "http://localhost:1234/drive/v3/");
        assert_eq!(client.base_url(), "http://localhost:1234/drive/v3");
    }

    #[test]
    fn test_default_base_url() {
        let client = DriveClient::new(TOKEN.to_string());
        assert_eq!(client.base_url(), "https://www.googleapis.com/drive/v3");
    }
}
