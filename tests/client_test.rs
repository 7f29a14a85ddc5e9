//! Logseq HTTP client against a stub API server

mod common;

use common::{buffered_pipeline, json_lines};
use logseq_mcp::logging::{LoggingMode, PipelineLayer};
use logseq_mcp::{LogseqApi, LogseqClient, LogseqConfig, LogseqMcpError};
use tracing_subscriber::layer::SubscriberExt;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> LogseqClient {
    let address = server.address();
    let config = LogseqConfig {
        host: address.ip().to_string(),
        port: address.port(),
        token: Some("test-token".to_string()),
        ..LogseqConfig::default()
    };
    LogseqClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_get_page_sends_array_args_and_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_json(json!({
            "method": "logseq.Editor.getPage",
            "args": ["Inbox"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 3, "originalName": "Inbox"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server).get_page("Inbox").await.unwrap();

    assert_eq!(page, Some(json!({"id": 3, "originalName": "Inbox"})));
}

#[tokio::test]
async fn test_get_page_null_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let page = client_for(&server).get_page("Missing").await.unwrap();

    assert!(page.is_none());
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_page("Inbox").await.unwrap_err();

    match err {
        LogseqMcpError::Api(message) => {
            assert!(message.starts_with("logseq.Editor.getPage returned HTTP 500"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_all_pages_sends_no_args() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({"method": "logseq.Editor.getAllPages"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"name": "a"}, {"name": "b"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pages = client_for(&server).get_all_pages().await.unwrap();

    assert_eq!(pages.len(), 2);
}

#[tokio::test]
async fn test_search_unwraps_pages_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({"method": "logseq.Editor.search", "args": "atlas"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "blocks": [],
            "pages": ["Project Atlas", "Atlas Notes"]
        })))
        .mount(&server)
        .await;

    let results = client_for(&server).search_pages("atlas").await.unwrap();

    assert_eq!(results, vec![json!("Project Atlas"), json!("Atlas Notes")]);
}

#[tokio::test]
async fn test_page_blocks_failure_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let blocks = client_for(&server).get_page_blocks("Inbox").await.unwrap();

    assert!(blocks.is_empty());
}

#[tokio::test]
async fn test_query_rejects_scalar_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({"method": "logseq.DB.q", "args": "[:find ?p]"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("unexpected")))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute_query("[:find ?p]")
        .await
        .unwrap_err();

    assert!(matches!(err, LogseqMcpError::Api(_)));
}

#[tokio::test]
async fn test_create_page_with_content_adds_first_block() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({"method": "logseq.Editor.createPage", "args": ["Reading List"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"originalName": "Reading List"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_json(json!({
            "method": "logseq.Editor.insertBlock",
            "args": ["Reading List", "Dune"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uuid": "b-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .create_page("Reading List", Some("Dune"), None)
        .await
        .unwrap();

    assert_eq!(page["originalName"], "Reading List");
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({"method": "logseq.Editor.removeBlock", "args": ["b-9"]})))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = client_for(&server).delete_block("b-9").await.unwrap();

    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn test_privacy_file_sink_never_stores_api_payloads() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({
            "method": "logseq.Editor.insertBlock",
            "args": ["Medical Records", "My diagnosis is X"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "6571a3f2-0000-4000-8000-000000000001",
            "content": "My diagnosis is X"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "method": "logseq.Editor.getBlock",
            "args": ["6571a3f2-0000-4000-8000-000000000001"]
        })))
        .respond_with(ResponseTemplate::new(500).set_body_string("diagnosis lookup failed"))
        .mount(&server)
        .await;

    let (pipeline, buffer) = buffered_pipeline(LoggingMode::Privacy);
    let subscriber = tracing_subscriber::registry().with(PipelineLayer::new(pipeline));
    let _default = tracing::subscriber::set_default(subscriber);

    let client = client_for(&server);
    client
        .create_block("My diagnosis is X", Some("Medical Records"), None, None)
        .await
        .unwrap();
    assert!(client
        .get_block("6571a3f2-0000-4000-8000-000000000001")
        .await
        .is_err());

    let entries = json_lines(&buffer);
    assert!(entries
        .iter()
        .any(|entry| entry["message"] == "Logseq API response: logseq.Editor.insertBlock (200 OK)"));
    assert!(entries.iter().any(|entry| entry["status_code"] == 500));
    for entry in &entries {
        for field in ["request_data", "response_data", "response_text"] {
            assert!(entry.get(field).is_none(), "{} written: {}", field, entry);
        }
    }
    let contents = buffer.contents();
    assert!(!contents.contains("diagnosis"));
    assert!(!contents.contains("Medical Records"));
}
