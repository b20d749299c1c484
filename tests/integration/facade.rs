//! Integration tests for the API client facade

use std::sync::Arc;

use docsync::client::{ApiError, CallOptions, Method};
use serde_json::json;

use crate::support::{test_client, test_client_with, CountingRefresher, RecordingTransport};

#[tokio::test]
async fn test_empty_body_success() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_response(200, "");
    let client = test_client(Arc::clone(&transport));

    let data = client
        .call(Method::Delete, "/documents/d1", &[], None, &CallOptions::default())
        .await
        .unwrap();

    assert!(data.is_null());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_envelope_data_is_returned() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_data(json!({ "items": [1, 2, 3] }));
    let client = test_client(Arc::clone(&transport));

    let data = client
        .call(Method::Get, "/documents/d1/blocks", &[], None, &CallOptions::default())
        .await
        .unwrap();

    assert_eq!(data["items"], json!([1, 2, 3]));
    let requests = transport.requests();
    assert_eq!(requests[0].bearer.as_deref(), Some("initial"));
    assert!(requests[0].url.starts_with("https://docs.example.com/api/v1/"));
}

#[tokio::test]
async fn test_fatal_envelope_code_is_not_retried() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_response(200, r#"{"code":1770002,"msg":"not found"}"#);
    let client = test_client(Arc::clone(&transport));

    let error = client
        .call(Method::Get, "/documents/gone", &[], None, &CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::NotFound { code: 1_770_002, .. }));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_retryable_envelope_code_exhausts_attempts() {
    let transport = Arc::new(RecordingTransport::new());
    for _ in 0..3 {
        transport.push_response(200, r#"{"code":1770164,"msg":"another writer"}"#);
    }
    let client = test_client(Arc::clone(&transport));

    let error = client
        .call(
            Method::Post,
            "/documents/d1/blocks/d1/children",
            &[],
            None,
            &CallOptions::for_document("d1"),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::EditConflict { .. }));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_http_status_fallback_when_body_is_not_json() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_response(404, "<html>not found</html>");
    let client = test_client(Arc::clone(&transport));

    let error = client
        .call(Method::Get, "/documents/gone", &[], None, &CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::NotFound { .. }));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_credential_rejection_refreshes_once_and_retries() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_response(200, r#"{"code":99991663,"msg":"token expired"}"#);
    transport.push_data(json!({}));
    let refresher = Arc::new(CountingRefresher::new());
    let client = test_client_with(Arc::clone(&transport), refresher.clone());

    client
        .call(Method::Get, "/documents/d1", &[], None, &CallOptions::default())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].bearer.as_deref(), Some("initial"));
    assert_eq!(requests[1].bearer.as_deref(), Some("refreshed-1"));
    assert_eq!(refresher.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_credential_rejection_is_terminal() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_response(200, r#"{"code":99991664,"msg":"token invalid"}"#);
    transport.push_response(200, r#"{"code":99991664,"msg":"token invalid"}"#);
    let client = test_client(Arc::clone(&transport));

    let error = client
        .call(Method::Get, "/documents/d1", &[], None, &CallOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::CredentialInvalid { .. }));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_skip_retry_fails_on_first_transient_error() {
    let transport = Arc::new(RecordingTransport::new());
    transport.push_response(200, r#"{"code":1770164,"msg":"another writer"}"#);
    let client = test_client(Arc::clone(&transport));

    let options = CallOptions {
        skip_retry: true,
        ..CallOptions::default()
    };
    let error = client
        .call(Method::Post, "/documents/d1", &[], None, &options)
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::EditConflict { .. }));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_call_data_deserializes_payload() {
    #[derive(serde::Deserialize)]
    struct Listing {
        items: Vec<i32>,
    }

    let transport = Arc::new(RecordingTransport::new());
    transport.push_data(json!({ "items": [4, 5] }));
    let client = test_client(Arc::clone(&transport));

    let listing: Listing = client
        .call_data(Method::Get, "/documents/d1/blocks", &[], None, &CallOptions::default())
        .await
        .unwrap();

    assert_eq!(listing.items, vec![4, 5]);
}
