//! Shared fixtures for engine tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use docsync::client::retry::RetryOptions;
use docsync::client::{ApiError, ApiRequest, RawResponse, TokenRefresher, Transport};
use docsync::{ApiClient, Credential, CredentialStore, EngineConfig};

/// In-memory transport that records every request and replays scripted
/// responses. When the script runs out it answers with an empty-success
/// envelope.
pub struct RecordingTransport {
    requests: Mutex<Vec<ApiRequest>>,
    responses: Mutex<VecDeque<RawResponse>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a response for the next unscripted request.
    pub fn push_response(&self, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(RawResponse {
                status,
                body: body.to_string(),
            });
    }

    /// Queue a successful envelope with the given `data` payload.
    pub fn push_data(&self, data: serde_json::Value) {
        let body = serde_json::json!({ "code": 0, "msg": "success", "data": data });
        self.push_response(200, &body.to_string());
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        let scripted = self.responses.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| RawResponse {
            status: 200,
            body: r#"{"code":0,"msg":"success","data":{}}"#.to_string(),
        }))
    }
}

/// Refresher that counts exchanges and hands out sequentially numbered
/// tokens.
pub struct CountingRefresher {
    pub calls: AtomicUsize,
}

impl CountingRefresher {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenRefresher for CountingRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential {
            access_token: format!("refreshed-{n}"),
            refresh_token: Some(refresh_token.to_string()),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}

/// Refresher for tests that must never refresh.
pub struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh(&self, _refresh_token: &str) -> Result<Credential, ApiError> {
        panic!("unexpected token refresh");
    }
}

pub fn fresh_credential() -> Credential {
    Credential {
        access_token: "initial".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

/// Engine config with pacing and backoff shrunk to keep tests fast.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        min_interval: Duration::ZERO,
        rate_key_cap: 64,
        retry: RetryOptions {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            rate_limit_floor: Duration::from_millis(2),
        },
    }
}

/// Client over a recording transport with fast test settings.
pub fn test_client(transport: Arc<RecordingTransport>) -> Arc<ApiClient> {
    test_client_with(transport, Arc::new(CountingRefresher::new()))
}

pub fn test_client_with(
    transport: Arc<RecordingTransport>,
    refresher: Arc<dyn TokenRefresher>,
) -> Arc<ApiClient> {
    let store = Arc::new(CredentialStore::new(fresh_credential(), refresher));
    Arc::new(ApiClient::with_config(
        "https://docs.example.com/api/v1",
        transport,
        store,
        fast_config(),
    ))
}
