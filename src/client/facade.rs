//! High-level API client composing transport, credentials, pacing and
//! retry around each remote call.

use std::sync::{Arc, Mutex as StdMutex};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{
    classify_http_status, classify_remote_code, ApiError, ApiRequest, CredentialStore,
    KeyedRateLimiter, Method, RawResponse, RetryCoordinator, Transport, GLOBAL_KEY,
};
use crate::config::EngineConfig;

/// Per-call routing and opt-outs.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Rate-limiter key the call is paced under.
    pub rate_key: String,
    /// Bypass pacing for this call.
    pub skip_rate_limit: bool,
    /// Bypass the retry loop for this call.
    pub skip_retry: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            rate_key: GLOBAL_KEY.to_string(),
            skip_rate_limit: false,
            skip_retry: false,
        }
    }
}

impl CallOptions {
    /// Pace the call under its document's key, so edits to the same
    /// document serialize while other documents proceed in parallel.
    pub fn for_document(document_id: &str) -> Self {
        Self {
            rate_key: document_id.to_string(),
            ..Self::default()
        }
    }
}

/// The engine's single entry point for remote calls.
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialStore>,
    limiter: KeyedRateLimiter,
    retry: RetryCoordinator,
}

impl ApiClient {
    /// Create a client with default pacing and retry settings.
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self::with_config(base_url, transport, credentials, EngineConfig::default())
    }

    /// Create a client with explicit settings.
    pub fn with_config(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            credentials,
            limiter: KeyedRateLimiter::new(config.min_interval, config.rate_key_cap),
            retry: RetryCoordinator::new(config.retry),
        }
    }

    /// Perform a call and return the envelope's `data` payload.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        options: &CallOptions,
    ) -> Result<Value, ApiError> {
        // The token that actually went out on the wire, so a credential
        // refresh can tell whether a concurrent call already replaced it.
        let last_token: StdMutex<Option<String>> = StdMutex::new(None);

        let dispatch = || self.throttled_dispatch(method, path, query, body, options, &last_token);

        if options.skip_retry {
            return dispatch().await;
        }

        self.retry
            .execute(path, dispatch, || async {
                let stale = last_token
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .take()
                    .unwrap_or_default();
                self.credentials.refresh_after_rejection(&stale).await?;
                Ok(())
            })
            .await
    }

    /// Perform a call and deserialize the `data` payload.
    pub async fn call_data<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        options: &CallOptions,
    ) -> Result<T, ApiError> {
        let data = self.call(method, path, query, body, options).await?;
        serde_json::from_value(data)
            .map_err(|e| ApiError::InvalidResponse(format!("{path}: {e}")))
    }

    async fn throttled_dispatch(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        options: &CallOptions,
        last_token: &StdMutex<Option<String>>,
    ) -> Result<Value, ApiError> {
        if options.skip_rate_limit {
            return self.dispatch(method, path, query, body, last_token).await;
        }
        self.limiter
            .throttle(&options.rate_key, || {
                self.dispatch(method, path, query, body, last_token)
            })
            .await
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        last_token: &StdMutex<Option<String>>,
    ) -> Result<Value, ApiError> {
        let token = self.credentials.access_token().await?;
        *last_token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());

        let request = ApiRequest {
            method,
            url: format!("{}{path}", self.base_url),
            query: query.to_vec(),
            body: body.cloned(),
            bearer: Some(token),
        };
        let response = self.transport.send(request).await?;
        self.interpret(response, path)
    }

    /// Interpret the service envelope `{code, msg, data}`.
    ///
    /// An empty 2xx body counts as success with no payload. A non-2xx
    /// status with an unparsable body falls back to status-based
    /// classification.
    fn interpret(&self, response: RawResponse, endpoint: &str) -> Result<Value, ApiError> {
        if response.body.trim().is_empty() {
            return if response.is_success() {
                Ok(Value::Null)
            } else {
                Err(classify_http_status(response.status, "", endpoint))
            };
        }

        let envelope: Value = match serde_json::from_str(&response.body) {
            Ok(value) => value,
            Err(_) if !response.is_success() => {
                return Err(classify_http_status(
                    response.status,
                    &response.body,
                    endpoint,
                ));
            }
            Err(e) => {
                return Err(ApiError::InvalidResponse(format!("{endpoint}: {e}")));
            }
        };

        let code = envelope.get("code").and_then(Value::as_i64);
        match code {
            Some(0) => {
                debug!(endpoint, "Call succeeded");
                Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
            }
            Some(code) => {
                let message = envelope
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                Err(classify_remote_code(code, message, endpoint))
            }
            None if response.is_success() => Ok(envelope),
            None => Err(classify_http_status(
                response.status,
                &response.body,
                endpoint,
            )),
        }
    }
}
