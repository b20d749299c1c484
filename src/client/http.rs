//! Production transport backed by a shared `reqwest` client.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tracing::debug;

use super::{ApiError, ApiRequest, Method, RawResponse, Transport, TransportKind};

/// Connect timeout for the shared HTTP client.
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall request timeout for the shared HTTP client.
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared HTTP client with connection pooling.
///
/// Created once on first use. All remote calls go through this client so
/// keep-alive connections are reused across the whole engine.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(std::time::Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| panic!("Failed to create HTTP client: {e}"))
});

/// [`Transport`] implementation over the shared `reqwest` client.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTransport;

impl HttpTransport {
    /// Create the production transport.
    pub fn new() -> Self {
        HttpTransport
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "Dispatching request");

        let mut builder = match request.method {
            Method::Get => HTTP_CLIENT.get(&request.url),
            Method::Post => HTTP_CLIENT.post(&request.url),
            Method::Put => HTTP_CLIENT.put(&request.url),
            Method::Patch => HTTP_CLIENT.patch(&request.url),
            Method::Delete => HTTP_CLIENT.delete(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(RawResponse { status, body })
    }
}

/// Map a `reqwest` failure onto a structured [`TransportKind`].
///
/// Connection resets only show up in the `io::Error` source chain, so walk
/// it looking for a kind we recognize before falling back to `Other`.
fn classify_reqwest_error(error: reqwest::Error) -> ApiError {
    let kind = if error.is_timeout() {
        TransportKind::Timeout
    } else if error.is_connect() {
        TransportKind::ConnectionRefused
    } else {
        io_kind_in_chain(&error).unwrap_or(TransportKind::Other)
    };

    ApiError::Transport {
        kind,
        message: error.to_string(),
    }
}

fn io_kind_in_chain(error: &reqwest::Error) -> Option<TransportKind> {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return match io.kind() {
                std::io::ErrorKind::ConnectionReset => Some(TransportKind::ConnectionReset),
                std::io::ErrorKind::ConnectionRefused => Some(TransportKind::ConnectionRefused),
                std::io::ErrorKind::TimedOut => Some(TransportKind::Timeout),
                _ => None,
            };
        }
        source = cause.source();
    }
    None
}
