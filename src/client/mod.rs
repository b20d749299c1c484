//! Remote-call layer
//!
//! Everything the engine needs to talk to the document service: the error
//! taxonomy, the transport seam, credential management, keyed rate
//! limiting, retry coordination and the [`facade::ApiClient`] that composes
//! them around each HTTP call.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

pub mod credentials;
pub mod facade;
pub mod http;
pub mod rate_limit;
pub mod retry;

pub use credentials::{Credential, CredentialStore, TokenRefresher};
pub use facade::{ApiClient, CallOptions};
pub use http::HttpTransport;
pub use rate_limit::{KeyedRateLimiter, GLOBAL_KEY};
pub use retry::{RetryCoordinator, RetryOptions};

/// Remote envelope codes fixed by the service contract.
pub mod codes {
    /// Request-throttling signal; retryable with a floored delay.
    pub const RATE_LIMIT: i64 = 99_991_400;
    /// First code of the token-rejection range.
    pub const TOKEN_RANGE_START: i64 = 99_991_661;
    /// Last code of the token-rejection range.
    pub const TOKEN_RANGE_END: i64 = 99_991_668;
    /// Another writer holds an edit on the document; retryable.
    pub const EDIT_CONFLICT: i64 = 1_770_164;
    /// Request payload rejected by validation.
    pub const BAD_REQUEST: i64 = 1_770_001;
    /// Document or block does not exist.
    pub const NOT_FOUND: i64 = 1_770_002;
    /// Caller lacks access to the document.
    pub const PERMISSION_DENIED: i64 = 1_770_003;
}

/// HTTP method of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Canonical uppercase method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound request as handed to the transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Fully resolved URL.
    pub url: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Bearer token attached to the request.
    pub bearer: Option<String>,
}

/// Raw transport response before envelope interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, possibly empty.
    pub body: String,
}

impl RawResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP boundary. Production code uses [`http::HttpTransport`]; tests
/// substitute an in-memory implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange. Only network-level failures surface as
    /// errors here; non-2xx statuses come back as a [`RawResponse`] for
    /// the facade to classify.
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}

/// Network-level failure classification, produced at the HTTP-client
/// boundary rather than by inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Request or connect timeout.
    Timeout,
    /// Connection could not be established.
    ConnectionRefused,
    /// Peer reset an established connection.
    ConnectionReset,
    /// Any other transport failure, including 5xx statuses with an
    /// unparsable body.
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Timeout => "timeout",
            TransportKind::ConnectionRefused => "connection refused",
            TransportKind::ConnectionReset => "connection reset",
            TransportKind::Other => "other",
        })
    }
}

/// Remote-call errors.
///
/// The retry coordinator recovers the transient classes locally; only a
/// terminal failure propagates to the caller, always carrying the remote
/// code, message and endpoint where they exist.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Remote request-throttling signal.
    #[error("rate limited by the document service (code {code}) at {endpoint}: {message}")]
    RateLimited {
        /// Remote numeric code.
        code: i64,
        /// Remote message.
        message: String,
        /// Endpoint path of the failing call.
        endpoint: String,
    },

    /// The bearer token was rejected; triggers one refresh-and-retry.
    #[error("access token rejected (code {code}): {message}")]
    CredentialInvalid {
        /// Remote numeric code.
        code: i64,
        /// Remote message.
        message: String,
    },

    /// Credential expired with no refresh token available.
    #[error("credential expired and no refresh token is available; interactive re-authorization required")]
    ReauthRequired,

    /// Another writer is mid-edit on the same document.
    #[error("another writer is editing the document (code {code}) at {endpoint}: {message}")]
    EditConflict {
        /// Remote numeric code.
        code: i64,
        /// Remote message.
        message: String,
        /// Endpoint path of the failing call.
        endpoint: String,
    },

    /// Caller lacks access to the resource.
    #[error("permission denied (code {code}) at {endpoint}: {message}")]
    PermissionDenied {
        /// Remote numeric code.
        code: i64,
        /// Remote message.
        message: String,
        /// Endpoint path of the failing call.
        endpoint: String,
    },

    /// Resource does not exist.
    #[error("not found (code {code}) at {endpoint}: {message}")]
    NotFound {
        /// Remote numeric code.
        code: i64,
        /// Remote message.
        message: String,
        /// Endpoint path of the failing call.
        endpoint: String,
    },

    /// Request payload rejected by remote validation.
    #[error("malformed request (code {code}) at {endpoint}: {message}")]
    MalformedRequest {
        /// Remote numeric code.
        code: i64,
        /// Remote message.
        message: String,
        /// Endpoint path of the failing call.
        endpoint: String,
    },

    /// Network-level failure.
    #[error("transport error ({kind}): {message}")]
    Transport {
        /// Structured failure kind.
        kind: TransportKind,
        /// Underlying error text.
        message: String,
    },

    /// Unrecognized remote error code; treated as fatal (fail closed).
    #[error("remote error {code} at {endpoint}: {message}")]
    Remote {
        /// Remote numeric code.
        code: i64,
        /// Remote message.
        message: String,
        /// Endpoint path of the failing call.
        endpoint: String,
    },

    /// Response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether the retry coordinator may recover this error with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. }
                | ApiError::EditConflict { .. }
                | ApiError::Transport { .. }
        )
    }

    /// Whether this error should trigger the one-shot credential refresh.
    pub fn is_credential(&self) -> bool {
        matches!(self, ApiError::CredentialInvalid { .. })
    }

    /// Actionable guidance surfaced with terminal failures.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            ApiError::RateLimited { .. } => {
                Some("Reduce request rate or wait for the quota window to reset")
            }
            ApiError::ReauthRequired => {
                Some("Run the interactive authorization flow again to obtain a new token pair")
            }
            ApiError::PermissionDenied { .. } => {
                Some("Verify the app has been granted access to this document")
            }
            ApiError::NotFound { .. } => Some("Check the document and block identifiers"),
            ApiError::MalformedRequest { .. } => {
                Some("Check block payloads and index bounds against the API contract")
            }
            ApiError::Remote { .. } => Some("Consult the service error-code reference"),
            ApiError::Transport { .. } => Some("Check network connectivity and try again"),
            _ => None,
        }
    }
}

/// Classify a non-zero remote envelope code into a typed error.
///
/// Unrecognized codes fail closed as [`ApiError::Remote`].
pub fn classify_remote_code(code: i64, message: String, endpoint: &str) -> ApiError {
    let endpoint = endpoint.to_string();
    match code {
        codes::RATE_LIMIT => ApiError::RateLimited {
            code,
            message,
            endpoint,
        },
        codes::TOKEN_RANGE_START..=codes::TOKEN_RANGE_END => {
            ApiError::CredentialInvalid { code, message }
        }
        codes::EDIT_CONFLICT => ApiError::EditConflict {
            code,
            message,
            endpoint,
        },
        codes::PERMISSION_DENIED => ApiError::PermissionDenied {
            code,
            message,
            endpoint,
        },
        codes::NOT_FOUND => ApiError::NotFound {
            code,
            message,
            endpoint,
        },
        codes::BAD_REQUEST => ApiError::MalformedRequest {
            code,
            message,
            endpoint,
        },
        _ => ApiError::Remote {
            code,
            message,
            endpoint,
        },
    }
}

/// Fallback classification from an HTTP status when the envelope is
/// missing or unparsable.
pub fn classify_http_status(status: u16, body: &str, endpoint: &str) -> ApiError {
    let endpoint = endpoint.to_string();
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };
    match status {
        429 => ApiError::RateLimited {
            code: i64::from(status),
            message,
            endpoint,
        },
        401 => ApiError::CredentialInvalid {
            code: i64::from(status),
            message,
        },
        403 => ApiError::PermissionDenied {
            code: i64::from(status),
            message,
            endpoint,
        },
        404 => ApiError::NotFound {
            code: i64::from(status),
            message,
            endpoint,
        },
        400 => ApiError::MalformedRequest {
            code: i64::from(status),
            message,
            endpoint,
        },
        500..=599 => ApiError::Transport {
            kind: TransportKind::Other,
            message,
        },
        _ => ApiError::Remote {
            code: i64::from(status),
            message,
            endpoint,
        },
    }
}
