//! Credential storage with proactive and rejection-driven refresh.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::ApiError;
use crate::config::TOKEN_REFRESH_MARGIN_SECS;

/// A bearer token pair with its expiry.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Token attached to outbound requests.
    pub access_token: String,
    /// Token used to obtain a new pair; absent for credentials that
    /// cannot be refreshed without user interaction.
    pub refresh_token: Option<String>,
    /// Instant at which the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Whether the access token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at <= Utc::now() + margin
    }
}

/// Exchanges a refresh token for a new credential pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Perform the refresh exchange.
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, ApiError>;
}

/// Shared credential state for all in-flight calls.
///
/// Refreshes single-flight: a caller that lost the race to refresh finds
/// the stored access token already different from the one that was
/// rejected and reuses it instead of refreshing again.
pub struct CredentialStore {
    current: Mutex<Credential>,
    refresher: Arc<dyn TokenRefresher>,
    margin: Duration,
}

impl CredentialStore {
    /// Create a store with the default proactive-refresh margin.
    pub fn new(initial: Credential, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self::with_margin(
            initial,
            refresher,
            Duration::seconds(TOKEN_REFRESH_MARGIN_SECS),
        )
    }

    /// Create a store with an explicit proactive-refresh margin.
    pub fn with_margin(
        initial: Credential,
        refresher: Arc<dyn TokenRefresher>,
        margin: Duration,
    ) -> Self {
        Self {
            current: Mutex::new(initial),
            refresher,
            margin,
        }
    }

    /// Current access token, refreshing first when expiry is near.
    pub async fn access_token(&self) -> Result<String, ApiError> {
        let mut current = self.current.lock().await;
        if current.expires_within(self.margin) {
            debug!("Access token near expiry, refreshing proactively");
            *current = self.exchange(&current).await?;
        }
        Ok(current.access_token.clone())
    }

    /// Refresh after the service rejected `stale`.
    ///
    /// Returns the token to retry with. When another caller already
    /// refreshed, the stored token no longer matches `stale` and is
    /// returned as-is without a second exchange.
    pub async fn refresh_after_rejection(&self, stale: &str) -> Result<String, ApiError> {
        let mut current = self.current.lock().await;
        if current.access_token != stale {
            debug!("Token already refreshed by a concurrent call");
            return Ok(current.access_token.clone());
        }
        warn!("Access token rejected by the service, refreshing");
        *current = self.exchange(&current).await?;
        Ok(current.access_token.clone())
    }

    /// Force the next [`Self::access_token`] call to refresh.
    pub async fn invalidate(&self) {
        let mut current = self.current.lock().await;
        current.expires_at = Utc::now();
    }

    async fn exchange(&self, current: &Credential) -> Result<Credential, ApiError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(ApiError::ReauthRequired)?;
        self.refresher.refresh(refresh_token).await
    }
}
