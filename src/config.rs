//! Engine configuration constants and tunables

use std::time::Duration;

use crate::client::retry::RetryOptions;

/// Minimum spacing between any two requests sharing a rate-limiter key.
/// The document service allows only a handful of requests per second per
/// app, and same-document edits are limited harder still, so 300ms keeps a
/// single engine comfortably inside both quotas.
pub const MIN_REQUEST_INTERVAL_MS: u64 = 300;

/// Maximum number of distinct rate-limiter keys kept in memory.
/// Each open document gets its own key; once the map exceeds this cap the
/// least-recently-used half is evicted so long-running processes touching
/// many documents stay bounded.
pub const RATE_KEY_CAP: usize = 1024;

/// Maximum number of attempts for a remote call.
/// 3 attempts recovers from transient throttling and network blips without
/// stretching a failing mutation past a few seconds of wall time.
pub const MAX_ATTEMPTS: u32 = 3;

/// Initial backoff delay in milliseconds.
/// 1 second is long enough for the per-second quota window to reset.
pub const BASE_DELAY_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
/// 10 seconds caps exponential growth so total suspension stays bounded by
/// `MAX_ATTEMPTS * MAX_DELAY_MS`.
pub const MAX_DELAY_MS: u64 = 10_000;

/// Floor applied to the backoff delay when the remote signals throttling.
/// The service's quota window is measured in seconds; retrying sooner than
/// 2 seconds after an explicit rate-limit response just burns an attempt.
pub const RATE_LIMIT_FLOOR_MS: u64 = 2000;

/// Safety margin before token expiry at which a refresh is performed.
/// 5 minutes leaves room for clock skew and for long mutation chains to
/// finish on the token they started with.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Maximum number of block descriptors per create-children call.
/// The service rejects batches larger than 50 children.
pub const CREATE_BATCH_SIZE: usize = 50;

/// Delay between deleting a range and inserting table content into it.
/// The remote document revision state is eventually consistent after a
/// batch delete; inserting a table too quickly can land on a stale
/// revision. Empirical value, configurable through [`PlannerConfig`].
pub const TABLE_SETTLE_DELAY_MS: u64 = 100;

/// Page size for the block-listing endpoint (server maximum).
pub const LIST_PAGE_SIZE: usize = 500;

/// Maximum pages fetched when listing a document's blocks, guarding
/// against a pagination loop that never terminates.
pub const MAX_LIST_PAGES: usize = 1000;

/// Tunables for the remote-call layer (rate limiting and retry).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum spacing between requests sharing a rate-limiter key.
    pub min_interval: Duration,
    /// Maximum number of distinct rate-limiter keys kept in memory.
    pub rate_key_cap: usize,
    /// Retry policy applied to every remote call unless opted out.
    pub retry: RetryOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(MIN_REQUEST_INTERVAL_MS),
            rate_key_cap: RATE_KEY_CAP,
            retry: RetryOptions::default(),
        }
    }
}

/// Tunables for the mutation planner.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum plain blocks submitted per create-children call.
    pub batch_size: usize,
    /// Settle delay applied between a range delete and a table insert.
    pub settle_delay: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            batch_size: CREATE_BATCH_SIZE,
            settle_delay: Duration::from_millis(TABLE_SETTLE_DELAY_MS),
        }
    }
}
