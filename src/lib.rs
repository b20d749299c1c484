//! # Document Synchronization Engine
//!
//! A library for synchronizing markdown text with a remote block-structured
//! document service. Translates markdown into typed block descriptors,
//! executes batched create/delete/replace/move mutations with per-document
//! rate limiting and retry, and renders remote block trees back to markdown.
//!
//! ## Features
//!
//! - **Markdown Translation**: Line-rule and inline-token parsing into typed block descriptors
//! - **Batched Mutations**: Chunked block creation, ranged delete, replace and move
//! - **Table Protocol**: Three-step table creation around server-generated cell ids
//! - **Rate Limiting**: Per-document pacing that also serializes concurrent edits
//! - **Retry with Backoff**: Jittered exponential backoff with a floor for throttling signals
//! - **Credential Refresh**: Proactive and rejection-driven token refresh, single-flight
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use docsync::client::{ApiError, TokenRefresher};
//! use docsync::{ApiClient, Credential, CredentialStore, HttpTransport, MutationPlanner};
//!
//! # struct Refresher;
//! # #[async_trait::async_trait]
//! # impl TokenRefresher for Refresher {
//! #     async fn refresh(&self, _token: &str) -> Result<Credential, ApiError> {
//! #         unimplemented!()
//! #     }
//! # }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credential = Credential {
//!     access_token: "access".to_string(),
//!     refresh_token: Some("refresh".to_string()),
//!     expires_at: chrono::Utc::now() + chrono::Duration::hours(2),
//! };
//! let store = Arc::new(CredentialStore::new(credential, Arc::new(Refresher)));
//! let api = Arc::new(ApiClient::new(
//!     "https://docs.example.com/api/v1",
//!     Arc::new(HttpTransport::new()),
//!     store,
//! ));
//!
//! // Translate markdown and append it to a document.
//! let planner = MutationPlanner::new(api);
//! let descriptors = docsync::markup::translate("# Title\n\nSome **bold** text.");
//! planner.insert("doc-token", "doc-token", 0, &descriptors).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`blocks`] - Block types, wire payloads and to-be-created descriptors
//! - [`markup`] - Markdown-to-descriptor translation and block-to-markdown rendering
//! - [`client`] - Transport, credentials, rate limiting, retry and the API facade
//! - [`planner`] - Batched mutation planning over the client
//! - [`config`] - Engine constants and tuning knobs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blocks;
pub mod client;
pub mod config;
pub mod markup;
pub mod planner;

pub use blocks::{Block, BlockDescriptor, BlockType, StyledRun};
pub use client::{
    ApiClient, ApiError, CallOptions, Credential, CredentialStore, HttpTransport, TokenRefresher,
};
pub use config::{EngineConfig, PlannerConfig};
pub use markup::{translate, MarkupRenderer, TabularGrid, TabularSource};
pub use planner::{MutationPlanner, PlannerError};
