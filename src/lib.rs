//! # Veilgate
//!
//! Veilgate bridges BigQuery's remote-function batched-call convention to
//! HashiCorp Vault's Transform secrets engine. It accepts a batch of opaque
//! string values, routes each to a format-preserving encode or decode under a
//! configured role and transformation, and returns results in exact
//! positional order, tolerating per-item failure without aborting the batch.
//!
//! ## Architecture
//!
//! ```text
//! BigQuery remote function → HTTP API → Batch Dispatcher → Transform Client → Vault
//!                                ↓              ↓                 ↓
//!                         envelope parse   per-item        session + retry
//!                         + op resolution  isolation       + auth refresh
//! ```
//!
//! ## Core Components
//!
//! - **HTTP API** ([`api`]): axum server speaking the remote-function
//!   envelope; request-level errors become non-200 responses, item-level
//!   errors become tagged marker strings inside a 200 reply.
//! - **Batch Dispatcher** ([`dispatch`]): ordered, bounded-concurrency fanout
//!   with a hard `len(replies) == len(calls)` contract.
//! - **Transform Client** ([`transform`]): Vault Transform engine round trips
//!   with retry/backoff and single-flight credential refresh.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod observability;
pub mod transform;

pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
