//! # Observability Infrastructure
//!
//! Structured logging for the bridge. Request-scoped spans are created with
//! the [`crate::batch_span!`] macro; HTTP-level tracing comes from
//! `tower_http::trace::TraceLayer` on the router.

pub mod logging;

pub use logging::{init_logging, log_config_info};
