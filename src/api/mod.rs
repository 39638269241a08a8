//! # HTTP API
//!
//! Inbound half of the bridge: the BigQuery remote-function contract.
//! Envelope parsing and operation resolution live in [`envelope`]; request
//! level failures map to HTTP statuses in [`error`], while per-item failures
//! stay inside the 200 reply as tagged marker strings.

pub mod envelope;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::build_router;
pub use server::start_api_server;
