//! Vault Transform backend integration.
//!
//! This module owns the outbound half of the bridge: an authenticated session
//! to HashiCorp Vault's Transform secrets engine and the encode/decode round
//! trips performed under a named role and transformation.
//!
//! # Architecture
//!
//! The dispatcher depends only on the [`TransformBackend`] trait. The
//! production implementation is [`VaultTransformClient`], which speaks Vault's
//! HTTP API directly and owns the retry/backoff policy plus the single-flight
//! credential refresh in [`VaultSession`].
//!
//! # Security
//!
//! - Tokens and AppRole secret ids are wrapped in [`SecretString`] and never
//!   logged or serialized.
//! - Error messages carry Vault's `errors` array and status codes only, never
//!   raw response bodies.
//! - No transformed values are cached or persisted.

pub mod client;
pub mod error;
pub mod session;
pub mod types;

pub use client::{
    TransformBackend, TransformOperation, VaultTransformClient, VaultTransformConfig,
};
pub use error::{Result, TransformError};
pub use session::{VaultCredentials, VaultSession};
pub use types::SecretString;
