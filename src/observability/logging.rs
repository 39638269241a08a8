//! # Structured Logging
//!
//! Tracing-based logging setup for the bridge. Log entries around batch
//! handling carry the caller-supplied `requestId` so a BigQuery job can be
//! correlated with the Vault calls it produced. Vault tokens never reach the
//! log stream; see [`crate::transform::SecretString`].

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;
use crate::{Error, Result};

/// Initialize the global tracing subscriber.
///
/// The filter honors `RUST_LOG` when set, falling back to the configured
/// level. JSON output is used when `json_logging` is enabled.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.log_level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::config(format!("Failed to initialize logging: {}", e)))
}

/// Create a tracing span for one inbound batch request.
///
/// `request_id` is the caller-supplied trace token when present; a fresh UUID
/// otherwise, so every batch is correlatable either way.
#[macro_export]
macro_rules! batch_span {
    ($operation:expr, $request_id:expr) => {
        tracing::info_span!(
            "transform_batch",
            operation = %$operation,
            request_id = %$request_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            caller = tracing::field::Empty,
            session_user = tracing::field::Empty
        )
    };
}

/// Log configuration at startup. Credentials are intentionally absent.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        server_address = %format!("{}:{}", config.server.bind_address, config.server.port),
        vault_address = %config.vault.address,
        transform_mount = %config.vault.mount_path,
        transform_role = %config.vault.role,
        transformation = %config.vault.transformation,
        batch_parallelism = config.dispatch.parallelism,
        "Veilgate bridge configuration"
    );
}
