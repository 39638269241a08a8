//! # Configuration Management
//!
//! Environment-driven configuration for the Veilgate bridge. Everything is
//! loaded once at process start and stays immutable for the process lifetime;
//! Vault-side configuration (mount, role, transformation, alphabet) is
//! external setup and only its names are consumed here.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::transform::VaultTransformConfig;
use crate::{Error, Result};

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub observability: ObservabilityConfig,
    pub vault: VaultTransformConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind address for the inbound HTTP listener
    #[validate(length(min = 1, message = "Bind address cannot be empty"))]
    pub bind_address: String,

    /// Listen port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0".to_string(), port: 8080 }
    }
}

/// Batch dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Maximum concurrent backend calls per inbound batch
    #[validate(range(min = 1, max = 256, message = "Parallelism must be between 1 and 256"))]
    pub parallelism: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { parallelism: 8 }
    }
}

/// Observability configuration for logging.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl AppConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let bind_address =
            std::env::var("VEILGATE_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());

        // PORT is honored as a fallback for Cloud Run style deployments.
        let port = std::env::var("VEILGATE_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .map(|s| {
                s.parse::<u16>().map_err(|e| Error::config(format!("Invalid port: {}", e)))
            })
            .transpose()?
            .unwrap_or(8080);

        let parallelism = std::env::var("VEILGATE_BATCH_PARALLELISM")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8);

        let log_level = std::env::var("VEILGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let json_logging = std::env::var("VEILGATE_JSON_LOGGING")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        let config = Self {
            server: ServerConfig { bind_address, port },
            dispatch: DispatchConfig { parallelism },
            observability: ObservabilityConfig { log_level, json_logging },
            vault: VaultTransformConfig::from_env()?,
        };

        config.server.validate()?;
        config.dispatch.validate()?;
        config.observability.validate()?;

        Ok(config)
    }
}
