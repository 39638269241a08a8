//! Vault Transform secrets engine client.
//!
//! Performs encode/decode round trips against the Transform engine under a
//! named role and transformation. Values are treated as opaque strings; Vault
//! is the sole authority on format rules, so nothing is validated or
//! normalized locally.
//!
//! # Configuration
//!
//! The client is configured once at process start:
//! - `VAULT_ADDR`: Vault server address (required)
//! - `VAULT_TOKEN` or `VAULT_APPROLE_ROLE_ID` + `VAULT_APPROLE_SECRET_ID`
//! - `VAULT_NAMESPACE`: optional Enterprise namespace
//! - `VEILGATE_TRANSFORM_MOUNT`: Transform engine mount path (default: "transform")
//! - `VEILGATE_TRANSFORM_ROLE`: role name (default: "creditcard-transform")
//! - `VEILGATE_TRANSFORMATION`: transformation name (default: "creditcard")
//! - `VEILGATE_BACKEND_TIMEOUT_SECONDS`: per-call deadline (default: 30)
//! - `VEILGATE_BACKEND_MAX_RETRIES`: transient-failure retries (default: 2)

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::Error;

use super::error::{Result, TransformError};
use super::session::{VaultCredentials, VaultSession};
use super::types::SecretString;

/// Base delay for exponential backoff between transient-failure retries.
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Which direction a transform call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOperation {
    Encode,
    Decode,
}

impl TransformOperation {
    /// URL path segment under the Transform mount.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
        }
    }

    /// Field name carrying the result in Vault's response payload.
    pub fn result_field(&self) -> &'static str {
        match self {
            Self::Encode => "encoded_value",
            Self::Decode => "decoded_value",
        }
    }
}

impl fmt::Display for TransformOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Backend seam the dispatcher calls through.
///
/// Production uses [`VaultTransformClient`]; tests substitute in-memory
/// implementations.
#[async_trait]
pub trait TransformBackend: Send + Sync {
    /// Perform a single encode or decode round trip.
    async fn transform(&self, operation: TransformOperation, value: &str) -> Result<String>;
}

/// Configuration for the Vault Transform client.
#[derive(Debug, Clone)]
pub struct VaultTransformConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,

    /// Transform engine mount path
    pub mount_path: String,

    /// Transform role name
    pub role: String,

    /// Transformation name applied under the role
    pub transformation: String,

    /// Session credentials
    pub credentials: VaultCredentials,

    /// Per-call deadline in seconds
    pub timeout_seconds: u64,

    /// Retries for transient failures (network, timeout, 5xx)
    pub max_retries: u32,
}

impl VaultTransformConfig {
    /// Load Vault configuration from environment variables.
    pub fn from_env() -> crate::Result<Self> {
        let address = std::env::var("VAULT_ADDR")
            .map_err(|_| Error::config("VAULT_ADDR environment variable not set"))?;

        let namespace = std::env::var("VAULT_NAMESPACE").ok().filter(|s| !s.is_empty());

        let role_id = std::env::var("VAULT_APPROLE_ROLE_ID").ok();
        let secret_id = std::env::var("VAULT_APPROLE_SECRET_ID").ok();
        let credentials = match (role_id, secret_id) {
            (Some(role_id), Some(secret_id)) => {
                VaultCredentials::AppRole { role_id, secret_id: SecretString::new(secret_id) }
            }
            _ => match std::env::var("VAULT_TOKEN") {
                Ok(token) => VaultCredentials::Token(SecretString::new(token)),
                Err(_) => {
                    return Err(Error::config(
                        "either VAULT_TOKEN or VAULT_APPROLE_ROLE_ID/VAULT_APPROLE_SECRET_ID must be set",
                    ))
                }
            },
        };

        let mount_path = std::env::var("VEILGATE_TRANSFORM_MOUNT")
            .unwrap_or_else(|_| "transform".to_string());
        let role = std::env::var("VEILGATE_TRANSFORM_ROLE")
            .unwrap_or_else(|_| "creditcard-transform".to_string());
        let transformation =
            std::env::var("VEILGATE_TRANSFORMATION").unwrap_or_else(|_| "creditcard".to_string());

        let timeout_seconds = std::env::var("VEILGATE_BACKEND_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let max_retries = std::env::var("VEILGATE_BACKEND_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(2);

        Ok(Self {
            address,
            namespace,
            mount_path,
            role,
            transformation,
            credentials,
            timeout_seconds,
            max_retries,
        })
    }
}

/// Vault Transform engine client.
///
/// Thread-safe; share behind an `Arc` across request handlers. The only
/// mutable state is the session token inside [`VaultSession`].
pub struct VaultTransformClient {
    http: reqwest::Client,
    session: Arc<VaultSession>,
    config: VaultTransformConfig,
}

#[derive(Deserialize)]
struct TransformResponse {
    data: TransformResponseData,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TransformResponseData {
    encoded_value: Option<String>,
    decoded_value: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VaultErrorBody {
    errors: Vec<String>,
}

impl VaultTransformClient {
    /// Creates a new Transform client with the given configuration.
    pub fn new(config: VaultTransformConfig) -> crate::Result<Self> {
        if config.address.is_empty() {
            return Err(Error::config("Vault address cannot be empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::config(format!("Failed to build Vault HTTP client: {}", e)))?;

        let session = Arc::new(VaultSession::new(
            http.clone(),
            &config.address,
            config.namespace.clone(),
            config.credentials.clone(),
        ));

        Ok(Self { http, session, config })
    }

    /// Probe Vault reachability at startup.
    ///
    /// Failure is logged but not fatal: the bridge still serves requests and
    /// reports per-item `backend_unavailable` markers while Vault is down.
    pub async fn check_connectivity(&self) {
        let url = format!("{}/v1/sys/health", self.base_address());
        match self.http.get(&url).send().await {
            Ok(response) => {
                info!(address = %self.base_address(), status = %response.status(), "Connected to Vault");
            }
            Err(e) => {
                warn!(address = %self.base_address(), error = %e, "Vault not reachable at startup");
            }
        }
    }

    /// Format-preserving encode of a single value.
    pub async fn encode(&self, value: &str) -> Result<String> {
        self.transform(TransformOperation::Encode, value).await
    }

    /// Inverse of [`VaultTransformClient::encode`] for values it produced.
    pub async fn decode(&self, value: &str) -> Result<String> {
        self.transform(TransformOperation::Decode, value).await
    }

    fn base_address(&self) -> &str {
        self.config.address.trim_end_matches('/')
    }

    fn endpoint_url(&self, operation: TransformOperation) -> String {
        format!(
            "{}/v1/{}/{}/{}",
            self.base_address(),
            self.config.mount_path,
            operation.path_segment(),
            self.config.role
        )
    }

    /// One attempt including the single permitted auth-refresh retry.
    async fn transform_once(&self, operation: TransformOperation, value: &str) -> Result<String> {
        let (token, generation) = self.session.current().await?;

        match self.call(operation, value, &token).await {
            Err(TransformError::Unauthenticated { .. }) => {
                // One refresh and one retry; a second rejection of the same
                // kind surfaces so a systemic outage is not misreported as a
                // crowd of independent item failures.
                let (token, _) = self.session.refresh(generation).await?;
                self.call(operation, value, &token).await
            }
            other => other,
        }
    }

    async fn call(
        &self,
        operation: TransformOperation,
        value: &str,
        token: &SecretString,
    ) -> Result<String> {
        let url = self.endpoint_url(operation);

        let mut request = self
            .http
            .post(&url)
            .header("X-Vault-Token", token.expose_secret())
            .json(&serde_json::json!({
                "value": value,
                "transformation": self.config.transformation,
            }));
        if let Some(namespace) = &self.config.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransformError::unavailable(format!(
                    "Vault call timed out after {}s",
                    self.config.timeout_seconds
                ))
            } else {
                TransformError::unavailable(format!("Vault request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let body: TransformResponse = response.json().await.map_err(|e| {
            TransformError::unavailable(format!("malformed Vault transform response: {}", e))
        })?;

        let result = match operation {
            TransformOperation::Encode => body.data.encoded_value,
            TransformOperation::Decode => body.data.decoded_value,
        };

        result.ok_or_else(|| {
            TransformError::unavailable(format!(
                "Vault transform response missing '{}'",
                operation.result_field()
            ))
        })
    }
}

#[async_trait]
impl TransformBackend for VaultTransformClient {
    async fn transform(&self, operation: TransformOperation, value: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            match self.transform_once(operation, value).await {
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS << attempt);
                    debug!(
                        operation = %operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying transient Vault failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Map a non-2xx Vault status to the transform error taxonomy.
///
/// The diagnostic keeps only Vault's `errors` array and the status code, never
/// the raw body, so backend topology is not leaked into reply markers.
fn classify_status(status: StatusCode, body: &str) -> TransformError {
    let detail = match serde_json::from_str::<VaultErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => {
            format!("{} (status {})", parsed.errors.join("; "), status.as_u16())
        }
        _ => format!("Vault returned status {}", status.as_u16()),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TransformError::unauthenticated(detail)
        }
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            TransformError::rejected(detail)
        }
        _ => TransformError::unavailable(detail),
    }
}
