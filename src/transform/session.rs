//! Vault session credential handling.
//!
//! The session token is the only state shared across requests. It lives
//! behind a [`tokio::sync::RwLock`] for cheap concurrent reads, and refresh is
//! funneled through a single mutex so that many items failing authentication
//! at once trigger exactly one login round trip; late arrivals observe the
//! bumped generation and reuse the freshly minted token.

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::error::{Result, TransformError};
use super::types::SecretString;

/// How the session authenticates to Vault.
#[derive(Debug, Clone)]
pub enum VaultCredentials {
    /// A pre-issued token. Cannot be re-minted; an expiry surfaces as
    /// `Unauthenticated` to the caller.
    Token(SecretString),

    /// AppRole login credentials. Expired session tokens are replaced by a
    /// `POST /v1/auth/approle/login` round trip.
    AppRole { role_id: String, secret_id: SecretString },
}

struct TokenState {
    token: SecretString,
    generation: u64,
}

/// Authenticated Vault session with single-flight refresh.
pub struct VaultSession {
    http: reqwest::Client,
    address: String,
    namespace: Option<String>,
    credentials: VaultCredentials,
    state: RwLock<Option<TokenState>>,
    refresh_gate: Mutex<()>,
}

#[derive(Deserialize)]
struct AppRoleLoginResponse {
    auth: AppRoleAuth,
}

#[derive(Deserialize)]
struct AppRoleAuth {
    client_token: String,
}

impl VaultSession {
    /// Creates a session handle. AppRole sessions log in lazily on first use;
    /// token sessions are usable immediately.
    pub fn new(
        http: reqwest::Client,
        address: impl Into<String>,
        namespace: Option<String>,
        credentials: VaultCredentials,
    ) -> Self {
        let seed = match &credentials {
            VaultCredentials::Token(token) => {
                Some(TokenState { token: token.clone(), generation: 1 })
            }
            VaultCredentials::AppRole { .. } => None,
        };

        Self {
            http,
            address: address.into().trim_end_matches('/').to_string(),
            namespace,
            credentials,
            state: RwLock::new(seed),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Returns the current session token and its generation counter.
    ///
    /// Callers keep the generation so a later [`VaultSession::refresh`] can
    /// tell whether the token they failed with has already been replaced.
    pub async fn current(&self) -> Result<(SecretString, u64)> {
        {
            let state = self.state.read().await;
            if let Some(s) = state.as_ref() {
                return Ok((s.token.clone(), s.generation));
            }
        }
        self.refresh(0).await
    }

    /// Replaces the session token, unless another caller already did.
    ///
    /// `seen_generation` is the generation the caller failed with; if the
    /// stored generation has moved past it, the existing token is returned
    /// without another login round trip.
    pub async fn refresh(&self, seen_generation: u64) -> Result<(SecretString, u64)> {
        let _gate = self.refresh_gate.lock().await;

        {
            let state = self.state.read().await;
            if let Some(s) = state.as_ref() {
                if s.generation != seen_generation {
                    return Ok((s.token.clone(), s.generation));
                }
            }
        }

        let token = match &self.credentials {
            VaultCredentials::Token(_) => {
                return Err(TransformError::unauthenticated(
                    "static Vault token was rejected and no login credentials are configured",
                ));
            }
            VaultCredentials::AppRole { role_id, secret_id } => {
                self.approle_login(role_id, secret_id).await?
            }
        };

        let mut state = self.state.write().await;
        let generation = state.as_ref().map(|s| s.generation).unwrap_or(0) + 1;
        *state = Some(TokenState { token: token.clone(), generation });
        info!(generation, "Vault session token refreshed");
        Ok((token, generation))
    }

    async fn approle_login(&self, role_id: &str, secret_id: &SecretString) -> Result<SecretString> {
        let url = format!("{}/v1/auth/approle/login", self.address);

        let mut request = self.http.post(&url).json(&serde_json::json!({
            "role_id": role_id,
            "secret_id": secret_id.expose_secret(),
        }));
        if let Some(namespace) = &self.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "AppRole login request failed");
            if e.is_timeout() {
                TransformError::unavailable("AppRole login timed out")
            } else {
                TransformError::unavailable(format!("AppRole login request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "AppRole login rejected by Vault");
            return if status.is_server_error() {
                Err(TransformError::unavailable(format!(
                    "Vault returned status {} during AppRole login",
                    status.as_u16()
                )))
            } else {
                Err(TransformError::unauthenticated(format!(
                    "AppRole login denied with status {}",
                    status.as_u16()
                )))
            };
        }

        let body: AppRoleLoginResponse = response.json().await.map_err(|e| {
            TransformError::unavailable(format!("malformed AppRole login response: {}", e))
        })?;

        Ok(SecretString::new(body.auth.client_token))
    }
}
