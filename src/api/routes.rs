use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::dispatch::BatchDispatcher;

use super::handlers::{decrypt_handler, encrypt_handler, health_handler, transform_handler};

/// Shared handler state: the dispatcher (which owns the backend).
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<BatchDispatcher>,
}

pub fn build_router(dispatcher: Arc<BatchDispatcher>) -> Router {
    Router::new()
        .route("/transform", post(transform_handler))
        .route("/encrypt", post(encrypt_handler))
        .route("/decrypt", post(decrypt_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { dispatcher })
}
