//! HTTP handlers for the remote-function endpoints.

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::{info, Instrument};

use crate::batch_span;
use crate::dispatch::TransformReply;
use crate::transform::TransformOperation;

use super::envelope::RemoteFunctionRequest;
use super::error::ApiError;
use super::routes::ApiState;

/// Operation resolved from the user-defined context (`mode` key).
pub async fn transform_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RemoteFunctionRequest>, JsonRejection>,
) -> Result<Json<TransformReply>, ApiError> {
    handle_batch(state, payload, None).await
}

/// Operation pinned to encode by the path; context mode is ignored.
pub async fn encrypt_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RemoteFunctionRequest>, JsonRejection>,
) -> Result<Json<TransformReply>, ApiError> {
    handle_batch(state, payload, Some(TransformOperation::Encode)).await
}

/// Operation pinned to decode by the path; context mode is ignored.
pub async fn decrypt_handler(
    State(state): State<ApiState>,
    payload: Result<Json<RemoteFunctionRequest>, JsonRejection>,
) -> Result<Json<TransformReply>, ApiError> {
    handle_batch(state, payload, Some(TransformOperation::Decode)).await
}

/// Liveness probe.
pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

async fn handle_batch(
    state: ApiState,
    payload: Result<Json<RemoteFunctionRequest>, JsonRejection>,
    pinned: Option<TransformOperation>,
) -> Result<Json<TransformReply>, ApiError> {
    let Json(envelope) = payload.map_err(|rejection| {
        ApiError::MalformedRequest(format!("invalid request envelope: {}", rejection))
    })?;

    let operation = match pinned {
        Some(operation) => operation,
        None => envelope.resolve_operation().map_err(ApiError::MalformedRequest)?,
    };

    let request = envelope.into_transform_request(operation);

    let span = batch_span!(operation, request.request_id);
    if let Some(caller) = &request.caller {
        span.record("caller", caller.as_str());
    }
    if let Some(session_user) = &request.session_user {
        span.record("session_user", session_user.as_str());
    }

    async {
        info!(batch_size = request.items.len(), "Dispatching transform batch");
        let reply = state.dispatcher.dispatch(&request).await;

        // The length contract is structural in the dispatcher; this is the
        // last place to notice a violation before it reaches the caller.
        debug_assert_eq!(reply.replies.len(), request.items.len());

        Ok(Json(reply))
    }
    .instrument(span)
    .await
}
