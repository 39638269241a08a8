//! Batch dispatch: one inbound envelope to many backend calls.
//!
//! The dispatcher owns the request/reply lifecycle for a single invocation.
//! It holds no state across invocations; the only cross-request state is the
//! session credential inside the backend.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::transform::{TransformBackend, TransformOperation};

/// One call tuple from the remote-function envelope.
///
/// The wire format allows arbitrary JSON arrays here; validation to the
/// one-string-argument contract happens per item so a malformed tuple never
/// fails the batch.
#[derive(Debug, Clone)]
pub struct CallItem(Vec<Value>);

impl CallItem {
    pub fn new(raw: Vec<Value>) -> Self {
        Self(raw)
    }

    /// The single string argument, or a reason the tuple is malformed.
    pub fn argument(&self) -> std::result::Result<&str, String> {
        match self.0.as_slice() {
            [Value::String(value)] => Ok(value),
            [] => Err("call tuple is empty; expected exactly one argument".to_string()),
            [other] => Err(format!(
                "call argument must be a string, got {}",
                json_type_name(other)
            )),
            many => Err(format!(
                "call tuple has {} elements; expected exactly one",
                many.len()
            )),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A parsed, validated batch request with its operation resolved.
#[derive(Debug)]
pub struct TransformRequest {
    /// Opaque trace token from the caller, if provided.
    pub request_id: Option<String>,
    /// Audit-only caller identity, passed through uninterpreted.
    pub caller: Option<String>,
    /// Audit-only session user, passed through uninterpreted.
    pub session_user: Option<String>,
    /// Uniform operation for the whole batch.
    pub operation: TransformOperation,
    /// Ordered call tuples.
    pub items: Vec<CallItem>,
}

/// Reply envelope: always the same length and order as the request items.
#[derive(Debug, Serialize)]
pub struct TransformReply {
    pub replies: Vec<String>,
}

/// Serialize a per-item failure as a tagged marker string.
///
/// The upstream protocol requires exactly one reply string per call with no
/// structured per-item status, so failures are encoded as
/// `ERROR[<kind>]: <message>` and the caller distinguishes categories by tag.
pub fn failure_marker(kind: &str, message: &str) -> String {
    format!("ERROR[{}]: {}", kind, message)
}

/// Failure-kind tag for items violating the one-argument contract.
pub const MALFORMED_ITEM_KIND: &str = "malformed_item";

/// Dispatches batch items to the transform backend with bounded concurrency.
pub struct BatchDispatcher {
    backend: Arc<dyn TransformBackend>,
    parallelism: usize,
}

impl BatchDispatcher {
    pub fn new(backend: Arc<dyn TransformBackend>, parallelism: usize) -> Self {
        Self { backend, parallelism: parallelism.max(1) }
    }

    /// Process every item and assemble the reply in input order.
    ///
    /// Items run concurrently up to the parallelism limit; ordering is
    /// established by input position, not completion time. One item's failure
    /// never aborts the rest, and every input slot gets exactly one reply.
    pub async fn dispatch(&self, request: &TransformRequest) -> TransformReply {
        let operation = request.operation;

        let replies = stream::iter(request.items.iter().cloned().enumerate())
            .map(|(position, item)| {
                let backend = Arc::clone(&self.backend);
                async move {
                    match item.argument() {
                        Ok(value) => match backend.transform(operation, value).await {
                            Ok(transformed) => transformed,
                            Err(err) => {
                                debug!(position, kind = err.kind(), "Item transform failed");
                                failure_marker(err.kind(), &err.to_string())
                            }
                        },
                        Err(reason) => {
                            debug!(position, "Malformed call item");
                            failure_marker(MALFORMED_ITEM_KIND, &reason)
                        }
                    }
                }
            })
            .buffered(self.parallelism)
            .collect::<Vec<String>>()
            .await;

        TransformReply { replies }
    }
}
