//! BigQuery remote-function envelope parsing.
//!
//! Wire shape (camelCase JSON):
//!
//! ```json
//! {
//!   "requestId": "124ab1c",
//!   "caller": "//bigquery.googleapis.com/projects/p/jobs/j",
//!   "sessionUser": "user@example.com",
//!   "userDefinedContext": {"mode": "encrypt"},
//!   "calls": [["4111111111111111"], ["5555555555554444"]]
//! }
//! ```
//!
//! A missing or wrongly-typed `calls` field fails the whole request; a
//! well-typed tuple with the wrong arity or element type only fails its item.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::dispatch::{CallItem, TransformRequest};
use crate::transform::TransformOperation;

/// Context key carrying the operation hint.
const MODE_KEY: &str = "mode";

/// Raw inbound envelope as sent by BigQuery.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFunctionRequest {
    #[serde(default)]
    pub request_id: Option<String>,

    /// Audit-only; passed through to the request span, never interpreted.
    #[serde(default)]
    pub caller: Option<String>,

    /// Audit-only; passed through to the request span, never interpreted.
    #[serde(default)]
    pub session_user: Option<String>,

    /// Context map configured on the remote function definition.
    #[serde(default)]
    pub user_defined_context: HashMap<String, String>,

    /// Ordered call tuples; arity is validated per item, not here.
    pub calls: Vec<Vec<Value>>,
}

impl RemoteFunctionRequest {
    /// Resolve the batch operation from the user-defined context.
    ///
    /// An absent `mode` defaults to encode; an unrecognized value is rejected
    /// at the request level rather than silently defaulting, so a typo in the
    /// remote function definition is caught before any backend call.
    pub fn resolve_operation(&self) -> Result<TransformOperation, String> {
        match self.user_defined_context.get(MODE_KEY).map(String::as_str) {
            None => Ok(TransformOperation::Encode),
            Some("encrypt") => Ok(TransformOperation::Encode),
            Some("decrypt") => Ok(TransformOperation::Decode),
            Some(other) => Err(format!(
                "unrecognized mode '{}'; expected 'encrypt' or 'decrypt'",
                other
            )),
        }
    }

    /// Convert into the dispatcher's request model with the operation fixed.
    pub fn into_transform_request(self, operation: TransformOperation) -> TransformRequest {
        TransformRequest {
            request_id: self.request_id,
            caller: self.caller,
            session_user: self.session_user,
            operation,
            items: self.calls.into_iter().map(CallItem::new).collect(),
        }
    }
}
