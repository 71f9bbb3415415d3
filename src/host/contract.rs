//! Wire envelopes for the stdio host.
//!
//! Request: `{"id": "...", "tool": "catalog_search", "args": {...}}`
//!
//! Response: `{"id": "...", "ok": true, "result": {...}}` or
//! `{"id": "...", "ok": false, "error": {"code": "...", "message": "..."}}`

use serde::{Deserialize, Serialize};

use crate::error::QuarryError;

/// Reserved tool name that lists the registered tools.
pub const LIST_TOOLS: &str = "tools.list";

/// Request id used when a line could not be parsed.
pub const PARSE_ERROR_ID: &str = "parse-error";

/// One tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Caller-chosen id echoed in the response.
    pub id: String,
    /// Tool name.
    pub tool: String,
    /// Tool arguments.
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Reply to one [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Id of the call this answers.
    pub id: String,
    /// Whether the tool succeeded.
    pub ok: bool,
    /// Tool output on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Failure details otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ToolResponse {
    /// Build a successful response.
    #[must_use]
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response with an explicit code.
    #[must_use]
    pub fn failure(id: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: code.to_owned(),
                message: message.into(),
            }),
        }
    }

    /// Build an error response from a [`QuarryError`].
    #[must_use]
    pub fn from_error(id: impl Into<String>, err: &QuarryError) -> Self {
        Self::failure(id, err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_args_default_to_null() {
        let call: ToolCall =
            serde_json::from_str(r#"{"id":"1","tool":"backend_status"}"#).expect("parse");
        assert_eq!(call.args, serde_json::Value::Null);
    }

    #[test]
    fn ok_response_omits_error() {
        let json = serde_json::to_value(ToolResponse::ok("1", json!({"items": []})))
            .expect("serialize");
        assert_eq!(json, json!({"id": "1", "ok": true, "result": {"items": []}}));
    }

    #[test]
    fn error_response_carries_code() {
        let err = QuarryError::SearchFailed("all search backends failed: x".into());
        let json = serde_json::to_value(ToolResponse::from_error("7", &err)).expect("serialize");
        assert_eq!(
            json,
            json!({
                "id": "7",
                "ok": false,
                "error": { "code": "SEARCH_FAILED", "message": "all search backends failed: x" }
            })
        );
    }
}
