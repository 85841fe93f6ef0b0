//! Wire types shared by every gateway endpoint.
//!
//! Gateway responses are JSON objects of the form
//! `{ "code": <int>, "message": <string>?, "data": <any>? }`. Only `code`
//! decides the outcome; HTTP status is ignored once a body has been parsed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::code::classify;
use crate::error::GatewayError;

/// Extracts the integer `code` from a gateway response body.
#[must_use]
pub fn response_code(body: &Value) -> Option<i64> {
    body.get("code").and_then(Value::as_i64)
}

/// Extracts a non-empty `message` from a gateway response body.
#[must_use]
pub fn response_message(body: &Value) -> Option<&str> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
}

/// Classified outcome of a gateway call.
///
/// A failure code is still an `ApiResult` (with `success == false`), not an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    /// Derived solely from `code`.
    pub success: bool,
    /// The gateway response code.
    pub code: i64,
    /// Gateway message when present, otherwise the classifier message.
    pub message: String,
    /// The response `data` field, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// The complete response body.
    pub raw: Value,
}

impl ApiResult {
    /// Classifies a parsed gateway response body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the body has no integer `code`.
    pub fn from_response(body: Value) -> Result<Self, GatewayError> {
        let code = response_code(&body).ok_or_else(|| {
            GatewayError::Transport(format!("malformed gateway response: missing code in {body}"))
        })?;
        let classification = classify(code);
        let message = response_message(&body)
            .map_or(classification.message, str::to_owned);
        let data = body.get("data").filter(|d| !d.is_null()).cloned();
        Ok(Self {
            success: classification.success,
            code,
            message,
            data,
            raw: body,
        })
    }

    /// Looks up a field of `data`.
    #[must_use]
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}
