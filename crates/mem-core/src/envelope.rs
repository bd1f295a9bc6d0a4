//! Uniform success/failure response envelope (C8).

use std::time::Instant;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The machine-readable error classification attached to a failed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    ValidationError,
    ConnectionError,
    TimeoutError,
    ServerError,
    ClientError,
    NotFoundError,
    AuthenticationError,
    ExecutionError,
    UnknownError,
}

/// The response shape every tool operation returns to the transport.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
}

impl Envelope {
    #[must_use]
    pub fn ok(message: impl Into<String>, data: Value, duration: Instant) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            metadata: Some(duration_metadata(duration, Value::Null)),
            error: None,
            error_type: None,
        }
    }

    #[must_use]
    pub fn ok_with_metadata(
        message: impl Into<String>,
        data: Value,
        duration: Instant,
        extra_metadata: Value,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            metadata: Some(duration_metadata(duration, extra_metadata)),
            error: None,
            error_type: None,
        }
    }

    /// Build a generic error response, defaulting `error_type` to
    /// `UnknownError` and `error` to `message`.
    #[must_use]
    pub fn error_response(message: impl Into<String>, error_type: Option<ErrorType>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: message.clone(),
            data: None,
            metadata: None,
            error: Some(message),
            error_type: Some(error_type.unwrap_or(ErrorType::UnknownError)),
        }
    }

    #[must_use]
    pub fn validation_error(message: impl Into<String>, details: Option<Value>) -> Self {
        let mut envelope = Self::error_response(message, Some(ErrorType::ValidationError));
        if let Some(details) = details {
            envelope.metadata = Some(serde_json::json!({ "validation_details": details }));
        }
        envelope
    }

    #[must_use]
    pub fn not_found_error(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        Self::error_response(format!("{resource} not found"), Some(ErrorType::NotFoundError))
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

fn duration_metadata(start: Instant, extra: Value) -> Value {
    let duration_ms = u128_to_json(start.elapsed().as_millis());
    match extra {
        Value::Object(mut map) => {
            map.insert("duration_ms".to_string(), duration_ms);
            Value::Object(map)
        }
        Value::Null => serde_json::json!({ "duration_ms": duration_ms }),
        other => serde_json::json!({ "duration_ms": duration_ms, "extra": other }),
    }
}

fn u128_to_json(value: u128) -> Value {
    Value::Number(serde_json::Number::from(u64::try_from(value).unwrap_or(u64::MAX)))
}
