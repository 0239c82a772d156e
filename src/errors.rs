use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use tracing::{error, warn};

/// Error envelope returned to the client on any failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required input field is missing or unusable. No provider call is
    /// made when this is raised.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A provider call failed at the network or service level. `details`
    /// carries the provider's own diagnostic payload when one was returned,
    /// so callers can tell "unreachable" apart from "rejected input".
    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The provider answered successfully but the payload does not parse
    /// into the expected shape. Specific to quiz generation.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        ApiError::Upstream {
            message: message.into(),
            details,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ApiError::MalformedResponse(message.into())
    }
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub provider: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }
}

impl ApiError {
    /// Convert the error to an HTTP response with consistent structure and
    /// logging.
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ErrorBody>) {
        match self {
            ApiError::Validation(message) => {
                warn!(
                    operation = %context.operation,
                    error = %message,
                    "Validation error"
                );
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message)))
            }
            ApiError::Upstream { message, details } => {
                error!(
                    operation = %context.operation,
                    provider = ?context.provider,
                    error = %message,
                    details = ?details,
                    "Provider request failed"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    Json(ErrorBody {
                        error: message,
                        details,
                    }),
                )
            }
            ApiError::MalformedResponse(message) => {
                error!(
                    operation = %context.operation,
                    provider = ?context.provider,
                    error = %message,
                    "Provider returned unparseable data"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new(message)),
                )
            }
        }
    }
}
