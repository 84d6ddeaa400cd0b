//! JSON error envelope

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::domain::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    UpstreamError,
    ServiceUnavailableError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::ServiceUnavailableError => write!(f, "service_unavailable_error"),
        }
    }
}

/// Body of every error response: `{"error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    code: None,
                },
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    /// A language model or search backend failed
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, ApiErrorType::UpstreamError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorType::ServiceUnavailableError,
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

/// Stage failures keep their cause in the logs and show the stable user message
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let code = err.stage().as_str();
        match &err {
            PipelineError::InvalidRequest(_) => Self::bad_request(err.user_message()).with_code(code),
            PipelineError::Classification(_) | PipelineError::Generation(_) | PipelineError::Verification(_) => {
                Self::bad_gateway(err.user_message()).with_code(code)
            }
            PipelineError::Cancelled => Self::unavailable(err.user_message()).with_code(code),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.response.error.error_type, self.response.error.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, GENERATION_FAILED_MESSAGE};

    #[test]
    fn test_invalid_request_maps_to_400() {
        let err: ApiError = PipelineError::invalid_request("expected 2 weights, got 3").into();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.response.error.message,
            "Your question could not be processed: expected 2 weights, got 3"
        );
        assert_eq!(err.response.error.code.as_deref(), Some("invalid_request"));
    }

    #[test]
    fn test_stage_failure_hides_provider_details() {
        let err: ApiError = PipelineError::Generation(DomainError::provider("groq", "secret upstream body")).into();

        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.response.error.message, GENERATION_FAILED_MESSAGE);
        assert_eq!(err.response.error.code.as_deref(), Some("generation"));
    }

    #[test]
    fn test_cancelled_maps_to_503() {
        let err: ApiError = PipelineError::Cancelled.into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_stage_code_is_serialized() {
        let err: ApiError = PipelineError::Verification(DomainError::timeout("verify", 500)).into();
        let json = serde_json::to_value(&err.response).unwrap();

        assert_eq!(json["error"]["code"], "verification");
        assert_eq!(json["error"]["type"], "upstream_error");
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::unavailable("No retrieval sources configured");
        let json = serde_json::to_string(&err.response).unwrap();

        assert!(json.contains("\"type\":\"service_unavailable_error\""));
        assert!(json.contains("No retrieval sources configured"));
    }
}
