use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai_gateway::AiError;
use crate::interview::InterviewError;
use crate::resume::AnalysisError;
use crate::store::StoreError;

/// Shown to clients whenever the provider chain fails. Provider detail is logged only.
pub const AI_UNAVAILABLE_MESSAGE: &str =
    "The AI service is unavailable right now, please try again.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("AI unavailable: {0}")]
    AiUnavailable(#[from] AiError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => AppError::NotFound(format!("{entity} {id}")),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Store(other),
        }
    }
}

impl From<InterviewError> for AppError {
    fn from(e: InterviewError) -> Self {
        match e {
            InterviewError::NotFound(id) => AppError::NotFound(format!("interview session {id}")),
            InterviewError::InvalidTransition(t) => AppError::Conflict(t.to_string()),
            e @ InterviewError::Busy(_) => AppError::Conflict(e.to_string()),
            e @ (InterviewError::EmptyAnswer | InterviewError::FinishTooEarly { .. }) => {
                AppError::Validation(e.to_string())
            }
            InterviewError::Ai(e) => AppError::AiUnavailable(e),
            InterviewError::Store(e) => e.into(),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            e @ (AnalysisError::Empty
            | AnalysisError::TooShort { .. }
            | AnalysisError::UnsupportedFormat(_)) => AppError::Validation(e.to_string()),
            e @ AnalysisError::Extraction { .. } => AppError::UnprocessableEntity(e.to_string()),
            AnalysisError::Ai(e) => AppError::AiUnavailable(e),
            AnalysisError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::AiUnavailable(e) => {
                tracing::error!("AI error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AI_UNAVAILABLE",
                    AI_UNAVAILABLE_MESSAGE.to_string(),
                )
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_errors_hide_provider_detail() {
        let err: AppError = InterviewError::Ai(AiError::Rejected {
            provider: "gemini".into(),
            status: 401,
            message: "API key not valid".into(),
        })
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_store_conflict_maps_to_409() {
        let err: AppError = StoreError::Conflict("already completed".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_too_short_resume_is_bad_request() {
        let err: AppError = AnalysisError::TooShort {
            length: 10,
            minimum: 200,
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
