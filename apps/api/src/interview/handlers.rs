//! Axum route handlers for the Mock Interview API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AnswerOutcome;
use crate::errors::AppError;
use crate::models::interview::{InterviewReport, InterviewSession, Track};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    pub user_id: Uuid,
    pub track: Track,
    pub role: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StartInterviewResponse {
    pub session: InterviewSession,
    pub question: String,
    pub stage: String,
}

#[derive(Debug, Serialize)]
pub struct InterviewDetailResponse {
    pub session: InterviewSession,
    pub report: Option<InterviewReport>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
    #[serde(default)]
    pub finish: bool,
}

/// POST /api/v1/interviews
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Json(request): Json<StartInterviewRequest>,
) -> Result<(StatusCode, Json<StartInterviewResponse>), AppError> {
    let role = request.role.trim();
    if role.is_empty() {
        return Err(AppError::Validation("role cannot be empty".to_string()));
    }
    let skills: Vec<String> = request
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let session = state
        .orchestrator
        .start(request.user_id, request.track, role.to_string(), skills)
        .await?;

    let (question, stage) = session
        .pending_question()
        .map(|t| (t.text.clone(), t.stage.clone().unwrap_or_default()))
        .unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(StartInterviewResponse {
            session,
            question,
            stage,
        }),
    ))
}

/// GET /api/v1/interviews/:id
///
/// The session with its transcript, plus the report once completed.
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewDetailResponse>, AppError> {
    let (session, report) = state.orchestrator.get(id).await?;
    Ok(Json(InterviewDetailResponse { session, report }))
}

/// POST /api/v1/interviews/:id/answers
///
/// Blocks until the answer is evaluated and either the next question or the
/// final report is ready.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerOutcome>, AppError> {
    let outcome = state
        .orchestrator
        .submit_answer(id, &request.answer, request.finish)
        .await?;
    Ok(Json(outcome))
}
