//! Axum route handlers for the Resume Analysis API.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::extract_text_blocking;
use crate::ai_gateway::ResumeTarget;
use crate::errors::AppError;
use crate::models::resume::{ResumeAnalysis, ScoreBand};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeResumeRequest {
    pub user_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub target_role: Option<String>,
    #[serde(default)]
    pub target_skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: ResumeAnalysis,
    pub band: ScoreBand,
    pub summary: &'static str,
}

impl From<ResumeAnalysis> for AnalysisResponse {
    fn from(analysis: ResumeAnalysis) -> Self {
        let band = analysis.band();
        Self {
            analysis,
            band,
            summary: band.summary(),
        }
    }
}

/// POST /api/v1/resumes/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeResumeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let target = ResumeTarget::new(request.target_role, request.target_skills);
    let analysis = state
        .analyzer
        .analyze(request.user_id, &request.text, target)
        .await?;
    Ok(Json(analysis.into()))
}

/// POST /api/v1/resumes/upload
///
/// Multipart form with `user_id` and a `resume` file (.pdf or .txt). Optional
/// `target_role` and comma-separated `target_skills` text fields.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut target_role: Option<String> = None;
    let mut target_skills = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("user_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid user_id field: {e}")))?;
                let parsed = raw
                    .trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                user_id = Some(parsed);
            }
            Some("target_role") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid target_role field: {e}")))?;
                target_role = Some(raw);
            }
            Some("target_skills") => {
                target_skills = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid target_skills field: {e}")))?;
            }
            Some("resume") => {
                let filename = field.file_name().unwrap_or("resume.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid resume file: {e}")))?;
                file = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    let (filename, bytes) =
        file.ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;

    info!("Extracting resume text from {} ({} bytes)", filename, bytes.len());
    let text = extract_text_blocking(bytes, filename).await?;

    let target = ResumeTarget::from_fields(target_role, &target_skills);
    let analysis = state.analyzer.analyze(user_id, &text, target).await?;
    Ok(Json(analysis.into()))
}

/// GET /api/v1/resumes/latest?user_id=
pub async fn handle_latest(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let analysis = state
        .analyzer
        .latest(query.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no resume analysis for user {}", query.user_id)))?;
    Ok(Json(analysis.into()))
}

/// GET /api/v1/resumes/history?user_id=
///
/// Every analysis for the user, newest first. Empty when there are none.
pub async fn handle_history(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<AnalysisResponse>>, AppError> {
    let analyses = state.analyzer.history(query.user_id).await?;
    Ok(Json(analyses.into_iter().map(AnalysisResponse::from).collect()))
}
