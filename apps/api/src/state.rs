use std::sync::Arc;

use crate::config::Config;
use crate::interview::Orchestrator;
use crate::resume::ResumeAnalyzer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub analyzer: Arc<ResumeAnalyzer>,
    pub config: Config,
}
