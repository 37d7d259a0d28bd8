use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and interview limits.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "elevo-api",
        "interview": {
            "max_questions": state.config.interview.turn_budget,
            "min_questions": state.config.interview.min_answers_to_finish
        }
    }))
}
