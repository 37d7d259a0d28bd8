pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers as interview;
use crate::resume::handlers as resume;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Mock interview API
        .route("/api/v1/interviews", post(interview::handle_start_interview))
        .route("/api/v1/interviews/:id", get(interview::handle_get_interview))
        .route(
            "/api/v1/interviews/:id/answers",
            post(interview::handle_submit_answer),
        )
        // Resume analysis API
        .route("/api/v1/resumes/analyze", post(resume::handle_analyze))
        .route("/api/v1/resumes/upload", post(resume::handle_upload))
        .route("/api/v1/resumes/latest", get(resume::handle_latest))
        .route("/api/v1/resumes/history", get(resume::handle_history))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::ai_gateway::testing::{gateway_with, healthy_provider, Reply, ScriptedProvider};
    use crate::ai_gateway::ProviderError;
    use crate::config::Config;
    use crate::errors::AI_UNAVAILABLE_MESSAGE;
    use crate::interview::orchestrator::AI_FAILURE_REASON;
    use crate::interview::Orchestrator;
    use crate::resume::ResumeAnalyzer;
    use crate::store::MemoryStore;

    fn app_with(provider: ScriptedProvider) -> Router {
        let mut env = HashMap::new();
        env.insert("MOCK_INTERVIEW_MAX_QUESTIONS", "3");
        env.insert("MOCK_INTERVIEW_MIN_QUESTIONS", "2");
        env.insert("RESUME_MIN_CHARS", "40");
        let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();

        let gateway = gateway_with(vec![Arc::new(provider)]);
        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            orchestrator: Arc::new(Orchestrator::new(
                gateway.clone(),
                store.clone(),
                config.interview,
            )),
            analyzer: Arc::new(ResumeAnalyzer::new(gateway, store, config.resume_min_chars)),
            config,
        };
        build_router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(healthy_provider("primary"));
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["interview"]["max_questions"], 3);
    }

    #[tokio::test]
    async fn test_interview_round_trip() {
        let app = app_with(healthy_provider("primary"));
        let (status, started) = send(
            &app,
            "POST",
            "/api/v1/interviews",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "track": "technical",
                "role": "Backend Engineer",
                "skills": ["rust", " "]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(started["stage"], "introduction");
        assert_eq!(started["session"]["skills"], json!(["rust"]));
        let id = started["session"]["id"].as_str().unwrap().to_string();
        let answers = format!("/api/v1/interviews/{id}/answers");

        let (status, body) = send(&app, "POST", &answers, Some(json!({ "answer": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        for _ in 0..3 {
            let (status, _) = send(
                &app,
                "POST",
                &answers,
                Some(json!({ "answer": "I built a queue that improved throughput by 2x." })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, detail) = send(&app, "GET", &format!("/api/v1/interviews/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["session"]["status"], "completed");
        assert_eq!(detail["report"]["overall_score"], 80);

        let (status, body) = send(&app, "POST", &answers, Some(json!({ "answer": "one more" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_unknown_interview_is_404() {
        let app = app_with(healthy_provider("primary"));
        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/v1/interviews/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_ai_outage_returns_generic_503() {
        let app = app_with(ScriptedProvider::always(
            "primary",
            Reply::Fail(ProviderError::Rejected {
                status: 401,
                message: "API key not valid".into(),
            }),
        ));
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/resumes/analyze",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "text": "Backend engineer with five years of Rust and PostgreSQL experience."
            })),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "AI_UNAVAILABLE");
        assert_eq!(body["error"]["message"], AI_UNAVAILABLE_MESSAGE);
        assert!(!body.to_string().contains("API key"));
    }

    #[tokio::test]
    async fn test_failed_interview_detail_is_generic() {
        let app = app_with(ScriptedProvider::with("gemini", |call, _| {
            if call == 0 {
                Reply::text("Thanks for joining. Could you walk me through your background?")
            } else {
                Reply::Fail(ProviderError::Rejected {
                    status: 401,
                    message: "API key not valid. Please pass a valid API key.".into(),
                })
            }
        }));
        let (_, started) = send(
            &app,
            "POST",
            "/api/v1/interviews",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "track": "hr",
                "role": "Analyst",
                "skills": []
            })),
        )
        .await;
        let id = started["session"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/interviews/{id}/answers"),
            Some(json!({ "answer": "I led the quarterly reporting rollout." })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["message"], AI_UNAVAILABLE_MESSAGE);

        let (status, detail) = send(&app, "GET", &format!("/api/v1/interviews/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["session"]["status"], "failed");
        assert_eq!(detail["session"]["failure_reason"], AI_FAILURE_REASON);
        let text = detail.to_string();
        assert!(!text.contains("API key"));
        assert!(!text.contains("gemini"));
    }

    #[tokio::test]
    async fn test_resume_analyze_then_latest() {
        let app = app_with(healthy_provider("primary"));
        let user = Uuid::new_v4();

        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/v1/resumes/latest?user_id={user}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/resumes/analyze",
            Some(json!({
                "user_id": user,
                "text": "Backend engineer with five years of Rust and PostgreSQL experience."
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["ats_score"], 75);
        assert_eq!(body["band"], "good");

        let (status, latest) = send(
            &app,
            "GET",
            &format!("/api/v1/resumes/latest?user_id={user}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["analysis"]["id"], body["analysis"]["id"]);
    }

    #[tokio::test]
    async fn test_short_resume_is_rejected() {
        let app = app_with(healthy_provider("primary"));
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/resumes/analyze",
            Some(json!({ "user_id": Uuid::new_v4(), "text": "Too short." })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("too short"));
    }

    #[tokio::test]
    async fn test_resume_history_lists_newest_first() {
        let app = app_with(healthy_provider("primary"));
        let user = Uuid::new_v4();
        let history = format!("/api/v1/resumes/history?user_id={user}");

        let (status, empty) = send(&app, "GET", &history, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(empty, json!([]));

        let text = "Backend engineer with five years of Rust and PostgreSQL experience.";
        let (_, first) = send(
            &app,
            "POST",
            "/api/v1/resumes/analyze",
            Some(json!({ "user_id": user, "text": text })),
        )
        .await;
        let (status, targeted) = send(
            &app,
            "POST",
            "/api/v1/resumes/analyze",
            Some(json!({
                "user_id": user,
                "text": text,
                "target_role": "Backend Engineer",
                "target_skills": ["Rust", "Kafka"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(targeted["analysis"]["breakdown"]["keyword_match"], 50);
        assert_eq!(targeted["analysis"]["missing_keywords"], json!(["Kafka"]));

        let (status, list) = send(&app, "GET", &history, None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["analysis"]["id"], targeted["analysis"]["id"]);
        assert_eq!(list[1]["analysis"]["id"], first["analysis"]["id"]);
        assert_eq!(list[1]["analysis"]["highlights"], json!(["Quantified latency improvement"]));
    }
}
