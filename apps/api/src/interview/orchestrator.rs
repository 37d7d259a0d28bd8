use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::report::build_report;
use super::stages::{is_repetitive, response_quality, stage_for, REPEAT_WINDOW};
use super::InterviewError;
use crate::ai_gateway::{AiError, AiGateway, GeneratedQuestion, QuestionContext};
use crate::config::InterviewConfig;
use crate::models::interview::{
    InterviewReport, InterviewSession, InterviewStatus, InvalidTransition, Track, TurnEvaluation,
};
use crate::store::{InterviewStore, StoreError};

/// Stored on a session that failed because no AI provider could serve it.
pub const AI_FAILURE_REASON: &str = "ai_unavailable";

/// Result of one answer submission.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub session: InterviewSession,
    pub evaluation: TurnEvaluation,
    pub next_question: Option<String>,
    pub report: Option<InterviewReport>,
}

/// Drives sessions through `Created → InProgress → Completed | Failed`.
pub struct Orchestrator {
    gateway: AiGateway,
    store: Arc<dyn InterviewStore>,
    config: InterviewConfig,
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Marks a session as busy until dropped.
struct InFlight<'a> {
    sessions: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        sessions.remove(&self.id);
    }
}

impl Orchestrator {
    pub fn new(gateway: AiGateway, store: Arc<dyn InterviewStore>, config: InterviewConfig) -> Self {
        Self {
            gateway,
            store,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Creates the session and asks the opening question.
    pub async fn start(
        &self,
        user_ref: Uuid,
        track: Track,
        role: String,
        skills: Vec<String>,
    ) -> Result<InterviewSession, InterviewError> {
        let mut session = InterviewSession::new(user_ref, track, role, skills);
        self.store.insert_session(&session).await?;
        info!(
            "Interview {} created ({} track, role '{}')",
            session.id,
            track.as_str(),
            session.role
        );

        let _guard = self.claim(session.id)?;
        let (question, stage) = match self.next_question(&session, None).await {
            Ok(next) => next,
            Err(e) => return Err(self.fail(session, e).await),
        };

        session.push_question(question.text, stage);
        session.transition(InterviewStatus::InProgress)?;
        self.store.update_session(&session).await?;
        Ok(session)
    }

    pub async fn get(
        &self,
        id: Uuid,
    ) -> Result<(InterviewSession, Option<InterviewReport>), InterviewError> {
        let session = self.load(id).await?;
        let report = if session.status == InterviewStatus::Completed {
            self.store.get_report(id).await?
        } else {
            None
        };
        Ok((session, report))
    }

    /// Records and evaluates the answer to the pending question, then either asks
    /// the next question or completes the session with its report.
    pub async fn submit_answer(
        &self,
        id: Uuid,
        answer: &str,
        finish: bool,
    ) -> Result<AnswerOutcome, InterviewError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(InterviewError::EmptyAnswer);
        }

        let _guard = self.claim(id)?;
        let mut session = self.load(id).await?;
        if session.status != InterviewStatus::InProgress {
            return Err(InvalidTransition {
                from: session.status,
                to: InterviewStatus::InProgress,
            }
            .into());
        }
        let Some(question) = session.pending_question().map(|t| t.text.clone()) else {
            return Err(StoreError::Corrupt(format!(
                "interview {id} is in progress without a pending question"
            ))
            .into());
        };

        let answered = session.answered_count() + 1;
        if finish && answered < self.config.min_answers_to_finish {
            return Err(InterviewError::FinishTooEarly {
                answered,
                minimum: self.config.min_answers_to_finish,
            });
        }

        session.push_answer(answer.to_string());
        let scored = match self.gateway.evaluate_answer(&question, answer).await {
            Ok(scored) => scored,
            Err(e) => return Err(self.fail(session, e).await),
        };
        let evaluation = TurnEvaluation {
            score: scored.score,
            criteria: scored.criteria,
            feedback: scored.feedback,
            provider: scored.provider,
            quality: response_quality(answer),
        };
        session.evaluate_last_answer(evaluation.clone());

        if finish || answered >= self.config.turn_budget {
            session.transition(InterviewStatus::Completed)?;
            let report = build_report(&session);
            self.store.complete_session(&session, &report).await?;
            info!(
                "Interview {} completed after {} answer(s): overall {} ({})",
                id, answered, report.overall_score, report.band
            );
            return Ok(AnswerOutcome {
                session,
                evaluation,
                next_question: None,
                report: Some(report),
            });
        }

        let (next, stage) = match self.next_question(&session, Some(answer)).await {
            Ok(next) => next,
            Err(e) => return Err(self.fail(session, e).await),
        };
        session.push_question(next.text.clone(), stage);
        session.transition(InterviewStatus::InProgress)?;
        self.store.update_session(&session).await?;

        Ok(AnswerOutcome {
            session,
            evaluation,
            next_question: Some(next.text),
            report: None,
        })
    }

    fn claim(&self, id: Uuid) -> Result<InFlight<'_>, InterviewError> {
        let mut sessions = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if !sessions.insert(id) {
            return Err(InterviewError::Busy(id));
        }
        Ok(InFlight {
            sessions: &self.in_flight,
            id,
        })
    }

    async fn load(&self, id: Uuid) -> Result<InterviewSession, InterviewError> {
        self.store
            .get_session(id)
            .await?
            .ok_or(InterviewError::NotFound(id))
    }

    /// Asks for the next question, regenerating once if it repeats a recent one.
    async fn next_question(
        &self,
        session: &InterviewSession,
        latest_answer: Option<&str>,
    ) -> Result<(GeneratedQuestion, &'static str), AiError> {
        let number = session.questions_asked() + 1;
        let stage = stage_for(session.track, number);
        let mut context = QuestionContext {
            role: session.role.clone(),
            skills: session.skills.clone(),
            stage: stage.to_string(),
            question_number: number,
            turn_budget: self.config.turn_budget,
            latest_answer: latest_answer.map(str::to_string),
            recent_questions: session.recent_questions(REPEAT_WINDOW),
            avoid_repeat: false,
        };

        let question = self.gateway.generate_question(session.track, &context).await?;
        if !is_repetitive(&question.text, &context.recent_questions) {
            return Ok((question, stage));
        }

        warn!(
            "Interview {}: question {} repeats a recent one; regenerating",
            session.id, number
        );
        context.avoid_repeat = true;
        let retry = self.gateway.generate_question(session.track, &context).await?;
        if is_repetitive(&retry.text, &context.recent_questions) {
            warn!(
                "Interview {}: regenerated question {} is still close to a recent one",
                session.id, number
            );
        }
        Ok((retry, stage))
    }

    /// Moves the session to `Failed` and persists it. A store error here is logged
    /// so the AI error still reaches the caller.
    async fn fail(&self, mut session: InterviewSession, cause: AiError) -> InterviewError {
        error!("Interview {} failed: {}", session.id, cause);
        session.failure_reason = Some(AI_FAILURE_REASON.to_string());
        match session.transition(InterviewStatus::Failed) {
            Ok(()) => {
                if let Err(e) = self.store.update_session(&session).await {
                    error!("Could not persist failed interview {}: {}", session.id, e);
                }
            }
            Err(e) => warn!("Interview {}: {}", session.id, e),
        }
        InterviewError::Ai(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_gateway::prompts::{AVOID_REPEAT_INSTRUCTION, EVALUATOR_SYSTEM};
    use crate::ai_gateway::testing::{gateway_with, healthy_provider, Reply, ScriptedProvider};
    use crate::ai_gateway::ProviderError;
    use crate::models::interview::Speaker;
    use crate::store::MemoryStore;

    const EVALUATION: &str =
        r#"{"score": 70, "criteria": {"clarity": 70, "depth": 70}, "feedback": "Fine."}"#;

    fn orchestrator(
        provider: ScriptedProvider,
        turn_budget: usize,
        min_answers_to_finish: usize,
    ) -> (Orchestrator, Arc<MemoryStore>, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Orchestrator::new(
            gateway_with(vec![provider.clone()]),
            store.clone(),
            InterviewConfig {
                turn_budget,
                min_answers_to_finish,
            },
        );
        (orchestrator, store, provider)
    }

    async fn started(orchestrator: &Orchestrator) -> InterviewSession {
        orchestrator
            .start(
                Uuid::new_v4(),
                Track::Technical,
                "Backend Engineer".into(),
                vec!["rust".into(), "postgres".into()],
            )
            .await
            .unwrap()
    }

    const ANSWER: &str = "I designed and built the ingestion service, which cut latency by 30%.";

    #[tokio::test]
    async fn test_start_asks_introduction_question() {
        let (orchestrator, _, _) = orchestrator(healthy_provider("primary"), 5, 3);
        let session = started(&orchestrator).await;

        assert_eq!(session.status, InterviewStatus::InProgress);
        assert_eq!(session.transcript.len(), 1);
        assert_eq!(session.transcript[0].stage.as_deref(), Some("introduction"));
        assert!(session.pending_question().is_some());
    }

    #[tokio::test]
    async fn test_turn_budget_completes_with_one_report() {
        let (orchestrator, store, _) = orchestrator(healthy_provider("primary"), 5, 3);
        let session = started(&orchestrator).await;

        let mut last = None;
        for _ in 0..5 {
            last = Some(orchestrator.submit_answer(session.id, ANSWER, false).await.unwrap());
        }
        let last = last.unwrap();

        assert_eq!(last.session.status, InterviewStatus::Completed);
        assert!(last.next_question.is_none());
        let report = last.report.unwrap();
        assert_eq!(report.overall_score, 80);

        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InterviewStatus::Completed);
        let speakers: Vec<Speaker> = stored.transcript.iter().map(|t| t.speaker).collect();
        assert_eq!(speakers.len(), 10);
        assert!(speakers
            .chunks(2)
            .all(|pair| pair == [Speaker::Interviewer, Speaker::Candidate]));
        assert!(stored
            .transcript
            .iter()
            .filter(|t| t.speaker == Speaker::Candidate)
            .all(|t| t.evaluation.is_some()));
        assert_eq!(store.get_report(session.id).await.unwrap(), Some(report));
    }

    #[tokio::test]
    async fn test_completed_session_never_reopens() {
        let (orchestrator, store, _) = orchestrator(healthy_provider("primary"), 1, 1);
        let session = started(&orchestrator).await;
        orchestrator.submit_answer(session.id, ANSWER, false).await.unwrap();

        let err = orchestrator
            .submit_answer(session.id, ANSWER, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::InvalidTransition(InvalidTransition {
                from: InterviewStatus::Completed,
                ..
            })
        ));
        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.answered_count(), 1);
    }

    #[tokio::test]
    async fn test_ai_outage_fails_session() {
        let provider = ScriptedProvider::with("primary", |call, _| {
            if call == 0 {
                Reply::text("Could you walk me through your background?")
            } else {
                Reply::Fail(ProviderError::Transient("503".into()))
            }
        });
        let (orchestrator, store, _) = orchestrator(provider, 5, 3);
        let session = started(&orchestrator).await;

        let err = orchestrator
            .submit_answer(session.id, ANSWER, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::Ai(AiError::Unavailable { attempts: 2 })
        ));

        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InterviewStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some(AI_FAILURE_REASON));
        assert!(matches!(
            orchestrator.submit_answer(session.id, ANSWER, false).await,
            Err(InterviewError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_session_hides_provider_detail() {
        let provider = ScriptedProvider::with("gemini", |call, _| {
            if call == 0 {
                Reply::text("Could you walk me through your background?")
            } else {
                Reply::Fail(ProviderError::Rejected {
                    status: 401,
                    message: "API key not valid. Please pass a valid API key.".into(),
                })
            }
        });
        let (orchestrator, _, _) = orchestrator(provider, 5, 3);
        let session = started(&orchestrator).await;

        let err = orchestrator
            .submit_answer(session.id, ANSWER, false)
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::Ai(AiError::Rejected { .. })));

        let (failed, report) = orchestrator.get(session.id).await.unwrap();
        assert_eq!(failed.status, InterviewStatus::Failed);
        assert!(report.is_none());
        let body = serde_json::to_string(&failed).unwrap();
        assert!(body.contains(AI_FAILURE_REASON));
        for leaked in ["API key", "status 401", "rejected", "gemini"] {
            assert!(!body.contains(leaked), "session body leaks '{leaked}': {body}");
        }
    }

    #[tokio::test]
    async fn test_start_failure_surfaces_ai_error() {
        let provider = ScriptedProvider::always(
            "primary",
            Reply::Fail(ProviderError::Transient("timeout".into())),
        );
        let (orchestrator, _, provider) = orchestrator(provider, 5, 3);

        let result = orchestrator
            .start(Uuid::new_v4(), Track::Hr, "Analyst".into(), vec![])
            .await;

        assert!(matches!(result, Err(InterviewError::Ai(AiError::Unavailable { .. }))));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_submission_is_busy() {
        let (orchestrator, _, _) = orchestrator(healthy_provider("primary"), 5, 3);
        let session = started(&orchestrator).await;

        let held = orchestrator.claim(session.id).unwrap();
        assert!(matches!(
            orchestrator.submit_answer(session.id, ANSWER, false).await,
            Err(InterviewError::Busy(_))
        ));
        drop(held);
        assert!(orchestrator.submit_answer(session.id, ANSWER, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_early_finish_is_rejected_without_recording() {
        let (orchestrator, store, _) = orchestrator(healthy_provider("primary"), 8, 3);
        let session = started(&orchestrator).await;

        let err = orchestrator
            .submit_answer(session.id, ANSWER, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::FinishTooEarly {
                answered: 1,
                minimum: 3
            }
        ));
        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.transcript.len(), 1);
        assert!(stored.pending_question().is_some());
    }

    #[tokio::test]
    async fn test_finish_honoured_at_minimum() {
        let (orchestrator, store, _) = orchestrator(healthy_provider("primary"), 8, 2);
        let session = started(&orchestrator).await;

        orchestrator.submit_answer(session.id, ANSWER, false).await.unwrap();
        let outcome = orchestrator.submit_answer(session.id, ANSWER, true).await.unwrap();

        assert_eq!(outcome.session.status, InterviewStatus::Completed);
        assert_eq!(outcome.session.answered_count(), 2);
        assert!(store.get_report(session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_answer_rejected() {
        let (orchestrator, _, provider) = orchestrator(healthy_provider("primary"), 5, 3);
        let session = started(&orchestrator).await;
        let calls = provider.calls();

        assert!(matches!(
            orchestrator.submit_answer(session.id, "   ", false).await,
            Err(InterviewError::EmptyAnswer)
        ));
        assert_eq!(provider.calls(), calls);
    }

    #[tokio::test]
    async fn test_repeated_question_is_regenerated_once() {
        let provider = ScriptedProvider::with("primary", |_, request| {
            if request.system.starts_with(EVALUATOR_SYSTEM) {
                Reply::text(EVALUATION)
            } else {
                Reply::text("Could you walk me through your background?")
            }
        });
        let (orchestrator, _, provider) = orchestrator(provider, 5, 3);
        let session = started(&orchestrator).await;

        let outcome = orchestrator.submit_answer(session.id, ANSWER, false).await.unwrap();

        // opening question, evaluation, question, regenerated question
        assert_eq!(provider.calls(), 4);
        assert!(provider
            .last_prompt()
            .unwrap()
            .contains(AVOID_REPEAT_INSTRUCTION));
        assert_eq!(outcome.session.questions_asked(), 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (orchestrator, _, _) = orchestrator(healthy_provider("primary"), 5, 3);
        assert!(matches!(
            orchestrator.submit_answer(Uuid::new_v4(), ANSWER, false).await,
            Err(InterviewError::NotFound(_))
        ));
    }
}
