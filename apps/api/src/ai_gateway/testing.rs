//! Scripted providers for tests across the crate. No network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::prompts::{EVALUATOR_SYSTEM, RESUME_SYSTEM};
use super::provider::{AiProvider, CompletionRequest, ProviderError};
use super::AiGateway;

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(ProviderError),
    /// Never answers; only the gateway timeout ends the attempt.
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

type Responder = Box<dyn Fn(usize, &CompletionRequest) -> Reply + Send + Sync>;

pub struct ScriptedProvider {
    name: String,
    responder: Responder,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn with<F>(name: &str, responder: F) -> Self
    where
        F: Fn(usize, &CompletionRequest) -> Reply + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(name: &str, reply: Reply) -> Self {
        Self::with(name, move |_, _| reply.clone())
    }

    /// Replies in order; the last reply repeats once the script runs out.
    pub fn sequence(name: &str, replies: Vec<Reply>) -> Self {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::with(name, move |_, _| {
            let mut queue = queue.lock().unwrap();
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap_or(Reply::Hang)
            }
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match (self.responder)(call, request) {
            Reply::Text(text) => Ok(text),
            Reply::Fail(e) => Err(e),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Transient("hung".into()))
            }
        }
    }
}

const DISTINCT_QUESTIONS: [&str; 10] = [
    "Thanks for joining. Could you walk me through your background?",
    "Great. How does a hash map handle collisions internally?",
    "Nice. Describe the hardest bug you fixed in a recent project.",
    "Good. When would you choose a SQL join over a subquery?",
    "Thanks. How did you measure the impact of your last feature?",
    "Understood. Explain the difference between processes and threads.",
    "Okay. Tell me about a time you disagreed with a teammate.",
    "Great answer. How would you design a URL shortener service?",
    "Appreciated. What trade-offs did you make choosing your database?",
    "Finally, what would you improve first if you rebuilt your project?",
];

/// Answers interview and resume prompts the way a healthy model would: distinct
/// questions, a fixed evaluation and a fixed resume score.
pub fn healthy_provider(name: &str) -> ScriptedProvider {
    let questions = AtomicUsize::new(0);
    ScriptedProvider::with(name, move |_, request| {
        if request.system.starts_with(EVALUATOR_SYSTEM) {
            Reply::text(
                r#"{"score": 80, "criteria": {"clarity": 84, "depth": 70, "relevance": 90}, "feedback": "Clear and relevant."}"#,
            )
        } else if request.system.starts_with(RESUME_SYSTEM) {
            Reply::text(
                r#"{"keyword_match": 80, "structure_quality": 70, "impact_evidence": 60, "readability": 90, "suggestions": ["Quantify project outcomes."], "detected_highlights": ["Quantified latency improvement"]}"#,
            )
        } else {
            let n = questions.fetch_add(1, Ordering::SeqCst);
            Reply::text(DISTINCT_QUESTIONS[n % DISTINCT_QUESTIONS.len()])
        }
    })
}

pub fn gateway_with(providers: Vec<Arc<ScriptedProvider>>) -> AiGateway {
    let chain = providers
        .into_iter()
        .map(|p| p as Arc<dyn AiProvider>)
        .collect();
    AiGateway::new(chain, Duration::from_secs(5)).with_retry_delay(Duration::ZERO)
}
