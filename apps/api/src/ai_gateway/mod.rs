//! AI Provider Gateway: the single entry point for hosted text-generation calls.
//!
//! No other module talks to Gemini or OpenAI directly. Each operation walks the
//! configured provider chain: a transient failure is retried once on the same
//! provider, then the next provider is tried. A rejected request (bad key, malformed
//! input) stops the chain immediately. When every provider is exhausted the caller
//! gets exactly one `AiError::Unavailable`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{AiProviderConfig, ProviderKind};
use crate::models::interview::Track;

pub mod gemini;
pub mod openai;
pub mod prompts;
pub mod provider;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use provider::{AiProvider, CompletionRequest, ProviderError};
pub use types::{AnswerEvaluation, GeneratedQuestion, QuestionContext, ResumeScore, ResumeTarget};

use prompts::*;

/// Attempts made on one provider before falling back to the next.
const ATTEMPTS_PER_PROVIDER: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no AI provider could serve the request after {attempts} attempt(s)")]
    Unavailable { attempts: u32 },

    #[error("{provider} rejected the request (status {status}): {message}")]
    Rejected {
        provider: String,
        status: u16,
        message: String,
    },
}

/// Ordered provider chain with retry-then-fallback dispatch.
#[derive(Clone)]
pub struct AiGateway {
    providers: Vec<Arc<dyn AiProvider>>,
    call_timeout: Duration,
    retry_delay: Duration,
}

impl AiGateway {
    pub fn new(providers: Vec<Arc<dyn AiProvider>>, call_timeout: Duration) -> Self {
        Self {
            providers,
            call_timeout,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Builds `[primary, fallback]` from configuration, leaving out providers
    /// that have no API key.
    pub fn from_config(config: &AiProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        let mut providers: Vec<Arc<dyn AiProvider>> = Vec::new();
        for kind in config.provider_order() {
            let Some(key) = config.api_key(kind) else {
                warn!("{:?} has no API key configured; leaving it out of the chain", kind);
                continue;
            };
            let provider: Arc<dyn AiProvider> = match kind {
                ProviderKind::Gemini => Arc::new(gemini::GeminiProvider::new(
                    client.clone(),
                    key.to_string(),
                    config.gemini_model.clone(),
                )),
                ProviderKind::OpenAi => Arc::new(openai::OpenAiProvider::new(
                    client.clone(),
                    key.to_string(),
                    config.openai_model.clone(),
                )),
            };
            providers.push(provider);
        }

        if providers.is_empty() {
            warn!("No AI provider is configured; AI features will report unavailable");
        }
        Self::new(providers, config.request_timeout)
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Next interviewer question for the given track and context.
    pub async fn generate_question(
        &self,
        track: Track,
        context: &QuestionContext,
    ) -> Result<GeneratedQuestion, AiError> {
        let recent = if context.recent_questions.is_empty() {
            "None".to_string()
        } else {
            context
                .recent_questions
                .iter()
                .map(|q| format!("- {q}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let skills = if context.skills.is_empty() {
            "general".to_string()
        } else {
            context.skills.join(", ")
        };
        let track_rule = match track {
            Track::Technical => TECHNICAL_TRACK_RULE,
            Track::Hr => HR_TRACK_RULE,
        };

        let mut prompt = QUESTION_PROMPT_TEMPLATE
            .replace("{role}", &context.role)
            .replace("{track}", track.label())
            .replace("{skills}", &skills)
            .replace("{question_number}", &context.question_number.to_string())
            .replace("{turn_budget}", &context.turn_budget.to_string())
            .replace("{stage}", &context.stage)
            .replace(
                "{latest_answer}",
                context.latest_answer.as_deref().unwrap_or("(start)"),
            )
            .replace("{recent_questions}", &recent)
            .replace("{track_rule}", track_rule);
        if context.avoid_repeat {
            prompt.push_str(AVOID_REPEAT_INSTRUCTION);
        }

        let request = CompletionRequest {
            system: INTERVIEWER_SYSTEM.to_string(),
            prompt,
            temperature: if context.avoid_repeat { 0.65 } else { 0.7 },
            max_tokens: 220,
            json: false,
        };

        let (text, provider) = self
            .dispatch("generate_question", &request, types::parse_question)
            .await?;
        Ok(GeneratedQuestion { text, provider })
    }

    /// Scores one candidate answer against its question.
    pub async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<AnswerEvaluation, AiError> {
        let request = CompletionRequest {
            system: format!("{EVALUATOR_SYSTEM} {JSON_ONLY_SYSTEM}"),
            prompt: EVALUATE_PROMPT_TEMPLATE
                .replace("{question}", question)
                .replace("{answer}", answer),
            temperature: 0.3,
            max_tokens: 500,
            json: true,
        };

        let ((score, criteria, feedback), provider) = self
            .dispatch("evaluate_answer", &request, types::parse_evaluation)
            .await?;
        Ok(AnswerEvaluation {
            score,
            criteria,
            feedback,
            provider,
        })
    }

    /// ATS score, sub-score breakdown and suggestions for a resume.
    pub async fn score_resume(&self, text: &str, target: &ResumeTarget) -> Result<ResumeScore, AiError> {
        let excerpt: String = text.chars().take(RESUME_PROMPT_CHAR_LIMIT).collect();
        let target_role = target.role.as_deref().unwrap_or("not given, infer it from the resume");
        let target_skills = if target.skills.is_empty() {
            "not given".to_string()
        } else {
            target.skills.join(", ")
        };
        let request = CompletionRequest {
            system: format!("{RESUME_SYSTEM} {JSON_ONLY_SYSTEM}"),
            prompt: RESUME_PROMPT_TEMPLATE
                .replace("{target_role}", target_role)
                .replace("{target_skills}", &target_skills)
                .replace("{resume_text}", &excerpt),
            temperature: 0.2,
            max_tokens: 900,
            json: true,
        };

        let (mut score, provider) = self
            .dispatch("score_resume", &request, types::parse_resume_score)
            .await?;
        score.provider = provider;
        Ok(score)
    }

    /// Runs `request` down the chain until one attempt yields output `parse` accepts.
    async fn dispatch<T, F>(
        &self,
        operation: &str,
        request: &CompletionRequest,
        parse: F,
    ) -> Result<(T, String), AiError>
    where
        F: Fn(&str) -> Option<T>,
    {
        let mut attempts = 0u32;

        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.name();

            for attempt in 1..=ATTEMPTS_PER_PROVIDER {
                attempts += 1;
                debug!("{operation}: {name} attempt {attempt}");

                let outcome =
                    match tokio::time::timeout(self.call_timeout, provider.complete(request)).await
                    {
                        Ok(Ok(text)) => parse(&text).ok_or_else(|| {
                            ProviderError::Transient("unusable model output".to_string())
                        }),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(ProviderError::Transient(format!(
                            "timed out after {}s",
                            self.call_timeout.as_secs_f32()
                        ))),
                    };

                match outcome {
                    Ok(value) => {
                        info!("{operation}: served by {name} on attempt {attempt}");
                        return Ok((value, name.to_string()));
                    }
                    Err(ProviderError::Rejected { status, message }) => {
                        error!("{operation}: {name} rejected the request (status {status}): {message}");
                        return Err(AiError::Rejected {
                            provider: name.to_string(),
                            status,
                            message,
                        });
                    }
                    Err(ProviderError::Transient(reason)) => {
                        warn!("{operation}: {name} attempt {attempt} failed: {reason}");
                        if attempt < ATTEMPTS_PER_PROVIDER && !self.retry_delay.is_zero() {
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }

            if let Some(next) = self.providers.get(index + 1) {
                warn!("{operation}: falling back from {name} to {}", next.name());
            }
        }

        error!("{operation}: all AI providers exhausted after {attempts} attempt(s)");
        Err(AiError::Unavailable { attempts })
    }
}
