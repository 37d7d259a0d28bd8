//! Mock interview sessions: question generation, answer evaluation and the
//! final report, driven through the AI gateway.

use thiserror::Error;
use uuid::Uuid;

use crate::ai_gateway::AiError;
use crate::models::interview::InvalidTransition;
use crate::store::StoreError;

pub mod handlers;
pub mod orchestrator;
pub mod report;
pub mod stages;

pub use orchestrator::{AnswerOutcome, Orchestrator};

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("interview session {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("interview session {0} is already processing an answer")]
    Busy(Uuid),

    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("at least {minimum} answers are required before finishing (this would be answer {answered})")]
    FinishTooEarly { answered: usize, minimum: usize },

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
