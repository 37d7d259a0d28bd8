//! Resume ATS analysis: text extraction, validation and scoring through the AI
//! gateway. Every analysis is stored as a new immutable row.

use thiserror::Error;

use crate::ai_gateway::AiError;
use crate::store::StoreError;

pub mod analyzer;
pub mod extract;
pub mod handlers;
pub mod keywords;

pub use analyzer::ResumeAnalyzer;
pub use extract::{extract_text, extract_text_blocking};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("resume text is empty")]
    Empty,

    #[error("resume text is too short ({length} characters, at least {minimum} required)")]
    TooShort { length: usize, minimum: usize },

    #[error("unsupported resume file '{0}' (expected .pdf or .txt)")]
    UnsupportedFormat(String),

    #[error("could not read text from {filename}: {message}")]
    Extraction { filename: String, message: String },

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
