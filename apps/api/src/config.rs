use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Application configuration loaded from environment variables once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub ai: AiProviderConfig,
    pub import: ImportPaths,
    pub interview: InterviewConfig,
    pub resume_min_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn other(&self) -> ProviderKind {
        match self {
            ProviderKind::Gemini => ProviderKind::OpenAi,
            ProviderKind::OpenAi => ProviderKind::Gemini,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            other => bail!("AI_PROVIDER must be 'gemini' or 'openai', got '{other}'"),
        }
    }
}

/// Process-wide AI settings. Read-only once built; handed to the gateway.
#[derive(Clone)]
pub struct AiProviderConfig {
    pub primary: ProviderKind,
    pub fallback: ProviderKind,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_model: String,
    pub request_timeout: Duration,
}

impl AiProviderConfig {
    pub fn provider_order(&self) -> [ProviderKind; 2] {
        [self.primary, self.fallback]
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for AiProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("AiProviderConfig")
            .field("primary", &self.primary)
            .field("fallback", &self.fallback)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("openai_model", &self.openai_model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Where the importer looks for private CSV files.
#[derive(Debug, Clone)]
pub struct ImportPaths {
    pub aptitude_data_dir: PathBuf,
    pub practice_data_dir: PathBuf,
    pub content_csv: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct InterviewConfig {
    /// Answers after which a session completes on its own.
    pub turn_budget: usize,
    /// Answers required before an explicit finish is honoured.
    pub min_answers_to_finish: usize,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            turn_budget: 8,
            min_answers_to_finish: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let primary: ProviderKind = var("AI_PROVIDER")
            .as_deref()
            .unwrap_or("gemini")
            .parse()?;

        let timeout_secs: u64 = parse_or(&var, "AI_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            bail!("AI_TIMEOUT_SECS must be at least 1");
        }

        let ai = AiProviderConfig {
            primary,
            fallback: primary.other(),
            gemini_api_key: var("GEMINI_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
        };

        let import = ImportPaths {
            aptitude_data_dir: var("APTITUDE_DATA_DIR")
                .unwrap_or_else(|| "data/aptitude".to_string())
                .into(),
            practice_data_dir: var("PRACTICE_DATA_DIR")
                .unwrap_or_else(|| "data/practice".to_string())
                .into(),
            content_csv: var("ELEVO_CONTENT_CSV")
                .unwrap_or_else(|| "data/content/elevo_content.csv".to_string())
                .into(),
        };

        let defaults = InterviewConfig::default();
        let turn_budget: usize = parse_or(&var, "MOCK_INTERVIEW_MAX_QUESTIONS", defaults.turn_budget)?;
        if turn_budget == 0 {
            bail!("MOCK_INTERVIEW_MAX_QUESTIONS must be at least 1");
        }
        let min_answers: usize =
            parse_or(&var, "MOCK_INTERVIEW_MIN_QUESTIONS", defaults.min_answers_to_finish)?;

        Ok(Config {
            database_url: var("DATABASE_URL"),
            port: parse_or(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            ai,
            import,
            interview: InterviewConfig {
                turn_budget,
                min_answers_to_finish: min_answers.clamp(1, turn_budget),
            },
            resume_min_chars: parse_or(&var, "RESUME_MIN_CHARS", 200)?,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("Required environment variable 'DATABASE_URL' is not set")
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
