use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Technical,
    Hr,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Technical => "technical",
            Track::Hr => "hr",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Track::Technical => "Technical",
            Track::Hr => "HR",
        }
    }
}

impl FromStr for Track {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" => Ok(Track::Technical),
            "hr" => Ok(Track::Hr),
            other => Err(format!("unknown interview track '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Created,
    InProgress,
    Completed,
    Failed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Created => "created",
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InterviewStatus::Completed | InterviewStatus::Failed)
    }

    /// Created → InProgress | Failed; InProgress → InProgress | Completed | Failed.
    /// Terminal states accept nothing.
    pub fn can_transition_to(&self, next: InterviewStatus) -> bool {
        use InterviewStatus::*;
        matches!(
            (self, next),
            (Created, InProgress)
                | (Created, Failed)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(InterviewStatus::Created),
            "in_progress" => Ok(InterviewStatus::InProgress),
            "completed" => Ok(InterviewStatus::Completed),
            "failed" => Ok(InterviewStatus::Failed),
            other => Err(format!("unknown interview status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: InterviewStatus,
    pub to: InterviewStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move interview from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

/// Local, model-independent signal about how an answer is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseQuality {
    pub word_count: usize,
    pub has_action_language: bool,
    pub has_metrics: bool,
    pub quality_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEvaluation {
    pub score: u8,
    pub criteria: BTreeMap<String, u8>,
    pub feedback: String,
    pub provider: String,
    pub quality: ResponseQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<TurnEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub user_ref: Uuid,
    pub track: Track,
    pub role: String,
    pub skills: Vec<String>,
    pub status: InterviewStatus,
    pub transcript: Vec<Turn>,
    /// Client-facing reason code. Provider detail stays in the logs.
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(user_ref: Uuid, track: Track, role: String, skills: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_ref,
            track,
            role,
            skills,
            status: InterviewStatus::Created,
            transcript: Vec::new(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: InterviewStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn push_question(&mut self, text: String, stage: &str) {
        self.transcript.push(Turn {
            speaker: Speaker::Interviewer,
            text,
            at: Utc::now(),
            stage: Some(stage.to_string()),
            evaluation: None,
        });
        self.updated_at = Utc::now();
    }

    pub fn push_answer(&mut self, text: String) {
        self.transcript.push(Turn {
            speaker: Speaker::Candidate,
            text,
            at: Utc::now(),
            stage: None,
            evaluation: None,
        });
        self.updated_at = Utc::now();
    }

    /// Attaches an evaluation to the most recent candidate turn.
    pub fn evaluate_last_answer(&mut self, evaluation: TurnEvaluation) {
        if let Some(turn) = self
            .transcript
            .iter_mut()
            .rev()
            .find(|t| t.speaker == Speaker::Candidate)
        {
            turn.evaluation = Some(evaluation);
        }
    }

    pub fn questions_asked(&self) -> usize {
        self.transcript
            .iter()
            .filter(|t| t.speaker == Speaker::Interviewer)
            .count()
    }

    pub fn answered_count(&self) -> usize {
        self.transcript
            .iter()
            .filter(|t| t.speaker == Speaker::Candidate)
            .count()
    }

    /// The question awaiting an answer, if the transcript ends with one.
    pub fn pending_question(&self) -> Option<&Turn> {
        self.transcript
            .last()
            .filter(|t| t.speaker == Speaker::Interviewer)
    }

    /// Up to `limit` interviewer questions, newest first.
    pub fn recent_questions(&self, limit: usize) -> Vec<String> {
        self.transcript
            .iter()
            .rev()
            .filter(|t| t.speaker == Speaker::Interviewer)
            .take(limit)
            .map(|t| t.text.clone())
            .collect()
    }
}

/// Final report. Keyed by its session: one report per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewReport {
    pub session_id: Uuid,
    pub scores_breakdown: BTreeMap<String, f64>,
    pub overall_score: u8,
    pub band: String,
    pub summary_text: String,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> InterviewSession {
        InterviewSession::new(Uuid::new_v4(), Track::Technical, "Backend".into(), vec![])
    }

    #[test]
    fn test_terminal_states_never_leave() {
        for terminal in [InterviewStatus::Completed, InterviewStatus::Failed] {
            for next in [
                InterviewStatus::Created,
                InterviewStatus::InProgress,
                InterviewStatus::Completed,
                InterviewStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_created_cannot_complete_directly() {
        let mut s = session();
        let err = s.transition(InterviewStatus::Completed).unwrap_err();
        assert_eq!(err.from, InterviewStatus::Created);
        assert_eq!(s.status, InterviewStatus::Created);
    }

    #[test]
    fn test_pending_question_only_when_transcript_ends_with_question() {
        let mut s = session();
        assert!(s.pending_question().is_none());
        s.push_question("Tell me about yourself?".into(), "introduction");
        assert!(s.pending_question().is_some());
        s.push_answer("I build APIs.".into());
        assert!(s.pending_question().is_none());
        assert_eq!(s.answered_count(), 1);
        assert_eq!(s.questions_asked(), 1);
    }

    #[test]
    fn test_status_round_trips_through_db_text() {
        for status in [
            InterviewStatus::Created,
            InterviewStatus::InProgress,
            InterviewStatus::Completed,
            InterviewStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<InterviewStatus>().unwrap(), status);
        }
    }
}
