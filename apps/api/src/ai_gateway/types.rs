//! Normalized gateway outputs and the parsers that coerce raw model JSON into them.
//!
//! Every parser returns `None` when the output is unusable; the gateway treats that
//! as a transient failure of the attempt.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::provider::strip_json_fences;

pub const MAX_SUGGESTIONS: usize = 6;
pub const MAX_HIGHLIGHTS: usize = 6;
/// Target skills beyond this many are ignored.
pub const MAX_TARGET_SKILLS: usize = 20;

/// Weights of the four ATS sub-scores.
pub const ATS_WEIGHTS: [(&str, f64); 4] = [
    ("keyword_match", 0.38),
    ("structure_quality", 0.22),
    ("impact_evidence", 0.24),
    ("readability", 0.16),
];

/// Inputs for the next interviewer question.
#[derive(Debug, Clone)]
pub struct QuestionContext {
    pub role: String,
    pub skills: Vec<String>,
    pub stage: String,
    pub question_number: usize,
    pub turn_budget: usize,
    pub latest_answer: Option<String>,
    /// Newest first.
    pub recent_questions: Vec<String>,
    /// Set on the regeneration attempt after a repeated question.
    pub avoid_repeat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedQuestion {
    pub text: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerEvaluation {
    pub score: u8,
    pub criteria: BTreeMap<String, u8>,
    pub feedback: String,
    pub provider: String,
}

/// Role and skills a resume is scored against. Both are optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumeTarget {
    pub role: Option<String>,
    pub skills: Vec<String>,
}

impl ResumeTarget {
    /// Trims the role and drops blank or case-insensitively repeated skills.
    pub fn new<I>(role: Option<String>, skills: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let role = role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let mut seen = Vec::<String>::new();
        let mut kept = Vec::new();
        for skill in skills {
            let skill = skill.trim();
            if skill.is_empty() || seen.contains(&skill.to_lowercase()) {
                continue;
            }
            seen.push(skill.to_lowercase());
            kept.push(skill.to_string());
            if kept.len() == MAX_TARGET_SKILLS {
                break;
            }
        }
        Self { role, skills: kept }
    }

    /// Splits a comma-separated skills field.
    pub fn from_fields(role: Option<String>, skills: &str) -> Self {
        Self::new(role, skills.split(',').map(str::to_string))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeScore {
    pub ats_score: u8,
    pub breakdown: BTreeMap<String, u8>,
    pub suggestions: Vec<String>,
    /// Strengths the provider found in the resume.
    pub highlights: Vec<String>,
    pub provider: String,
}

/// Clamps any JSON number (or numeric string) into 0..=100.
pub fn clamp_score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

/// A string becomes a one-element list; a list keeps its non-empty string items.
pub fn coerce_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let cleaned = strip_json_fences(raw);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
        return Some(map);
    }
    // Models sometimes wrap the object in prose.
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    match serde_json::from_str::<Value>(cleaned.get(start..=end)?) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Plain-text question. Surrounding quotes and a leading "Question:" label are removed.
pub fn parse_question(raw: &str) -> Option<String> {
    let mut text = strip_json_fences(raw).trim();
    if let Some(rest) = text
        .strip_prefix("Question:")
        .or_else(|| text.strip_prefix("Interviewer:"))
    {
        text = rest.trim();
    }
    let text = text.trim_matches(|c| c == '"' || c == '\'').trim();
    let words = text.split_whitespace().count();
    if words < 3 {
        return None;
    }
    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// `{score, criteria: {name: 0-100}, feedback}`. A missing score falls back to the
/// mean of the criteria; neither present means the output is unusable.
pub fn parse_evaluation(raw: &str) -> Option<(u8, BTreeMap<String, u8>, String)> {
    let map = parse_object(raw)?;

    let criteria: BTreeMap<String, u8> = match map.get("criteria") {
        Some(Value::Object(entries)) => entries
            .iter()
            .filter_map(|(name, v)| clamp_score(v).map(|s| (name.trim().to_lowercase(), s)))
            .filter(|(name, _)| !name.is_empty())
            .collect(),
        _ => BTreeMap::new(),
    };

    let score = match map.get("score").and_then(clamp_score) {
        Some(score) => score,
        None if !criteria.is_empty() => {
            let total: u32 = criteria.values().map(|&v| u32::from(v)).sum();
            (total as f64 / criteria.len() as f64).round() as u8
        }
        None => return None,
    };

    let feedback = match map.get("feedback") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(_)) => coerce_list(map.get("feedback")).join(" "),
        _ => String::new(),
    };

    Some((score, criteria, feedback))
}

/// Weighted sum of the four sub-scores, or `None` unless all are present.
pub fn weighted_ats(breakdown: &BTreeMap<String, u8>) -> Option<u8> {
    let mut weighted = 0.0;
    for (key, weight) in ATS_WEIGHTS {
        weighted += weight * f64::from(*breakdown.get(key)?);
    }
    Some(weighted.round().clamp(0.0, 100.0) as u8)
}

/// `{keyword_match, structure_quality, impact_evidence, readability, suggestions,
/// detected_highlights}`. The ATS score is the weighted sum of the four sub-scores
/// when all are present, otherwise the model's own `ats_score`. The provider name
/// is left empty for the gateway to fill.
pub fn parse_resume_score(raw: &str) -> Option<ResumeScore> {
    let map = parse_object(raw)?;
    let source = match map.get("breakdown") {
        Some(Value::Object(inner)) => inner,
        _ => &map,
    };

    let breakdown: BTreeMap<String, u8> = ATS_WEIGHTS
        .iter()
        .filter_map(|(key, _)| source.get(*key).and_then(clamp_score).map(|s| (key.to_string(), s)))
        .collect();

    let ats_score = match weighted_ats(&breakdown) {
        Some(score) => score,
        None => map.get("ats_score").and_then(clamp_score)?,
    };

    let mut suggestions = coerce_list(map.get("suggestions"));
    suggestions.dedup();
    suggestions.truncate(MAX_SUGGESTIONS);

    let mut highlights = coerce_list(map.get("detected_highlights").or_else(|| map.get("highlights")));
    highlights.dedup();
    highlights.truncate(MAX_HIGHLIGHTS);

    Some(ResumeScore {
        ats_score,
        breakdown,
        suggestions,
        highlights,
        provider: String::new(),
    })
}
