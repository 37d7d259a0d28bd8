//! Deterministic interview heuristics: question stages, answer quality and
//! repeated-question detection. None of this calls a model.

use std::collections::HashSet;

use crate::models::interview::{ResponseQuality, Track};

/// How many recent questions a new question is compared against.
pub const REPEAT_WINDOW: usize = 4;
const SIMILARITY_THRESHOLD: f64 = 0.78;
const TOKEN_OVERLAP_THRESHOLD: f64 = 0.75;

const ACTION_VERBS: [&str; 7] = [
    "built",
    "designed",
    "implemented",
    "optimized",
    "led",
    "improved",
    "delivered",
];
const METRIC_WORDS: [&str; 7] = [
    "ms",
    "days",
    "weeks",
    "users",
    "latency",
    "throughput",
    "revenue",
];

/// Stage label for the 1-based question number.
pub fn stage_for(track: Track, question_number: usize) -> &'static str {
    match (track, question_number) {
        (_, 0..=1) => "introduction",
        (Track::Technical, 2..=3) => "technical-core",
        (Track::Technical, 4..=5) => "technical-depth",
        (Track::Technical, 6..=7) => "problem-solving",
        (Track::Hr, 2..=3) => "hr-core",
        (Track::Hr, 4..=5) => "behavioral",
        (Track::Hr, 6..=7) => "situational-hr",
        _ => "final-evaluation",
    }
}

/// Scores how an answer is written: length, ownership language and measurable
/// results. Capped at 100.
pub fn response_quality(answer: &str) -> ResponseQuality {
    let lowered = answer.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let has_action_language = tokens.iter().any(|t| ACTION_VERBS.contains(t));
    let has_metrics = lowered.contains('%')
        || tokens.iter().any(|t| METRIC_WORDS.contains(t) || is_multiplier(t));

    let length_points = match words.len() {
        n if n >= 40 => 35,
        n if n >= 20 => 20,
        _ => 8,
    };
    let action_points = if has_action_language { 35 } else { 10 };
    let metric_points = if has_metrics { 30 } else { 8 };

    ResponseQuality {
        word_count: words.len(),
        has_action_language,
        has_metrics,
        quality_score: (length_points + action_points + metric_points).min(100),
    }
}

// "3x", "10x"
fn is_multiplier(token: &str) -> bool {
    token
        .strip_suffix('x')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `candidate` is empty after normalization or too close to any of the
/// `recent` questions (newest first; only the first `REPEAT_WINDOW` count).
pub fn is_repetitive(candidate: &str, recent: &[String]) -> bool {
    let new_q = normalize(candidate);
    if new_q.is_empty() {
        return true;
    }
    let new_tokens: HashSet<&str> = new_q.split(' ').collect();

    recent.iter().take(REPEAT_WINDOW).any(|old| {
        let old_q = normalize(old);
        if old_q.is_empty() {
            return false;
        }
        if similarity(&new_q, &old_q) >= SIMILARITY_THRESHOLD {
            return true;
        }
        let old_tokens: HashSet<&str> = old_q.split(' ').collect();
        let shared = new_tokens.intersection(&old_tokens).count();
        shared as f64 / new_tokens.len().max(1) as f64 >= TOKEN_OVERLAP_THRESHOLD
    })
}

/// Ratcliff/Obershelp ratio: twice the matched characters over the total length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + len..], &b[j + len..])
}

/// Earliest longest common substring as `(start in a, start in b, length)`.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let run = previous[j] + 1;
                current[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        previous = current;
    }
    best
}
