//! Target-skill coverage measured directly on the resume text.

pub const MAX_MISSING_KEYWORDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCoverage {
    /// Share of target skills found, 0..=100.
    pub score: u8,
    /// Unmatched target skills in the order given.
    pub missing: Vec<String>,
}

/// `None` when there are no target skills to measure against.
pub fn keyword_coverage(text: &str, skills: &[String]) -> Option<KeywordCoverage> {
    if skills.is_empty() {
        return None;
    }
    let haystack = text.to_lowercase();

    let mut matched = 0usize;
    let mut missing = Vec::new();
    for skill in skills {
        if mentions(&haystack, &skill.trim().to_lowercase()) {
            matched += 1;
        } else {
            missing.push(skill.clone());
        }
    }
    missing.truncate(MAX_MISSING_KEYWORDS);

    let score = (matched as f64 / skills.len() as f64 * 100.0).round() as u8;
    Some(KeywordCoverage { score, missing })
}

/// Whole-word match: the characters around the hit must not be alphanumeric.
fn mentions(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphanumeric()) && !after.is_some_and(|c| c.is_alphanumeric())
    })
}
