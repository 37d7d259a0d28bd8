use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable result of one resume analysis. Re-analysis inserts a new row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    pub id: Uuid,
    pub user_ref: Uuid,
    pub ats_score: u8,
    pub breakdown: BTreeMap<String, u8>,
    pub suggestions: Vec<String>,
    pub target_role: Option<String>,
    pub target_skills: Vec<String>,
    /// Target skills the resume never mentions.
    pub missing_keywords: Vec<String>,
    pub highlights: Vec<String>,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

impl ResumeAnalysis {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.ats_score)
    }
}

/// Readiness band shared by ATS scores and interview reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Average,
    NeedsWork,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => ScoreBand::Excellent,
            72..=84 => ScoreBand::Good,
            58..=71 => ScoreBand::Average,
            _ => ScoreBand::NeedsWork,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Average => "average",
            ScoreBand::NeedsWork => "needs-work",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Strong readiness. Performance is well aligned for screening.",
            ScoreBand::Good => "Good readiness. A few targeted improvements will raise the result.",
            ScoreBand::Average => "Moderate readiness. Work on alignment and quantified impact.",
            ScoreBand::NeedsWork => "Readiness is low. Improve structure, relevance and measurable outcomes.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(ScoreBand::from_score(100), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(85), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(84), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(72), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(71), ScoreBand::Average);
        assert_eq!(ScoreBand::from_score(58), ScoreBand::Average);
        assert_eq!(ScoreBand::from_score(57), ScoreBand::NeedsWork);
        assert_eq!(ScoreBand::from_score(0), ScoreBand::NeedsWork);
    }

    #[test]
    fn test_band_serializes_kebab_case() {
        let json = serde_json::to_string(&ScoreBand::NeedsWork).unwrap();
        assert_eq!(json, "\"needs-work\"");
    }
}
