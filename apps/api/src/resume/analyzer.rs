use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::keywords::keyword_coverage;
use super::AnalysisError;
use crate::ai_gateway::types::weighted_ats;
use crate::ai_gateway::{AiGateway, ResumeTarget};
use crate::models::resume::ResumeAnalysis;
use crate::store::ResumeStore;

pub struct ResumeAnalyzer {
    gateway: AiGateway,
    store: Arc<dyn ResumeStore>,
    min_chars: usize,
}

impl ResumeAnalyzer {
    pub fn new(gateway: AiGateway, store: Arc<dyn ResumeStore>, min_chars: usize) -> Self {
        Self {
            gateway,
            store,
            min_chars,
        }
    }

    /// Scores the resume and stores the result as a new analysis. Input that is
    /// empty or shorter than the configured minimum never reaches a provider.
    ///
    /// With target skills, `keyword_match` is measured on the text itself and the
    /// ATS score is reweighted from it.
    pub async fn analyze(
        &self,
        user_ref: Uuid,
        text: &str,
        target: ResumeTarget,
    ) -> Result<ResumeAnalysis, AnalysisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::Empty);
        }
        let length = text.chars().count();
        if length < self.min_chars {
            return Err(AnalysisError::TooShort {
                length,
                minimum: self.min_chars,
            });
        }

        let mut score = self.gateway.score_resume(text, &target).await?;
        let mut missing_keywords = Vec::new();
        if let Some(coverage) = keyword_coverage(text, &target.skills) {
            score.breakdown.insert("keyword_match".to_string(), coverage.score);
            if let Some(ats) = weighted_ats(&score.breakdown) {
                score.ats_score = ats;
            }
            missing_keywords = coverage.missing;
        }

        let analysis = ResumeAnalysis {
            id: Uuid::new_v4(),
            user_ref,
            ats_score: score.ats_score,
            breakdown: score.breakdown,
            suggestions: score.suggestions,
            target_role: target.role,
            target_skills: target.skills,
            missing_keywords,
            highlights: score.highlights,
            provider: score.provider,
            created_at: Utc::now(),
        };
        self.store.insert_analysis(&analysis).await?;

        info!(
            "Resume analysis {} for user {}: ATS {} via {}",
            analysis.id, user_ref, analysis.ats_score, analysis.provider
        );
        Ok(analysis)
    }

    pub async fn latest(&self, user_ref: Uuid) -> Result<Option<ResumeAnalysis>, AnalysisError> {
        Ok(self.store.latest_analysis(user_ref).await?)
    }

    /// Every analysis for the user, newest first.
    pub async fn history(&self, user_ref: Uuid) -> Result<Vec<ResumeAnalysis>, AnalysisError> {
        Ok(self.store.list_analyses(user_ref).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_gateway::testing::{gateway_with, healthy_provider, Reply, ScriptedProvider};
    use crate::ai_gateway::{AiError, ProviderError};
    use crate::store::MemoryStore;

    fn resume_text() -> String {
        "Jane Doe, backend engineer. Built and operated payment APIs in Rust and Go, \
         cut p99 latency by 35% and led a migration to PostgreSQL 15 for 2M users. "
            .repeat(3)
    }

    fn analyzer(provider: ScriptedProvider) -> (ResumeAnalyzer, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let analyzer = ResumeAnalyzer::new(
            gateway_with(vec![provider.clone()]),
            Arc::new(MemoryStore::new()),
            200,
        );
        (analyzer, provider)
    }

    #[tokio::test]
    async fn test_short_text_never_calls_provider() {
        let (analyzer, provider) = analyzer(healthy_provider("primary"));

        let err = analyzer
            .analyze(Uuid::new_v4(), "Jane Doe, engineer", ResumeTarget::default())
            .await.unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::TooShort {
                length: 18,
                minimum: 200
            }
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_text_is_empty() {
        let (analyzer, provider) = analyzer(healthy_provider("primary"));
        assert!(matches!(
            analyzer.analyze(Uuid::new_v4(), " \n\t ", ResumeTarget::default()).await,
            Err(AnalysisError::Empty)
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_reanalysis_adds_new_row() {
        let (analyzer, _) = analyzer(healthy_provider("primary"));
        let user = Uuid::new_v4();

        let first = analyzer.analyze(user, &resume_text(), ResumeTarget::default()).await.unwrap();
        let second = analyzer.analyze(user, &resume_text(), ResumeTarget::default()).await.unwrap();

        assert_eq!(first.ats_score, 75);
        assert_eq!(first.provider, "primary");
        assert_ne!(first.id, second.id);
        assert_eq!(analyzer.history(user).await.unwrap().len(), 2);
        assert_eq!(analyzer.latest(user).await.unwrap().unwrap().id, second.id);
        assert!(analyzer.latest(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provider_outage_stores_nothing() {
        let (analyzer, _) = analyzer(ScriptedProvider::always(
            "primary",
            Reply::Fail(ProviderError::Transient("503".into())),
        ));
        let user = Uuid::new_v4();

        let err = analyzer
            .analyze(user, &resume_text(), ResumeTarget::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Ai(AiError::Unavailable { .. })));
        assert!(analyzer.latest(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_target_skills_drive_keyword_match() {
        let (analyzer, _) = analyzer(healthy_provider("primary"));
        let target = ResumeTarget::from_fields(
            Some("Backend Engineer".into()),
            "Rust, PostgreSQL, Kafka, Kubernetes",
        );

        let analysis = analyzer.analyze(Uuid::new_v4(), &resume_text(), target).await.unwrap();

        // Provider said 80; two of four skills appear in the text.
        assert_eq!(analysis.breakdown["keyword_match"], 50);
        // 0.38*50 + 0.22*70 + 0.24*60 + 0.16*90 = 63.2
        assert_eq!(analysis.ats_score, 63);
        assert_eq!(analysis.missing_keywords, vec!["Kafka", "Kubernetes"]);
        assert_eq!(analysis.target_role.as_deref(), Some("Backend Engineer"));
        assert_eq!(analysis.target_skills.len(), 4);
    }

    #[tokio::test]
    async fn test_without_targets_provider_breakdown_stands() {
        let (analyzer, _) = analyzer(healthy_provider("primary"));

        let analysis = analyzer
            .analyze(Uuid::new_v4(), &resume_text(), ResumeTarget::default())
            .await
            .unwrap();

        assert_eq!(analysis.breakdown["keyword_match"], 80);
        assert!(analysis.missing_keywords.is_empty());
        assert!(analysis.target_role.is_none());
    }
}
