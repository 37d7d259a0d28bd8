//! Persistence seams. Services hold `Arc<dyn ...Store>` so tests and the importer's
//! dry-run mode can swap PostgreSQL for the in-memory implementation.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::catalog::{CatalogRecord, DatasetKind, RecordTable};
use crate::models::interview::{InterviewReport, InterviewSession};
use crate::models::resume::ResumeAnalysis;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("stored row is corrupt: {0}")]
    Corrupt(String),
}

/// Outcome of one upsert by natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
    Unchanged,
}

/// Everything one import run writes. Applied atomically: either every record
/// lands or none does.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub dataset: DatasetKind,
    /// Wipe the dataset's tables before writing.
    pub clear: bool,
    /// Parents before children.
    pub records: Vec<CatalogRecord>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Applies the batch in one transaction. Outcomes align with `batch.records`.
    async fn apply(&self, batch: &ImportBatch) -> Result<Vec<Upserted>, StoreError>;

    async fn count(&self, table: RecordTable) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn insert_session(&self, session: &InterviewSession) -> Result<(), StoreError>;

    /// Overwrites a non-terminal session. A session already completed or failed is
    /// never written again (`Conflict`).
    async fn update_session(&self, session: &InterviewSession) -> Result<(), StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, StoreError>;

    /// Persists the completed session together with its single report.
    async fn complete_session(
        &self,
        session: &InterviewSession,
        report: &InterviewReport,
    ) -> Result<(), StoreError>;

    async fn get_report(&self, session_id: Uuid) -> Result<Option<InterviewReport>, StoreError>;
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn insert_analysis(&self, analysis: &ResumeAnalysis) -> Result<(), StoreError>;

    async fn latest_analysis(&self, user_ref: Uuid) -> Result<Option<ResumeAnalysis>, StoreError>;

    /// Newest first.
    async fn list_analyses(&self, user_ref: Uuid) -> Result<Vec<ResumeAnalysis>, StoreError>;
}
