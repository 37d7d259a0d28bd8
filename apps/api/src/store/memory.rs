use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{CatalogStore, ImportBatch, InterviewStore, ResumeStore, StoreError, Upserted};
use crate::models::catalog::{AptitudeCategory, AptitudeTopic, CatalogRecord, RecordTable};
use crate::models::interview::{InterviewReport, InterviewSession};
use crate::models::resume::ResumeAnalysis;

type Catalog = BTreeMap<RecordTable, BTreeMap<String, CatalogRecord>>;

#[derive(Default)]
struct State {
    catalog: Catalog,
    sessions: HashMap<Uuid, InterviewSession>,
    reports: HashMap<Uuid, InterviewReport>,
    analyses: Vec<ResumeAnalysis>,
}

/// Process-local store with the same contract as `PgStore`. Backs tests and the
/// importer's dry-run mode.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic mid-write cannot leave a half-applied batch: batches are swapped in whole.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of one table, keyed by natural key.
    #[cfg(test)]
    pub fn records(&self, table: RecordTable) -> Vec<CatalogRecord> {
        self.state()
            .catalog
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn upsert(catalog: &mut Catalog, record: CatalogRecord) -> Upserted {
    let rows = catalog.entry(record.table()).or_default();
    match rows.insert(record.natural_key(), record.clone()) {
        None => Upserted::Created,
        Some(previous) if previous == record => Upserted::Unchanged,
        Some(_) => Upserted::Updated,
    }
}

/// Inserts a placeholder parent when none exists; never touches an existing one.
fn ensure(catalog: &mut Catalog, parent: CatalogRecord) {
    catalog
        .entry(parent.table())
        .or_default()
        .entry(parent.natural_key())
        .or_insert(parent);
}

fn has_practice_problem(catalog: &Catalog, problem_number: i32) -> bool {
    catalog
        .get(&RecordTable::PracticeProblems)
        .is_some_and(|rows| rows.contains_key(&problem_number.to_string()))
}

fn has_aptitude_problem(catalog: &Catalog, key: &str) -> bool {
    catalog
        .get(&RecordTable::AptitudeProblems)
        .is_some_and(|rows| rows.contains_key(key))
}

fn apply_record(catalog: &mut Catalog, record: &CatalogRecord) -> Result<Upserted, StoreError> {
    match record {
        CatalogRecord::AptitudeTopic(t) => {
            ensure(catalog, category_placeholder(&t.category_name));
        }
        CatalogRecord::AptitudeProblem(p) => {
            ensure(catalog, category_placeholder(&p.category_name));
            ensure(
                catalog,
                CatalogRecord::AptitudeTopic(AptitudeTopic {
                    category_name: p.category_name.clone(),
                    name: p.topic_name.clone(),
                    description: String::new(),
                }),
            );
        }
        CatalogRecord::PracticeTestCase(t) if !has_practice_problem(catalog, t.problem_number) => {
            return Err(StoreError::Conflict(format!(
                "test case references unknown problem {}",
                t.problem_number
            )));
        }
        CatalogRecord::CodeTemplate(t) if !has_practice_problem(catalog, t.problem_number) => {
            return Err(StoreError::Conflict(format!(
                "code template references unknown problem {}",
                t.problem_number
            )));
        }
        CatalogRecord::Editorial(e) if !has_practice_problem(catalog, e.problem_number) => {
            return Err(StoreError::Conflict(format!(
                "editorial references unknown problem {}",
                e.problem_number
            )));
        }
        CatalogRecord::AptitudePracticeSet(set) => {
            if let Some(missing) = set
                .problems
                .iter()
                .find(|p| !has_aptitude_problem(catalog, &p.natural_key()))
            {
                return Err(StoreError::Conflict(format!(
                    "practice set '{}' references unknown problem '{}'",
                    set.title, missing.question_text
                )));
            }
        }
        _ => {}
    }
    Ok(upsert(catalog, record.clone()))
}

fn category_placeholder(name: &str) -> CatalogRecord {
    CatalogRecord::AptitudeCategory(AptitudeCategory {
        name: name.to_string(),
        description: String::new(),
    })
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn apply(&self, batch: &ImportBatch) -> Result<Vec<Upserted>, StoreError> {
        let mut state = self.state();
        let mut working = state.catalog.clone();

        if batch.clear {
            for table in batch.dataset.tables() {
                working.remove(table);
            }
        }

        let outcomes = batch
            .records
            .iter()
            .map(|record| apply_record(&mut working, record))
            .collect::<Result<Vec<_>, _>>()?;

        state.catalog = working;
        Ok(outcomes)
    }

    async fn count(&self, table: RecordTable) -> Result<u64, StoreError> {
        Ok(self
            .state()
            .catalog
            .get(&table)
            .map_or(0, |rows| rows.len() as u64))
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn insert_session(&self, session: &InterviewSession) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict(format!(
                "interview {} already exists",
                session.id
            )));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &InterviewSession) -> Result<(), StoreError> {
        let mut state = self.state();
        write_session(&mut state, session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, StoreError> {
        Ok(self.state().sessions.get(&id).cloned())
    }

    async fn complete_session(
        &self,
        session: &InterviewSession,
        report: &InterviewReport,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.reports.contains_key(&report.session_id) {
            return Err(StoreError::Conflict(format!(
                "interview {} already has a report",
                report.session_id
            )));
        }
        write_session(&mut state, session)?;
        state.reports.insert(report.session_id, report.clone());
        Ok(())
    }

    async fn get_report(&self, session_id: Uuid) -> Result<Option<InterviewReport>, StoreError> {
        Ok(self.state().reports.get(&session_id).cloned())
    }
}

fn write_session(state: &mut State, session: &InterviewSession) -> Result<(), StoreError> {
    match state.sessions.get_mut(&session.id) {
        None => Err(StoreError::NotFound {
            entity: "interview",
            id: session.id.to_string(),
        }),
        Some(stored) if stored.status.is_terminal() => Err(StoreError::Conflict(format!(
            "interview {} is already {}",
            session.id, stored.status
        ))),
        Some(stored) => {
            *stored = session.clone();
            Ok(())
        }
    }
}

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn insert_analysis(&self, analysis: &ResumeAnalysis) -> Result<(), StoreError> {
        self.state().analyses.push(analysis.clone());
        Ok(())
    }

    async fn latest_analysis(&self, user_ref: Uuid) -> Result<Option<ResumeAnalysis>, StoreError> {
        Ok(self
            .state()
            .analyses
            .iter()
            .filter(|a| a.user_ref == user_ref)
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn list_analyses(&self, user_ref: Uuid) -> Result<Vec<ResumeAnalysis>, StoreError> {
        let mut rows: Vec<ResumeAnalysis> = self
            .state()
            .analyses
            .iter()
            .filter(|a| a.user_ref == user_ref)
            .cloned()
            .collect();
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
