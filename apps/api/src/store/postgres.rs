use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{CatalogStore, ImportBatch, InterviewStore, ResumeStore, StoreError, Upserted};
use crate::models::catalog::{
    AptitudeCategory, AptitudePracticeSet, AptitudeProblem, AptitudeTopic, CatalogRecord,
    CodeTemplate, ContentLesson, DatasetKind, Editorial, PracticeCompany, PracticeProblem,
    PracticeTestCase, PracticeTopic, RecordTable,
};
use crate::models::interview::{InterviewReport, InterviewSession, Turn};
use crate::models::resume::ResumeAnalysis;

/// PostgreSQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn table_name(table: RecordTable) -> &'static str {
    match table {
        RecordTable::AptitudeCategories => "aptitude_categories",
        RecordTable::AptitudeTopics => "aptitude_topics",
        RecordTable::AptitudeProblems => "aptitude_problems",
        RecordTable::AptitudePracticeSets => "aptitude_practice_sets",
        RecordTable::PracticeTopics => "practice_topics",
        RecordTable::PracticeCompanies => "practice_companies",
        RecordTable::PracticeProblems => "practice_problems",
        RecordTable::PracticeTestCases => "practice_test_cases",
        RecordTable::PracticeCodeTemplates => "practice_code_templates",
        RecordTable::PracticeEditorials => "practice_editorials",
        RecordTable::ContentLessons => "content_lessons",
    }
}

/// Children first so foreign keys never block the wipe.
fn clear_order(dataset: DatasetKind) -> &'static [&'static str] {
    match dataset {
        DatasetKind::Aptitude => &[
            "aptitude_practice_sets",
            "aptitude_problems",
            "aptitude_topics",
            "aptitude_categories",
        ],
        DatasetKind::Practice => &[
            "practice_editorials",
            "practice_code_templates",
            "practice_test_cases",
            "practice_problems",
            "practice_companies",
            "practice_topics",
        ],
        DatasetKind::Content => &["content_lessons", "content_articles", "content_topics"],
    }
}

/// `RETURNING (xmax = 0)` is true for a fresh insert and false for an update; no row
/// comes back when the conflict's `WHERE` filtered out an identical record.
fn outcome(inserted: Option<bool>) -> Upserted {
    match inserted {
        Some(true) => Upserted::Created,
        Some(false) => Upserted::Updated,
        None => Upserted::Unchanged,
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn apply(&self, batch: &ImportBatch) -> Result<Vec<Upserted>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(batch.dataset.lock_key())
            .execute(&mut *tx)
            .await?;

        if batch.clear {
            for table in clear_order(batch.dataset) {
                let deleted = sqlx::query(&format!("DELETE FROM {table}"))
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                info!("Cleared {deleted} row(s) from {table}");
            }
        }

        let mut outcomes = Vec::with_capacity(batch.records.len());
        for record in &batch.records {
            let result = match record {
                CatalogRecord::AptitudeCategory(c) => upsert_category(&mut tx, c).await?,
                CatalogRecord::AptitudeTopic(t) => upsert_topic(&mut tx, t).await?,
                CatalogRecord::AptitudeProblem(p) => upsert_aptitude_problem(&mut tx, p).await?,
                CatalogRecord::AptitudePracticeSet(s) => upsert_practice_set(&mut tx, s).await?,
                CatalogRecord::PracticeTopic(t) => upsert_practice_topic(&mut tx, t).await?,
                CatalogRecord::PracticeCompany(c) => upsert_company(&mut tx, c).await?,
                CatalogRecord::PracticeProblem(p) => upsert_practice_problem(&mut tx, p).await?,
                CatalogRecord::PracticeTestCase(t) => upsert_test_case(&mut tx, t).await?,
                CatalogRecord::CodeTemplate(t) => upsert_code_template(&mut tx, t).await?,
                CatalogRecord::Editorial(e) => upsert_editorial(&mut tx, e).await?,
                CatalogRecord::ContentLesson(l) => upsert_lesson(&mut tx, l).await?,
            };
            outcomes.push(result);
        }

        tx.commit().await?;
        debug!(
            "Committed {} {} record(s)",
            outcomes.len(),
            batch.dataset
        );
        Ok(outcomes)
    }

    async fn count(&self, table: RecordTable) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table_name(table)))
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }
}

async fn ensure_category(conn: &mut PgConnection, name: &str) -> Result<Uuid, StoreError> {
    sqlx::query(
        "INSERT INTO aptitude_categories (id, name, description) VALUES ($1, $2, '') \
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .execute(&mut *conn)
    .await?;

    Ok(
        sqlx::query_scalar("SELECT id FROM aptitude_categories WHERE name = $1")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?,
    )
}

async fn ensure_topic(
    conn: &mut PgConnection,
    category_name: &str,
    name: &str,
) -> Result<Uuid, StoreError> {
    let category_id = ensure_category(conn, category_name).await?;
    sqlx::query(
        "INSERT INTO aptitude_topics (id, category_id, name, description) VALUES ($1, $2, $3, '') \
         ON CONFLICT (category_id, name) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(category_id)
    .bind(name)
    .execute(&mut *conn)
    .await?;

    Ok(
        sqlx::query_scalar("SELECT id FROM aptitude_topics WHERE category_id = $1 AND name = $2")
            .bind(category_id)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?,
    )
}

async fn upsert_category(
    conn: &mut PgConnection,
    category: &AptitudeCategory,
) -> Result<Upserted, StoreError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO aptitude_categories (id, name, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
        WHERE aptitude_categories.description IS DISTINCT FROM EXCLUDED.description
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&category.name)
    .bind(&category.description)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_topic(conn: &mut PgConnection, topic: &AptitudeTopic) -> Result<Upserted, StoreError> {
    let category_id = ensure_category(conn, &topic.category_name).await?;
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO aptitude_topics (id, category_id, name, description)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (category_id, name) DO UPDATE SET description = EXCLUDED.description
        WHERE aptitude_topics.description IS DISTINCT FROM EXCLUDED.description
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(category_id)
    .bind(&topic.name)
    .bind(&topic.description)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_aptitude_problem(
    conn: &mut PgConnection,
    problem: &AptitudeProblem,
) -> Result<Upserted, StoreError> {
    let topic_id = ensure_topic(conn, &problem.category_name, &problem.topic_name).await?;
    let [a, b, c, d] = &problem.options;
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO aptitude_problems
            (id, topic_id, question_text, option_a, option_b, option_c, option_d,
             correct_option, explanation, difficulty)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (topic_id, question_text) DO UPDATE SET
            option_a = EXCLUDED.option_a,
            option_b = EXCLUDED.option_b,
            option_c = EXCLUDED.option_c,
            option_d = EXCLUDED.option_d,
            correct_option = EXCLUDED.correct_option,
            explanation = EXCLUDED.explanation,
            difficulty = EXCLUDED.difficulty
        WHERE (aptitude_problems.option_a, aptitude_problems.option_b, aptitude_problems.option_c,
               aptitude_problems.option_d, aptitude_problems.correct_option,
               aptitude_problems.explanation, aptitude_problems.difficulty)
            IS DISTINCT FROM
              (EXCLUDED.option_a, EXCLUDED.option_b, EXCLUDED.option_c, EXCLUDED.option_d,
               EXCLUDED.correct_option, EXCLUDED.explanation, EXCLUDED.difficulty)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(topic_id)
    .bind(&problem.question_text)
    .bind(a)
    .bind(b)
    .bind(c)
    .bind(d)
    .bind(problem.correct_option.as_str())
    .bind(&problem.explanation)
    .bind(problem.difficulty.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

/// Member problems are resolved to ids inside the transaction, so a set may list
/// problems written earlier in the same batch.
async fn upsert_practice_set(
    conn: &mut PgConnection,
    set: &AptitudePracticeSet,
) -> Result<Upserted, StoreError> {
    let mut problem_ids: Vec<Uuid> = Vec::with_capacity(set.problems.len());
    for problem in &set.problems {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT p.id FROM aptitude_problems p
            JOIN aptitude_topics t ON t.id = p.topic_id
            JOIN aptitude_categories c ON c.id = t.category_id
            WHERE c.name = $1 AND t.name = $2 AND p.question_text = $3
            "#,
        )
        .bind(&problem.category_name)
        .bind(&problem.topic_name)
        .bind(&problem.question_text)
        .fetch_optional(&mut *conn)
        .await?;
        match id {
            Some(id) => problem_ids.push(id),
            None => {
                return Err(StoreError::Conflict(format!(
                    "practice set '{}' references unknown problem '{}'",
                    set.title, problem.question_text
                )))
            }
        }
    }

    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO aptitude_practice_sets (id, title, description, problem_ids)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (title) DO UPDATE SET
            description = EXCLUDED.description,
            problem_ids = EXCLUDED.problem_ids
        WHERE (aptitude_practice_sets.description, aptitude_practice_sets.problem_ids)
            IS DISTINCT FROM (EXCLUDED.description, EXCLUDED.problem_ids)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&set.title)
    .bind(&set.description)
    .bind(&problem_ids)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_practice_topic(
    conn: &mut PgConnection,
    topic: &PracticeTopic,
) -> Result<Upserted, StoreError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO practice_topics (id, name, slug, description)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE SET slug = EXCLUDED.slug, description = EXCLUDED.description
        WHERE (practice_topics.slug, practice_topics.description)
            IS DISTINCT FROM (EXCLUDED.slug, EXCLUDED.description)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&topic.name)
    .bind(&topic.slug)
    .bind(&topic.description)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_company(
    conn: &mut PgConnection,
    company: &PracticeCompany,
) -> Result<Upserted, StoreError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO practice_companies (id, name, slug, website)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE SET slug = EXCLUDED.slug, website = EXCLUDED.website
        WHERE (practice_companies.slug, practice_companies.website)
            IS DISTINCT FROM (EXCLUDED.slug, EXCLUDED.website)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&company.name)
    .bind(&company.slug)
    .bind(&company.website)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_practice_problem(
    conn: &mut PgConnection,
    problem: &PracticeProblem,
) -> Result<Upserted, StoreError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO practice_problems
            (id, problem_number, title, difficulty, description, constraints,
             example_input, example_output, example_explanation, hints,
             time_complexity, space_complexity, topics, companies, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        ON CONFLICT (problem_number) DO UPDATE SET
            title = EXCLUDED.title,
            difficulty = EXCLUDED.difficulty,
            description = EXCLUDED.description,
            constraints = EXCLUDED.constraints,
            example_input = EXCLUDED.example_input,
            example_output = EXCLUDED.example_output,
            example_explanation = EXCLUDED.example_explanation,
            hints = EXCLUDED.hints,
            time_complexity = EXCLUDED.time_complexity,
            space_complexity = EXCLUDED.space_complexity,
            topics = EXCLUDED.topics,
            companies = EXCLUDED.companies,
            is_active = EXCLUDED.is_active
        WHERE (practice_problems.title, practice_problems.difficulty, practice_problems.description,
               practice_problems.constraints, practice_problems.example_input,
               practice_problems.example_output, practice_problems.example_explanation,
               practice_problems.hints, practice_problems.time_complexity,
               practice_problems.space_complexity, practice_problems.topics,
               practice_problems.companies, practice_problems.is_active)
            IS DISTINCT FROM
              (EXCLUDED.title, EXCLUDED.difficulty, EXCLUDED.description, EXCLUDED.constraints,
               EXCLUDED.example_input, EXCLUDED.example_output, EXCLUDED.example_explanation,
               EXCLUDED.hints, EXCLUDED.time_complexity, EXCLUDED.space_complexity,
               EXCLUDED.topics, EXCLUDED.companies, EXCLUDED.is_active)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(problem.problem_number)
    .bind(&problem.title)
    .bind(problem.difficulty.as_str())
    .bind(&problem.description)
    .bind(&problem.constraints)
    .bind(&problem.example_input)
    .bind(&problem.example_output)
    .bind(&problem.example_explanation)
    .bind(&problem.hints)
    .bind(&problem.time_complexity)
    .bind(&problem.space_complexity)
    .bind(&problem.topics)
    .bind(&problem.companies)
    .bind(problem.is_active)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_test_case(
    conn: &mut PgConnection,
    case: &PracticeTestCase,
) -> Result<Upserted, StoreError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO practice_test_cases
            (id, problem_number, case_order, input_data, expected_output, is_sample, explanation)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (problem_number, case_order) DO UPDATE SET
            input_data = EXCLUDED.input_data,
            expected_output = EXCLUDED.expected_output,
            is_sample = EXCLUDED.is_sample,
            explanation = EXCLUDED.explanation
        WHERE (practice_test_cases.input_data, practice_test_cases.expected_output,
               practice_test_cases.is_sample, practice_test_cases.explanation)
            IS DISTINCT FROM
              (EXCLUDED.input_data, EXCLUDED.expected_output, EXCLUDED.is_sample,
               EXCLUDED.explanation)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(case.problem_number)
    .bind(case.order)
    .bind(&case.input_data)
    .bind(&case.expected_output)
    .bind(case.is_sample)
    .bind(&case.explanation)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_code_template(
    conn: &mut PgConnection,
    template: &CodeTemplate,
) -> Result<Upserted, StoreError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO practice_code_templates
            (id, problem_number, language, template_code, solution_code)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (problem_number, language) DO UPDATE SET
            template_code = EXCLUDED.template_code,
            solution_code = EXCLUDED.solution_code
        WHERE (practice_code_templates.template_code, practice_code_templates.solution_code)
            IS DISTINCT FROM (EXCLUDED.template_code, EXCLUDED.solution_code)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(template.problem_number)
    .bind(&template.language)
    .bind(&template.template_code)
    .bind(&template.solution_code)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

async fn upsert_editorial(
    conn: &mut PgConnection,
    editorial: &Editorial,
) -> Result<Upserted, StoreError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO practice_editorials
            (id, problem_number, approach, complexity_analysis, code_explanation, video_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (problem_number) DO UPDATE SET
            approach = EXCLUDED.approach,
            complexity_analysis = EXCLUDED.complexity_analysis,
            code_explanation = EXCLUDED.code_explanation,
            video_url = EXCLUDED.video_url
        WHERE (practice_editorials.approach, practice_editorials.complexity_analysis,
               practice_editorials.code_explanation, practice_editorials.video_url)
            IS DISTINCT FROM
              (EXCLUDED.approach, EXCLUDED.complexity_analysis, EXCLUDED.code_explanation,
               EXCLUDED.video_url)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(editorial.problem_number)
    .bind(&editorial.approach)
    .bind(&editorial.complexity_analysis)
    .bind(&editorial.code_explanation)
    .bind(&editorial.video_url)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

/// Topic and article rows ride along with the lesson; only the lesson is counted.
async fn upsert_lesson(conn: &mut PgConnection, lesson: &ContentLesson) -> Result<Upserted, StoreError> {
    sqlx::query(
        r#"
        INSERT INTO content_topics (id, slug, name, description)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description
        WHERE (content_topics.name, content_topics.description)
            IS DISTINCT FROM (EXCLUDED.name, EXCLUDED.description)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&lesson.topic_slug)
    .bind(&lesson.topic_name)
    .bind(&lesson.topic_description)
    .execute(&mut *conn)
    .await?;

    if let Some(article) = &lesson.article {
        sqlx::query(
            r#"
            INSERT INTO content_articles (id, slug, title, category, content)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO UPDATE SET
                title = EXCLUDED.title,
                category = EXCLUDED.category,
                content = EXCLUDED.content
            WHERE (content_articles.title, content_articles.category, content_articles.content)
                IS DISTINCT FROM (EXCLUDED.title, EXCLUDED.category, EXCLUDED.content)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&article.slug)
        .bind(&article.title)
        .bind(&article.category)
        .bind(&article.content)
        .execute(&mut *conn)
        .await?;
    }

    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO content_lessons
            (id, topic_slug, title, content, lesson_order, question, snippets, article_slug)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (topic_slug, title) DO UPDATE SET
            content = EXCLUDED.content,
            lesson_order = EXCLUDED.lesson_order,
            question = EXCLUDED.question,
            snippets = EXCLUDED.snippets,
            article_slug = EXCLUDED.article_slug
        WHERE (content_lessons.content, content_lessons.lesson_order, content_lessons.question,
               content_lessons.snippets, content_lessons.article_slug)
            IS DISTINCT FROM
              (EXCLUDED.content, EXCLUDED.lesson_order, EXCLUDED.question, EXCLUDED.snippets,
               EXCLUDED.article_slug)
        RETURNING (xmax = 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&lesson.topic_slug)
    .bind(&lesson.title)
    .bind(&lesson.content)
    .bind(lesson.order)
    .bind(lesson.question.as_ref().map(Json))
    .bind(Json(&lesson.snippets))
    .bind(lesson.article.as_ref().map(|a| a.slug.as_str()))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(outcome(inserted))
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    user_ref: Uuid,
    track: String,
    role: String,
    skills: Vec<String>,
    status: String,
    transcript: Json<Vec<Turn>>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for InterviewSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, StoreError> {
        Ok(InterviewSession {
            id: row.id,
            user_ref: row.user_ref,
            track: row.track.parse().map_err(StoreError::Corrupt)?,
            role: row.role,
            skills: row.skills,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            transcript: row.transcript.0,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReportRow {
    session_id: Uuid,
    scores_breakdown: Json<BTreeMap<String, f64>>,
    overall_score: i16,
    band: String,
    summary_text: String,
    generated_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for InterviewReport {
    type Error = StoreError;

    fn try_from(row: ReportRow) -> Result<Self, StoreError> {
        Ok(InterviewReport {
            session_id: row.session_id,
            scores_breakdown: row.scores_breakdown.0,
            overall_score: score_from_db(row.overall_score)?,
            band: row.band,
            summary_text: row.summary_text,
            generated_at: row.generated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: Uuid,
    user_ref: Uuid,
    ats_score: i16,
    breakdown: Json<BTreeMap<String, u8>>,
    suggestions: Vec<String>,
    target_role: Option<String>,
    target_skills: Vec<String>,
    missing_keywords: Vec<String>,
    highlights: Vec<String>,
    provider: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRow> for ResumeAnalysis {
    type Error = StoreError;

    fn try_from(row: AnalysisRow) -> Result<Self, StoreError> {
        Ok(ResumeAnalysis {
            id: row.id,
            user_ref: row.user_ref,
            ats_score: score_from_db(row.ats_score)?,
            breakdown: row.breakdown.0,
            suggestions: row.suggestions,
            target_role: row.target_role,
            target_skills: row.target_skills,
            missing_keywords: row.missing_keywords,
            highlights: row.highlights,
            provider: row.provider,
            created_at: row.created_at,
        })
    }
}

fn score_from_db(value: i16) -> Result<u8, StoreError> {
    u8::try_from(value).map_err(|_| StoreError::Corrupt(format!("score {value} out of range")))
}

const TERMINAL_GUARD: &str = "status NOT IN ('completed', 'failed')";

async fn write_session(conn: &mut PgConnection, session: &InterviewSession) -> Result<(), StoreError> {
    let updated = sqlx::query(&format!(
        r#"
        UPDATE interview_sessions
        SET status = $2, transcript = $3, failure_reason = $4, updated_at = $5
        WHERE id = $1 AND {TERMINAL_GUARD}
        "#
    ))
    .bind(session.id)
    .bind(session.status.as_str())
    .bind(Json(&session.transcript))
    .bind(&session.failure_reason)
    .bind(session.updated_at)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        let exists: Option<String> =
            sqlx::query_scalar("SELECT status FROM interview_sessions WHERE id = $1")
                .bind(session.id)
                .fetch_optional(&mut *conn)
                .await?;
        return Err(match exists {
            Some(status) => StoreError::Conflict(format!(
                "interview {} is already {status}",
                session.id
            )),
            None => StoreError::NotFound {
                entity: "interview",
                id: session.id.to_string(),
            },
        });
    }
    Ok(())
}

#[async_trait]
impl InterviewStore for PgStore {
    async fn insert_session(&self, session: &InterviewSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO interview_sessions
                (id, user_ref, track, role, skills, status, transcript, failure_reason,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.id)
        .bind(session.user_ref)
        .bind(session.track.as_str())
        .bind(&session.role)
        .bind(&session.skills)
        .bind(session.status.as_str())
        .bind(Json(&session.transcript))
        .bind(&session.failure_reason)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_session(&self, session: &InterviewSession) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        write_session(&mut conn, session).await
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM interview_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(InterviewSession::try_from).transpose()
    }

    async fn complete_session(
        &self,
        session: &InterviewSession,
        report: &InterviewReport,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        write_session(&mut tx, session).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO interview_reports
                (session_id, scores_breakdown, overall_score, band, summary_text, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(report.session_id)
        .bind(Json(&report.scores_breakdown))
        .bind(i16::from(report.overall_score))
        .bind(&report.band)
        .bind(&report.summary_text)
        .bind(report.generated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::Conflict(format!(
                "interview {} already has a report",
                report.session_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_report(&self, session_id: Uuid) -> Result<Option<InterviewReport>, StoreError> {
        let row = sqlx::query_as::<_, ReportRow>(
            "SELECT * FROM interview_reports WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(InterviewReport::try_from).transpose()
    }
}

#[async_trait]
impl ResumeStore for PgStore {
    async fn insert_analysis(&self, analysis: &ResumeAnalysis) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO resume_analyses
                (id, user_ref, ats_score, breakdown, suggestions,
                 target_role, target_skills, missing_keywords, highlights, provider, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(analysis.id)
        .bind(analysis.user_ref)
        .bind(i16::from(analysis.ats_score))
        .bind(Json(&analysis.breakdown))
        .bind(&analysis.suggestions)
        .bind(&analysis.target_role)
        .bind(&analysis.target_skills)
        .bind(&analysis.missing_keywords)
        .bind(&analysis.highlights)
        .bind(&analysis.provider)
        .bind(analysis.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_analysis(&self, user_ref: Uuid) -> Result<Option<ResumeAnalysis>, StoreError> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT * FROM resume_analyses
            WHERE user_ref = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_ref)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ResumeAnalysis::try_from).transpose()
    }

    async fn list_analyses(&self, user_ref: Uuid) -> Result<Vec<ResumeAnalysis>, StoreError> {
        let rows = sqlx::query_as::<_, AnalysisRow>(
            "SELECT * FROM resume_analyses WHERE user_ref = $1 ORDER BY created_at DESC",
        )
        .bind(user_ref)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ResumeAnalysis::try_from).collect()
    }
}
