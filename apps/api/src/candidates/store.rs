//! Persistence seam for the candidate workflow.
//!
//! The coordinator and the read handlers depend on the [`CandidateStore`]
//! trait rather than on a pool directly, so they can be exercised against a
//! substitutable in-memory store. [`PgCandidateStore`] is the production
//! implementation; its `create_candidate` is the single authoritative atomic
//! write of the intake workflow.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::candidates::uploads::{StoredFile, DOCUMENT_TYPE};
use crate::candidates::validation::ValidCandidate;
use crate::models::candidate::{
    CandidateAggregate, CandidateRow, DocumentRow, EducationRow, ExperienceRow, Page,
};

pub const SUGGESTION_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique constraint on `candidates.email` fired at insert time.
    #[error("A candidate with this email already exists")]
    DuplicateEmail,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Advisory existence check by normalized email. The unique constraint at
    /// insert time is the authority; this only short-circuits the obvious case.
    async fn email_taken(&self, email: &str) -> Result<bool, StoreError>;

    /// Inserts the candidate, its education and experience rows, and one
    /// document row per stored file, all in one transaction. Either the whole
    /// aggregate becomes visible or nothing does.
    async fn create_candidate(
        &self,
        candidate: &ValidCandidate,
        documents: &[StoredFile],
    ) -> Result<CandidateAggregate, StoreError>;

    async fn fetch_candidate(&self, id: Uuid) -> Result<Option<CandidateAggregate>, StoreError>;

    async fn list_candidates(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<Page<CandidateRow>, StoreError>;

    async fn suggest_institutions(&self, query: &str) -> Result<Vec<String>, StoreError>;

    async fn suggest_companies(&self, query: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        PgCandidateStore { pool }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM candidates WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    async fn create_candidate(
        &self,
        candidate: &ValidCandidate,
        documents: &[StoredFile],
    ) -> Result<CandidateAggregate, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: CandidateRow = sqlx::query_as(
            r#"
            INSERT INTO candidates (id, first_name, last_name, email, phone, address, linked_in, portfolio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&candidate.first_name)
        .bind(&candidate.last_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.address)
        .bind(&candidate.linked_in)
        .bind(&candidate.portfolio)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_candidate_insert_err)?;

        let mut educations = Vec::with_capacity(candidate.educations.len());
        for edu in &candidate.educations {
            let edu_row: EducationRow = sqlx::query_as(
                r#"
                INSERT INTO educations
                    (id, candidate_id, institution, degree, field_of_study, start_date, end_date, current, description)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(&edu.institution)
            .bind(&edu.degree)
            .bind(&edu.field_of_study)
            .bind(edu.start_date)
            .bind(edu.end_date)
            .bind(edu.current)
            .bind(&edu.description)
            .fetch_one(&mut *tx)
            .await?;
            educations.push(edu_row);
        }

        let mut experiences = Vec::with_capacity(candidate.experiences.len());
        for exp in &candidate.experiences {
            let exp_row: ExperienceRow = sqlx::query_as(
                r#"
                INSERT INTO experiences
                    (id, candidate_id, company, position, start_date, end_date, current, description)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(&exp.company)
            .bind(&exp.position)
            .bind(exp.start_date)
            .bind(exp.end_date)
            .bind(exp.current)
            .bind(&exp.description)
            .fetch_one(&mut *tx)
            .await?;
            experiences.push(exp_row);
        }

        let mut doc_rows = Vec::with_capacity(documents.len());
        for doc in documents {
            let doc_row: DocumentRow = sqlx::query_as(
                r#"
                INSERT INTO documents
                    (id, candidate_id, filename, original_name, mime_type, size_bytes, document_type)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(&doc.filename)
            .bind(&doc.original_name)
            .bind(&doc.mime_type)
            .bind(doc.size_bytes)
            .bind(DOCUMENT_TYPE)
            .fetch_one(&mut *tx)
            .await?;
            doc_rows.push(doc_row);
        }

        tx.commit().await?;

        Ok(CandidateAggregate {
            candidate: row,
            educations,
            experiences,
            documents: doc_rows,
        })
    }

    async fn fetch_candidate(&self, id: Uuid) -> Result<Option<CandidateAggregate>, StoreError> {
        let candidate: Option<CandidateRow> =
            sqlx::query_as("SELECT * FROM candidates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(candidate) = candidate else {
            return Ok(None);
        };

        let educations: Vec<EducationRow> = sqlx::query_as(
            "SELECT * FROM educations WHERE candidate_id = $1 ORDER BY start_date DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let experiences: Vec<ExperienceRow> = sqlx::query_as(
            "SELECT * FROM experiences WHERE candidate_id = $1 ORDER BY start_date DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let documents: Vec<DocumentRow> = sqlx::query_as(
            "SELECT * FROM documents WHERE candidate_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CandidateAggregate {
            candidate,
            educations,
            experiences,
            documents,
        }))
    }

    async fn list_candidates(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<Page<CandidateRow>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
            .fetch_one(&self.pool)
            .await?;

        let items: Vec<CandidateRow> =
            sqlx::query_as("SELECT * FROM candidates ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind((page - 1) * limit)
                .fetch_all(&self.pool)
                .await?;

        Ok(Page::new(items, total, page, limit))
    }

    async fn suggest_institutions(&self, query: &str) -> Result<Vec<String>, StoreError> {
        let values: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT institution FROM educations WHERE institution ILIKE $1 ORDER BY institution LIMIT $2",
        )
        .bind(format!("%{query}%"))
        .bind(SUGGESTION_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    async fn suggest_companies(&self, query: &str) -> Result<Vec<String>, StoreError> {
        let values: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT company FROM experiences WHERE company ILIKE $1 ORDER BY company LIMIT $2",
        )
        .bind(format!("%{query}%"))
        .bind(SUGGESTION_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }
}

/// The candidate insert is where the email constraint can fire; map that one
/// case to the conflict outcome so callers treat it exactly like a precheck hit.
fn map_candidate_insert_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Database(e)
}
