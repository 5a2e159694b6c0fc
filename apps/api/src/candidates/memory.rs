//! In-memory [`CandidateStore`] double for coordinator and handler tests.
//!
//! Mirrors the Postgres store's observable behavior: duplicate emails are
//! rejected at insert, reads are plain projections. Two switches simulate
//! the failure modes the intake workflow must survive: a full outage and a
//! lost check-then-act race (precheck clean, constraint fires at insert).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::candidates::store::{CandidateStore, StoreError, SUGGESTION_LIMIT};
use crate::candidates::uploads::{StoredFile, DOCUMENT_TYPE};
use crate::candidates::validation::ValidCandidate;
use crate::models::candidate::{
    CandidateAggregate, CandidateRow, DocumentRow, EducationRow, ExperienceRow, Page,
};

#[derive(Default)]
pub struct MemoryCandidateStore {
    candidates: Mutex<Vec<CandidateAggregate>>,
    unavailable: AtomicBool,
    duplicate_on_insert: AtomicBool,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every store call fail, as if the database were unreachable.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    /// Forces the next insert to report a unique violation even though the
    /// precheck saw nothing, simulating a lost race against a concurrent
    /// submission.
    pub fn force_duplicate_on_insert(&self, force: bool) {
        self.duplicate_on_insert.store(force, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.candidates.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let candidates = self.candidates.lock().unwrap();
        Ok(candidates.iter().any(|c| c.candidate.email == email))
    }

    async fn create_candidate(
        &self,
        candidate: &ValidCandidate,
        documents: &[StoredFile],
    ) -> Result<CandidateAggregate, StoreError> {
        self.check_available()?;
        let mut candidates = self.candidates.lock().unwrap();

        if self.duplicate_on_insert.swap(false, Ordering::SeqCst)
            || candidates.iter().any(|c| c.candidate.email == candidate.email)
        {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let candidate_id = Uuid::new_v4();
        let row = CandidateRow {
            id: candidate_id,
            first_name: candidate.first_name.clone(),
            last_name: candidate.last_name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            address: candidate.address.clone(),
            linked_in: candidate.linked_in.clone(),
            portfolio: candidate.portfolio.clone(),
            created_at: now,
        };

        let educations = candidate
            .educations
            .iter()
            .map(|e| EducationRow {
                id: Uuid::new_v4(),
                candidate_id,
                institution: e.institution.clone(),
                degree: e.degree.clone(),
                field_of_study: e.field_of_study.clone(),
                start_date: e.start_date,
                end_date: e.end_date,
                current: e.current,
                description: e.description.clone(),
                created_at: now,
            })
            .collect();

        let experiences = candidate
            .experiences
            .iter()
            .map(|e| ExperienceRow {
                id: Uuid::new_v4(),
                candidate_id,
                company: e.company.clone(),
                position: e.position.clone(),
                start_date: e.start_date,
                end_date: e.end_date,
                current: e.current,
                description: e.description.clone(),
                created_at: now,
            })
            .collect();

        let documents = documents
            .iter()
            .map(|d| DocumentRow {
                id: Uuid::new_v4(),
                candidate_id,
                filename: d.filename.clone(),
                original_name: d.original_name.clone(),
                mime_type: d.mime_type.clone(),
                size_bytes: d.size_bytes,
                document_type: DOCUMENT_TYPE.to_string(),
                created_at: now,
            })
            .collect();

        let aggregate = CandidateAggregate {
            candidate: row,
            educations,
            experiences,
            documents,
        };
        candidates.push(aggregate.clone());
        Ok(aggregate)
    }

    async fn fetch_candidate(&self, id: Uuid) -> Result<Option<CandidateAggregate>, StoreError> {
        self.check_available()?;
        let candidates = self.candidates.lock().unwrap();
        Ok(candidates.iter().find(|c| c.candidate.id == id).cloned())
    }

    async fn list_candidates(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<Page<CandidateRow>, StoreError> {
        self.check_available()?;
        let candidates = self.candidates.lock().unwrap();
        let total = candidates.len() as i64;
        let items = candidates
            .iter()
            .rev() // newest first, like the SQL ordering
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .map(|c| c.candidate.clone())
            .collect();
        Ok(Page::new(items, total, page, limit))
    }

    async fn suggest_institutions(&self, query: &str) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let candidates = self.candidates.lock().unwrap();
        Ok(suggest(
            candidates
                .iter()
                .flat_map(|c| c.educations.iter().map(|e| e.institution.as_str())),
            query,
        ))
    }

    async fn suggest_companies(&self, query: &str) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let candidates = self.candidates.lock().unwrap();
        Ok(suggest(
            candidates
                .iter()
                .flat_map(|c| c.experiences.iter().map(|e| e.company.as_str())),
            query,
        ))
    }
}

fn suggest<'a>(values: impl Iterator<Item = &'a str>, query: &str) -> Vec<String> {
    let needle = query.to_lowercase();
    let mut matches: Vec<String> = values
        .filter(|v| v.to_lowercase().contains(&needle))
        .map(str::to_string)
        .collect();
    matches.sort();
    matches.dedup();
    matches.truncate(SUGGESTION_LIMIT as usize);
    matches
}
