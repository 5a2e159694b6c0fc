//! Candidate intake coordination.
//!
//! Flow: validate → uniqueness precheck → atomic aggregate insert → commit
//! pending files, or discard them on whichever branch failed. The files are
//! already on disk when this runs (their metadata feeds the document rows),
//! so the pending set is deleted explicitly on every abort path; the database
//! transaction alone cannot undo filesystem effects.

use tracing::info;

use crate::candidates::store::CandidateStore;
use crate::candidates::uploads::{PendingFiles, StoredFile};
use crate::candidates::validation::{validate_candidate, CandidatePayload};
use crate::errors::AppError;
use crate::models::candidate::CandidateAggregate;

/// Runs one intake submission to a terminal state.
///
/// On success the pending files become owned by their document rows; on any
/// failure — validation, duplicate email (precheck or insert-time), or a
/// store error — every pending file is deleted before the error is returned.
pub async fn register_candidate(
    store: &dyn CandidateStore,
    payload: CandidatePayload,
    documents: Vec<StoredFile>,
    pending: PendingFiles,
) -> Result<CandidateAggregate, AppError> {
    let valid = match validate_candidate(&payload) {
        Ok(valid) => valid,
        Err(fields) => {
            pending.discard().await;
            return Err(AppError::Validation(fields));
        }
    };

    match store.email_taken(&valid.email).await {
        Ok(false) => {}
        Ok(true) => {
            pending.discard().await;
            return Err(AppError::EmailTaken);
        }
        Err(e) => {
            pending.discard().await;
            return Err(e.into());
        }
    }

    // The precheck above is advisory; a concurrent submission can still win
    // the race, in which case the insert reports DuplicateEmail and this
    // branch surfaces the same conflict.
    match store.create_candidate(&valid, &documents).await {
        Ok(aggregate) => {
            info!(
                "Registered candidate {} ({} educations, {} experiences, {} documents)",
                aggregate.candidate.id,
                aggregate.educations.len(),
                aggregate.experiences.len(),
                aggregate.documents.len()
            );
            pending.commit();
            Ok(aggregate)
        }
        Err(e) => {
            pending.discard().await;
            Err(e.into())
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
