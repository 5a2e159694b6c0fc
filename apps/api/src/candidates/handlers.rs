//! HTTP surface of the candidate workflow: the multipart intake endpoint and
//! the read projections (listing, fetch-by-id, suggestions).

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::candidates::intake::register_candidate;
use crate::candidates::uploads::{PendingFiles, StoredFile, UploadStore, MAX_FILES_PER_SUBMISSION};
use crate::candidates::validation::CandidatePayload;
use crate::errors::AppError;
use crate::models::candidate::{CandidateAggregate, CandidateRow, Page};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Cap on the whole multipart body (three 5 MiB files plus the JSON part).
pub fn intake_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(16 * 1024 * 1024)
}

/// POST /api/v1/candidates
///
/// Multipart: one `data` text part holding the candidate JSON, plus 0–3
/// `documents` file parts. Files hit storage while the body streams, so a
/// failure while reading the body itself also runs the pending-set cleanup.
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CandidateAggregate>), AppError> {
    let mut pending = PendingFiles::new(&state.uploads);

    match read_submission(&state.uploads, &mut pending, multipart).await {
        Ok((payload, documents)) => {
            let aggregate =
                register_candidate(state.store.as_ref(), payload, documents, pending).await?;
            Ok((StatusCode::CREATED, Json(aggregate)))
        }
        Err(e) => {
            pending.discard().await;
            Err(e)
        }
    }
}

async fn read_submission(
    uploads: &UploadStore,
    pending: &mut PendingFiles,
    mut multipart: Multipart,
) -> Result<(CandidatePayload, Vec<StoredFile>), AppError> {
    let mut payload: Option<CandidatePayload> = None;
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read data part: {e}")))?;
                payload = Some(serde_json::from_str(&text).map_err(|e| {
                    AppError::BadRequest(format!("Candidate data is not valid JSON: {e}"))
                })?);
            }
            Some("documents") => {
                if documents.len() == MAX_FILES_PER_SUBMISSION {
                    return Err(AppError::FileRejected(format!(
                        "At most {MAX_FILES_PER_SUBMISSION} documents are accepted per submission"
                    )));
                }
                documents.push(uploads.store_field(field, pending).await?);
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let payload = payload.ok_or_else(|| AppError::BadRequest("Missing 'data' part".into()))?;
    Ok((payload, documents))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<CandidateRow>>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let result = state.store.list_candidates(page, limit).await?;
    Ok(Json(result))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateAggregate>, AppError> {
    state
        .store
        .fetch_candidate(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Candidate {id} not found")))
}

#[derive(Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub query: String,
}

/// GET /api/v1/candidates/suggestions/institutions
pub async fn handle_suggest_institutions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.store.suggest_institutions(&query.query).await?))
}

/// GET /api/v1/candidates/suggestions/companies
pub async fn handle_suggest_companies(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.store.suggest_companies(&query.query).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
