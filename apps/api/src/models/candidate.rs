use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub linked_in: Option<String>,
    pub portfolio: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EducationRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub company: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A document row references its backing file by the generated `filename`;
/// `original_name` is untrusted client input kept for display only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub document_type: String,
    pub created_at: DateTime<Utc>,
}

/// A candidate together with all of its child rows, as created by one intake
/// transaction and as returned by the fetch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAggregate {
    #[serde(flatten)]
    pub candidate: CandidateRow,
    pub educations: Vec<EducationRow>,
    pub experiences: Vec<ExperienceRow>,
    pub documents: Vec<DocumentRow>,
}

/// One page of a listing projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Page {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}
