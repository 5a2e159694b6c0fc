use std::sync::Arc;

use crate::candidates::store::CandidateStore;
use crate::candidates::uploads::UploadStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Store seam: `PgCandidateStore` in production, swappable in tests.
    pub store: Arc<dyn CandidateStore>,
    pub uploads: UploadStore,
}
