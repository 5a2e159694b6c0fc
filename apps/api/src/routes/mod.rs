pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::candidates::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/candidates",
            get(handlers::handle_list_candidates)
                .post(handlers::handle_create_candidate)
                .layer(handlers::intake_body_limit()),
        )
        .route(
            "/api/v1/candidates/:id",
            get(handlers::handle_get_candidate),
        )
        .route(
            "/api/v1/candidates/suggestions/institutions",
            get(handlers::handle_suggest_institutions),
        )
        .route(
            "/api/v1/candidates/suggestions/companies",
            get(handlers::handle_suggest_companies),
        )
        .with_state(state)
}
