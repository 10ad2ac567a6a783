pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::export::handlers as export;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume store
        .route("/api/v1/resumes", post(resumes::handle_create_resume))
        .route("/api/v1/resumes/:id", get(resumes::handle_get_resume))
        .route(
            "/api/v1/resumes/:id/actions",
            post(resumes::handle_apply_actions),
        )
        // Export
        .route(
            "/api/v1/resumes/:id/export",
            post(export::handle_export_resume),
        )
        .route("/api/v1/export", post(export::handle_export_inline))
        .with_state(state)
}
