use std::sync::Arc;

use crate::config::Config;
use crate::export::{ExportContext, ExportGate};
use crate::resumes::repository::ResumeRepository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Postgres in production, in-memory when no DATABASE_URL is set.
    pub resumes: Arc<dyn ResumeRepository>,
    /// Fonts, off-screen container and document sink for the export pipeline.
    pub export: Arc<ExportContext>,
    pub export_gate: Arc<ExportGate>,
}
