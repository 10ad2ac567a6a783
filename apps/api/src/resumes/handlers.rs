use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{ResumeContent, ResumeDocument};
use crate::resumes::actions::{apply_action, ResumeAction};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ActionBatch {
    pub actions: Vec<ResumeAction>,
}

#[derive(Serialize)]
pub struct ActionBatchResponse {
    pub resume: ResumeDocument,
    /// How many actions in the batch modified the resume.
    pub changed: usize,
}

/// Loads a resume or maps its absence to 404.
pub(crate) async fn load_resume(state: &AppState, id: Uuid) -> Result<ResumeDocument, AppError> {
    state
        .resumes
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

/// POST /api/v1/resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    Json(content): Json<ResumeContent>,
) -> Result<(StatusCode, Json<ResumeDocument>), AppError> {
    let resume = ResumeDocument::new(content);
    state.resumes.save(&resume).await?;
    info!("Created resume {}", resume.id);
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDocument>, AppError> {
    Ok(Json(load_resume(&state, id).await?))
}

/// POST /api/v1/resumes/:id/actions
///
/// Applies the batch in order and saves once. A batch that changes nothing
/// is not written back.
pub async fn handle_apply_actions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(batch): Json<ActionBatch>,
) -> Result<Json<ActionBatchResponse>, AppError> {
    if batch.actions.is_empty() {
        return Err(AppError::Validation("actions must not be empty".to_string()));
    }

    let mut resume = load_resume(&state, id).await?;
    let changed = batch
        .actions
        .into_iter()
        .map(|action| apply_action(&mut resume, action))
        .filter(|changed| *changed)
        .count();

    if changed > 0 {
        state.resumes.save(&resume).await?;
    }
    info!("Applied actions to resume {id}: {changed} changed");

    Ok(Json(ActionBatchResponse { resume, changed }))
}
