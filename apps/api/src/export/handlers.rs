use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::{export_document, ExportReceipt};
use crate::models::resume::{ResumeContent, ResumeDocument, TemplateStyle};
use crate::resumes::handlers::load_resume;
use crate::state::AppState;
use crate::surface::{PreviewSurface, RenderOptions};

const ADHOC_SCOPE: &str = "adhoc";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    /// Overrides the resume's stored template for this export only.
    pub template: Option<TemplateStyle>,
    /// Zoom the editor is currently showing. Has no effect on the output.
    pub preview_scale: Option<f32>,
}

/// An empty body means "all defaults"; anything else must be a valid request.
fn parse_export_request(body: &[u8]) -> Result<ExportRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExportRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("invalid export request body: {e}")))
}

fn preview_surface(
    state: &AppState,
    resume: ResumeDocument,
    template: Option<TemplateStyle>,
    preview_scale: Option<f32>,
) -> Result<PreviewSurface, AppError> {
    let scale = preview_scale.unwrap_or(state.config.preview_scale);
    if !(scale.is_finite() && scale > 0.0) {
        return Err(AppError::Validation(format!(
            "preview_scale must be a positive number, got {scale}"
        )));
    }
    let options = RenderOptions {
        template: template.unwrap_or(resume.content.template),
        placeholders: false,
    };
    Ok(PreviewSurface::new(
        resume,
        options,
        Arc::clone(&state.export.fonts),
        scale,
    ))
}

/// POST /api/v1/resumes/:id/export
pub async fn handle_export_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ExportReceipt>, AppError> {
    let req = parse_export_request(&body)?;

    let _permit = state
        .export_gate
        .try_acquire(id)
        .ok_or_else(|| {
            AppError::Conflict(format!("An export of resume {id} is already running"))
        })?;

    let resume = load_resume(&state, id).await?;
    let owner_name = resume.owner_name().to_string();
    let surface = preview_surface(&state, resume, req.template, req.preview_scale)?;

    let scope = id.to_string();
    let receipt = export_document(Some(&surface), &owner_name, &scope, &state.export).await?;
    Ok(Json(receipt))
}

/// POST /api/v1/export
///
/// Exports unsaved content without storing it as a resume.
pub async fn handle_export_inline(
    State(state): State<AppState>,
    Json(content): Json<ResumeContent>,
) -> Result<Json<ExportReceipt>, AppError> {
    let resume = ResumeDocument::new(content);
    let owner_name = resume.owner_name().to_string();
    let surface = preview_surface(&state, resume, None, None)?;

    let receipt = export_document(Some(&surface), &owner_name, ADHOC_SCOPE, &state.export).await?;
    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_default_request() {
        let req = parse_export_request(b"").unwrap();
        assert!(req.template.is_none());
        assert!(req.preview_scale.is_none());
        assert!(parse_export_request(b" \n").is_ok());
    }

    #[test]
    fn test_request_fields_are_read() {
        let body = br#"{"template":"elegant","preview_scale":0.5}"#;
        let req = parse_export_request(body).unwrap();
        assert_eq!(req.template, Some(TemplateStyle::Elegant));
        assert_eq!(req.preview_scale, Some(0.5));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let bodies: [&[u8]; 3] = [
            b"{not json",
            br#"{"preview_scale":"big"}"#,
            br#"{"template":"gothic"}"#,
        ];
        for body in bodies {
            let err = parse_export_request(body).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
