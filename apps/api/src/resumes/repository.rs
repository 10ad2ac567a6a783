//! Resume persistence behind a trait.
//!
//! `AppState` holds an `Arc<dyn ResumeRepository>`. Production uses Postgres
//! (one JSONB document per resume); tests and database-less runs use the
//! in-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{ResumeContent, ResumeDocument};

#[async_trait]
pub trait ResumeRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<ResumeDocument>, AppError>;

    /// Inserts or replaces the stored document with the same id.
    async fn save(&self, resume: &ResumeDocument) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgResumeRepository {
    pool: PgPool,
}

impl PgResumeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ResumeRow {
    id: Uuid,
    content: Json<ResumeContent>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ResumeRow> for ResumeDocument {
    fn from(row: ResumeRow) -> Self {
        ResumeDocument {
            id: row.id,
            content: row.content.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ResumeRepository for PgResumeRepository {
    async fn get(&self, id: Uuid) -> Result<Option<ResumeDocument>, AppError> {
        let row: Option<ResumeRow> = sqlx::query_as(
            "SELECT id, content, created_at, updated_at FROM resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ResumeDocument::from))
    }

    async fn save(&self, resume: &ResumeDocument) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO resumes (id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET content = EXCLUDED.content,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(resume.id)
        .bind(Json(&resume.content))
        .bind(resume.created_at)
        .bind(resume.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryResumeRepository {
    resumes: RwLock<HashMap<Uuid, ResumeDocument>>,
}

#[async_trait]
impl ResumeRepository for InMemoryResumeRepository {
    async fn get(&self, id: Uuid) -> Result<Option<ResumeDocument>, AppError> {
        Ok(self.resumes.read().await.get(&id).cloned())
    }

    async fn save(&self, resume: &ResumeDocument) -> Result<(), AppError> {
        self.resumes
            .write()
            .await
            .insert(resume.id, resume.clone());
        Ok(())
    }
}
