//! Where finished documents go.
//!
//! `AppState` holds an `Arc<dyn DocumentSink>`: the filesystem sink by default,
//! S3/MinIO when a bucket is configured. Both either store the whole document
//! or nothing.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::export::ExportError;

#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Stores `bytes` as `filename` under `scope` and returns its location.
    async fn persist(&self, scope: &str, filename: &str, bytes: Vec<u8>)
        -> Result<String, ExportError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Filesystem
// ────────────────────────────────────────────────────────────────────────────

/// Writes into `<root>/<scope>/<filename>` via a temp file + rename, so a
/// reader never observes a half-written PDF.
pub struct FsDocumentSink {
    root: PathBuf,
}

impl FsDocumentSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for FsDocumentSink {
    async fn persist(
        &self,
        scope: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ExportError> {
        let dir = self.root.join(scope);
        let target = dir.join(filename);
        let location = target.display().to_string();

        tokio::task::spawn_blocking(move || Self::write_atomic(&dir, &target, &bytes))
            .await
            .map_err(|e| ExportError::Assembly(format!("write task failed: {e}")))?
            .map_err(|e| ExportError::Assembly(format!("failed to save {location}: {e}")))?;

        info!("Saved export to {location}");
        Ok(location)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO
// ────────────────────────────────────────────────────────────────────────────

pub struct S3DocumentSink {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DocumentSink {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl DocumentSink for S3DocumentSink {
    async fn persist(
        &self,
        scope: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ExportError> {
        let key = format!("exports/{scope}/{filename}");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("application/pdf")
            .content_disposition(format!("attachment; filename=\"{filename}\""))
            .send()
            .await
            .map_err(|e| ExportError::Assembly(format!("S3 upload failed: {e}")))?;

        info!("Uploaded export to s3://{}/{}", self.bucket, key);
        Ok(format!("s3://{}/{}", self.bucket, key))
    }
}
