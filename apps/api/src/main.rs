mod config;
mod db;
mod errors;
mod export;
mod models;
mod resumes;
mod routes;
mod state;
mod surface;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{Config, S3Config};
use crate::db::create_pool;
use crate::export::{
    DocumentSink, ExportContext, ExportGate, FsDocumentSink, OffscreenContainer, S3DocumentSink,
};
use crate::resumes::{InMemoryResumeRepository, PgResumeRepository, ResumeRepository};
use crate::routes::build_router;
use crate::state::AppState;
use crate::surface::FontBook;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparsable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Vitae API v{}", env!("CARGO_PKG_VERSION"));

    // Resume store: PostgreSQL when configured
    let resumes: Arc<dyn ResumeRepository> = match &config.database_url {
        Some(url) => {
            let db = create_pool(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgResumeRepository::new(db))
        }
        None => {
            warn!("DATABASE_URL not set; resumes are kept in memory only");
            Arc::new(InMemoryResumeRepository::default())
        }
    };

    // Export destination: S3 / MinIO when a bucket is configured
    let sink: Arc<dyn DocumentSink> = match &config.s3 {
        Some(s3) => {
            let client = build_s3_client(s3).await;
            info!("S3 client initialized (bucket: {})", s3.bucket);
            Arc::new(S3DocumentSink::new(client, s3.bucket.clone()))
        }
        None => {
            info!("Writing exports to {}", config.export_dir.display());
            Arc::new(FsDocumentSink::new(config.export_dir.clone()))
        }
    };

    let fonts = match &config.font_path {
        Some(path) => FontBook::from_file(path)
            .with_context(|| format!("failed to load EXPORT_FONT_PATH {}", path.display()))?,
        None => {
            info!("No EXPORT_FONT_PATH set; using built-in block glyphs");
            FontBook::builtin()
        }
    };

    info!(
        "Export settings: {}x density, {} px wide, {}x{} mm pages, {} mm margin",
        config.export.pixel_density,
        config.export.target_width,
        config.export.page.width_mm,
        config.export.page.height_mm,
        config.export.page.margin_mm
    );

    let export = ExportContext {
        settings: config.export.clone(),
        fonts: Arc::new(fonts),
        container: OffscreenContainer::new(),
        sink,
    };

    // Build app state
    let state = AppState {
        config: config.clone(),
        resumes,
        export: Arc::new(export),
        export_gate: ExportGate::new(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(s3: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &s3.access_key_id,
        &s3.secret_access_key,
        None,
        None,
        "vitae-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&s3.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
