use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::export::{ExportSettings, PageGeometry};

/// S3 / MinIO destination for finished exports.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a set variable cannot be parsed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Without a database the service keeps resumes in memory.
    pub database_url: Option<String>,
    /// Without a bucket exports are written under `export_dir`.
    pub s3: Option<S3Config>,
    pub export_dir: PathBuf,
    pub font_path: Option<PathBuf>,
    /// Scale the editor preview is shown at. Exports ignore it.
    pub preview_scale: f32,
    pub export: ExportSettings,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3 = match optional_env("S3_BUCKET") {
            Some(bucket) => Some(S3Config {
                bucket,
                endpoint: require_env("S3_ENDPOINT")?,
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        let defaults = ExportSettings::default();
        let page = PageGeometry {
            width_mm: parse_env("EXPORT_PAGE_WIDTH_MM", defaults.page.width_mm)?,
            height_mm: parse_env("EXPORT_PAGE_HEIGHT_MM", defaults.page.height_mm)?,
            margin_mm: parse_env("EXPORT_MARGIN_MM", defaults.page.margin_mm)?,
        };
        let export = ExportSettings {
            pixel_density: parse_env("EXPORT_PIXEL_DENSITY", defaults.pixel_density)?,
            target_width: parse_env("EXPORT_TARGET_WIDTH", defaults.target_width)?,
            page,
            settle_delay: Duration::from_millis(parse_env("EXPORT_SETTLE_MS", 0u64)?),
            max_pixels: parse_env("EXPORT_MAX_PIXELS", defaults.max_pixels)?,
            ..defaults
        };
        validate_export(&export)?;

        let preview_scale = parse_env("PREVIEW_SCALE", 0.6f32)?;
        if !(preview_scale.is_finite() && preview_scale > 0.0) {
            bail!("PREVIEW_SCALE must be a positive number, got {preview_scale}");
        }

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            s3,
            export_dir: optional_env("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("exports")),
            font_path: optional_env("EXPORT_FONT_PATH").map(PathBuf::from),
            preview_scale,
            export,
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn validate_export(export: &ExportSettings) -> Result<()> {
    export
        .page
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid EXPORT_PAGE_* / EXPORT_MARGIN_MM settings")?;
    if !(export.pixel_density.is_finite() && export.pixel_density > 0.0) {
        bail!("EXPORT_PIXEL_DENSITY must be positive, got {}", export.pixel_density);
    }
    if !(export.target_width.is_finite() && export.target_width >= 1.0) {
        bail!("EXPORT_TARGET_WIDTH must be at least 1, got {}", export.target_width);
    }
    if export.max_pixels == 0 {
        bail!("EXPORT_MAX_PIXELS must be non-zero");
    }
    Ok(())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}='{raw}' is invalid: {e}")),
        None => Ok(default),
    }
}
