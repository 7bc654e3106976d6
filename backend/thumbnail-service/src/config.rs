/// Configuration management for thumbnail-service
///
/// Loads configuration from environment variables with sensible defaults.
use crate::error::{AppError, Result};
use crate::models::ImageFormat;
use crate::services::ThumbnailServiceConfig;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub thumbnail: ThumbnailConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// HTTP worker count; `None` keeps the actix default (one per core)
    pub workers: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ThumbnailConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub raw_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub format: ImageFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            app: AppConfig {
                host: lookup("THUMBNAIL_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "THUMBNAIL_SERVICE_PORT", 8080)?,
                workers: lookup("THUMBNAIL_WORKERS")
                    .map(|v| parse_value("THUMBNAIL_WORKERS", &v))
                    .transpose()?,
            },
            thumbnail: ThumbnailConfig {
                max_width: parse_or(&lookup, "THUMBNAIL_MAX_WIDTH", 200)?,
                max_height: parse_or(&lookup, "THUMBNAIL_MAX_HEIGHT", 200)?,
                raw_dir: lookup("THUMBNAIL_RAW_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./raw")),
                cache_dir: lookup("THUMBNAIL_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./thumbs")),
                format: lookup("THUMBNAIL_FORMAT")
                    .as_deref()
                    .unwrap_or("png")
                    .parse()
                    .map_err(|e| AppError::Config(format!("THUMBNAIL_FORMAT: {e}")))?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.thumbnail.max_width == 0 || self.thumbnail.max_height == 0 {
            return Err(AppError::Config(
                "THUMBNAIL_MAX_WIDTH and THUMBNAIL_MAX_HEIGHT must be positive".to_string(),
            ));
        }
        if self.app.workers == Some(0) {
            return Err(AppError::Config("THUMBNAIL_WORKERS must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    pub fn service_config(&self) -> ThumbnailServiceConfig {
        ThumbnailServiceConfig {
            raw_dir: self.thumbnail.raw_dir.clone(),
            thumb_dir: self.thumbnail.cache_dir.clone(),
            target_format: self.thumbnail.format,
            max_width: self.thumbnail.max_width,
            max_height: self.thumbnail.max_height,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key}={raw:?}: {e}")))
}
