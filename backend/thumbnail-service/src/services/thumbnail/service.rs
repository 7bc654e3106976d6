//! Thumbnail service - coordinates lookup, generation and storage
//!
//! This service handles the complete request-to-artifact workflow:
//! 1. Resolve the request path into an image identity
//! 2. Confirm the raw original exists
//! 3. Serve the cached artifact if present
//! 4. Otherwise generate it once (coalesced per key) and persist it

use super::coordinator::GenerationCoordinator;
use super::processor::{ThumbnailProcessor, ThumbnailResult};
use super::resolver::PathResolver;
use super::store::ArtifactStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ImageFormat, ImageIdentity, ThumbnailSpec};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Thumbnail service configuration
#[derive(Clone, Debug)]
pub struct ThumbnailServiceConfig {
    /// Directory holding raw originals
    pub raw_dir: PathBuf,
    /// Directory holding generated thumbnails
    pub thumb_dir: PathBuf,
    /// The single output format this instance serves
    pub target_format: ImageFormat,
    /// Bounding box width in pixels
    pub max_width: u32,
    /// Bounding box height in pixels
    pub max_height: u32,
}

impl ThumbnailServiceConfig {
    fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(AppError::Config(format!(
                "bounding box must be at least 1x1, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        Ok(())
    }
}

/// A thumbnail ready to be served
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Bytes,
    pub content_type: String,
    /// `true` when served from an existing artifact
    pub from_cache: bool,
}

/// Thumbnail service for serving and generating thumbnails
#[derive(Clone)]
pub struct ThumbnailService {
    resolver: PathResolver,
    store: ArtifactStore,
    processor: ThumbnailProcessor,
    coordinator: GenerationCoordinator<Bytes>,
    config: ThumbnailServiceConfig,
    counters: Arc<StatsCounters>,
}

impl ThumbnailService {
    /// Create a new thumbnail service
    pub fn new(config: ThumbnailServiceConfig) -> Result<Self> {
        config.validate()?;

        info!(
            raw_dir = %config.raw_dir.display(),
            thumb_dir = %config.thumb_dir.display(),
            format = %config.target_format,
            max_width = config.max_width,
            max_height = config.max_height,
            "Thumbnail service initialized"
        );

        Ok(Self {
            resolver: PathResolver::new(&config.raw_dir, &config.thumb_dir),
            store: ArtifactStore::new(&config.thumb_dir),
            processor: ThumbnailProcessor::new(),
            coordinator: GenerationCoordinator::new(),
            config,
            counters: Arc::new(StatsCounters::default()),
        })
    }

    /// The single output format this instance serves
    pub fn target_format(&self) -> ImageFormat {
        self.config.target_format
    }

    /// Serve the thumbnail addressed by an HTTP request path such as
    /// `/photo.gif.png`.
    pub async fn load_thumbnail(&self, request_path: &str) -> Result<Thumbnail> {
        let identity = self
            .resolver
            .resolve_identity(request_path, self.config.target_format)?;
        self.ensure_thumbnail(identity).await
    }

    /// Return the thumbnail for `identity`, generating and caching it first if
    /// needed.
    pub async fn ensure_thumbnail(&self, identity: ImageIdentity) -> Result<Thumbnail> {
        let spec = self.spec_for(identity);
        let content_type = spec.target_format.content_type();

        let raw_path = self.resolver.raw_path(&spec.identity);
        if !self.store.exists(&raw_path).await? {
            return Err(AppError::RawAssetMissing(raw_path.display().to_string()));
        }

        let cache_path = self.resolver.cache_path(&spec);
        if self.store.exists(&cache_path).await? {
            debug!(key = %spec.cache_key(), "Thumbnail cache hit");
            metrics::record_cache_lookup(true);
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);

            let data = self.store.read(&cache_path).await?;
            return Ok(Thumbnail {
                data,
                content_type,
                from_cache: true,
            });
        }

        metrics::record_cache_lookup(false);
        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);

        let key = spec.cache_key();
        let work = generate_artifact(
            self.store.clone(),
            self.processor,
            spec,
            raw_path,
            cache_path,
            self.counters.clone(),
        );
        let data = self.coordinator.run_once(key.as_str(), work).await?;

        Ok(Thumbnail {
            data,
            content_type,
            from_cache: false,
        })
    }

    /// Generate thumbnails for every supported original at the top level of
    /// the raw directory. Existing artifacts are left untouched.
    pub async fn warm_cache(&self) -> Result<WarmReport> {
        let raw_dir = self.resolver.raw_dir();
        let mut entries = tokio::fs::read_dir(raw_dir)
            .await
            .map_err(|e| AppError::storage(format!("list {}", raw_dir.display()), e))?;

        let mut report = WarmReport::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::storage(format!("list {}", raw_dir.display()), e))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !is_file || name.starts_with('.') || ImageFormat::from_path(&name).is_err() {
                continue;
            }

            let identity = match ImageIdentity::parse(&name) {
                Ok(identity) => identity,
                Err(_) => continue,
            };

            match self.ensure_thumbnail(identity).await {
                Ok(thumb) if thumb.from_cache => report.skipped += 1,
                Ok(_) => report.generated += 1,
                Err(e) => {
                    warn!(image = %name, error = %e, "Failed to warm thumbnail");
                    report.failed += 1;
                }
            }
        }

        info!(
            generated = report.generated,
            skipped = report.skipped,
            failed = report.failed,
            "Cache warm-up finished"
        );
        Ok(report)
    }

    /// Get statistics about thumbnail generation
    pub fn stats(&self) -> ThumbnailStats {
        ThumbnailStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
            generated: self.counters.generated.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    fn spec_for(&self, identity: ImageIdentity) -> ThumbnailSpec {
        ThumbnailSpec {
            identity,
            target_format: self.config.target_format,
            max_width: self.config.max_width,
            max_height: self.config.max_height,
        }
    }
}

/// Read raw → generate → write artifact. Runs at most once per key at a time.
async fn generate_artifact(
    store: ArtifactStore,
    processor: ThumbnailProcessor,
    spec: ThumbnailSpec,
    raw_path: PathBuf,
    cache_path: PathBuf,
    counters: Arc<StatsCounters>,
) -> Result<Bytes> {
    let key = spec.cache_key();

    // A run that finished between our cache check and joining the
    // coordinator has already written the artifact.
    if store.exists(&cache_path).await? {
        debug!(key = %key, "Artifact appeared before generation started");
        return store.read(&cache_path).await;
    }

    match run_pipeline(&store, processor, spec, &raw_path, &cache_path).await {
        Ok(thumbnail) => {
            counters.generated.fetch_add(1, Ordering::Relaxed);
            metrics::record_generation(true);
            info!(
                key = %key,
                width = thumbnail.width,
                height = thumbnail.height,
                size = thumbnail.data.len(),
                "Thumbnail created successfully"
            );
            Ok(thumbnail.data)
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            metrics::record_generation(false);
            error!(key = %key, error = %e, "Failed to generate thumbnail");
            Err(e)
        }
    }
}

async fn run_pipeline(
    store: &ArtifactStore,
    processor: ThumbnailProcessor,
    spec: ThumbnailSpec,
    raw_path: &Path,
    cache_path: &Path,
) -> Result<ThumbnailResult> {
    let source_format = spec.identity.source_format()?;
    let raw = store.read(raw_path).await?;
    let thumbnail = processor.generate_async(raw, source_format, spec).await?;
    store.write_atomic(cache_path, &thumbnail.data).await?;
    Ok(thumbnail)
}

#[derive(Debug, Default)]
struct StatsCounters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    generated: AtomicU64,
    failed: AtomicU64,
}

/// Statistics about thumbnail generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Completed decode → resize → encode runs
    pub generated: u64,
    pub failed: u64,
}

/// Outcome of [`ThumbnailService::warm_cache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
}
