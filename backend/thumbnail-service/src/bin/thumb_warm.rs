//! Thumbnail warm-up tool
//!
//! Generates the thumbnail for every supported image at the top level of the
//! raw directory so the first HTTP request for it is already a cache hit.
//! Thumbnails that already exist are skipped.
//!
//! Reads the same environment as the HTTP server:
//! - THUMBNAIL_RAW_DIR, THUMBNAIL_CACHE_DIR
//! - THUMBNAIL_FORMAT
//! - THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT

use anyhow::Context;
use thumbnail_service::services::ThumbnailService;
use thumbnail_service::Config;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("thumb_warm=info".parse()?)
                .add_directive("thumbnail_service=info".parse()?),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        raw_dir = %config.thumbnail.raw_dir.display(),
        cache_dir = %config.thumbnail.cache_dir.display(),
        format = %config.thumbnail.format,
        "Configuration loaded"
    );

    let service = ThumbnailService::new(config.service_config())
        .context("invalid thumbnail service configuration")?;
    let report = service
        .warm_cache()
        .await
        .context("failed to walk raw directory")?;

    println!(
        "generated: {}, already cached: {}, failed: {}",
        report.generated, report.skipped, report.failed
    );

    if report.failed > 0 {
        anyhow::bail!("{} thumbnails failed to generate", report.failed);
    }
    Ok(())
}
