/// Thumbnail Service - HTTP Server
///
/// Serves lazily generated thumbnails of the images in a raw directory.
use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use std::io;
use thumbnail_service::handlers;
use thumbnail_service::metrics::MetricsMiddleware;
use thumbnail_service::services::ThumbnailService;
use thumbnail_service::Config;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thumbnail_service=info,actix_web=info".into()),
        )
        .init();

    // Load configuration from environment
    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let http_bind_address = config.bind_address();
    let service = ThumbnailService::new(config.service_config())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let service = web::Data::new(service);

    tracing::info!(
        address = %http_bind_address,
        format = %config.thumbnail.format,
        "Thumbnail service starting HTTP server"
    );

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(MetricsMiddleware)
            .wrap(actix_middleware::Logger::default())
            .configure(handlers::configure)
    });

    if let Some(workers) = config.app.workers {
        server = server.workers(workers);
    }

    let result = server.bind(&http_bind_address)?.run().await;

    tracing::info!("Thumbnail-service shutting down");
    result
}
