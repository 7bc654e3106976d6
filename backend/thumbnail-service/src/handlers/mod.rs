/// HTTP handlers for thumbnail-service
///
/// This module contains handlers for:
/// - Thumbnails: serve cached or freshly generated renditions
/// - Health: liveness probe
use actix_web::web;

pub mod health;
pub mod thumbnails;

pub use health::health_check;
pub use thumbnails::serve_thumbnail;

/// Configure all service routes.
///
/// The thumbnail resource is a catch-all, so it is registered last.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/health", web::get().to(health_check))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics))
        .service(web::resource("/{filename:.*}").route(web::get().to(serve_thumbnail)));
}
