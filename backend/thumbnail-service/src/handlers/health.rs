/// Health handlers - liveness probe
use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::models::ImageFormat;
use crate::services::ThumbnailService;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Output format this instance serves
    pub format: ImageFormat,
}

pub async fn health_check(service: web::Data<ThumbnailService>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        format: service.target_format(),
    })
}
