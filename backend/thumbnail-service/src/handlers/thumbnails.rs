/// Thumbnail handlers - HTTP endpoint for thumbnail renditions
use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::Result;
use crate::services::ThumbnailService;

/// Serve `/<name>.<source ext>.<target format>`
///
/// 200 with the thumbnail bytes and `Content-Type: image/<target format>`,
/// 404 with an empty body when the path or raw original is unknown,
/// 500 when generation or storage fails.
///
/// The name arrives fully percent-decoded, so `%25`, `%2B` and `%2F` address
/// literal `%`, `+` and `/`. Traversal is rejected when the identity is parsed.
pub async fn serve_thumbnail(
    req: HttpRequest,
    filename: web::Path<String>,
    service: web::Data<ThumbnailService>,
) -> Result<HttpResponse> {
    let filename = filename.into_inner();

    let thumbnail = service.load_thumbnail(&filename).await.map_err(|err| {
        if err.is_not_found() {
            tracing::debug!(path = %req.path(), "thumbnail not found: {}", err);
        } else {
            tracing::error!(path = %req.path(), error = %err, "thumbnail request failed");
        }
        err
    })?;

    Ok(HttpResponse::Ok()
        .content_type(thumbnail.content_type)
        .body(thumbnail.data))
}
