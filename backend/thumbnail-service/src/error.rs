/// Error types for Thumbnail Service
///
/// Not-found conditions collapse into a single empty 404 so callers cannot
/// tell a malformed path from a missing original. Everything else is a 500
/// whose details stay in the server log.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Result type for thumbnail-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
///
/// `Clone` so the outcome of one coordinated generation can be handed to
/// every request waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    /// Request path does not match `<identity>.<format>` or escapes the
    /// configured directories
    #[error("Not recognized: {0}")]
    NotRecognized(String),

    /// Raw original does not exist
    #[error("Raw asset missing: {0}")]
    RawAssetMissing(String),

    /// Source extension outside the supported set
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Raw bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Thumbnail could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// Filesystem failure other than not-found
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn storage(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        AppError::Storage(format!("{context}: {err}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotRecognized(_) | AppError::RawAssetMissing(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).finish()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Thumbnail task panicked: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn test_not_found_variants_map_to_404() {
        for err in [
            AppError::NotRecognized("a.gif.jpg".into()),
            AppError::RawAssetMissing("b.gif".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_processing_failures_map_to_500() {
        for err in [
            AppError::UnsupportedFormat("bmp".into()),
            AppError::Decode("bad header".into()),
            AppError::Encode("bad frame".into()),
            AppError::Storage("disk full".into()),
            AppError::Internal("panic".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_error_response_has_empty_body() {
        let resp = AppError::RawAssetMissing("testdata/missing.png".into()).error_response();
        let body = resp.into_body().try_into_bytes().unwrap();
        assert!(body.is_empty());
    }
}
