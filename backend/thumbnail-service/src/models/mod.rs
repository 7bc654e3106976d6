/// Data models for thumbnail-service
///
/// Identities, formats and the cache key that ties them together.
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use crate::error::AppError;

/// Supported image formats, for both sources and thumbnails.
///
/// `Jpg` and `Jpeg` share a codec but stay distinct so that the cache key
/// and content type keep the literal extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Gif,
    Png,
    Jpg,
    Jpeg,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Gif,
        ImageFormat::Png,
        ImageFormat::Jpg,
        ImageFormat::Jpeg,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
        }
    }

    /// Literal `image/<ext>` content type. Not MIME-normalized: a `jpg`
    /// thumbnail is served as `image/jpg`.
    pub fn content_type(&self) -> String {
        format!("image/{}", self.extension())
    }

    /// Codec backing this format.
    pub fn codec(&self) -> image::ImageFormat {
        match self {
            Self::Gif => image::ImageFormat::Gif,
            Self::Png => image::ImageFormat::Png,
            Self::Jpg | Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }

    /// Sniff a format from a filename's own extension (case-insensitive).
    pub fn from_path(path: &str) -> Result<Self, AppError> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| AppError::UnsupportedFormat(format!("no extension: {path}")))?;
        ext.parse()
    }
}

impl FromStr for ImageFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gif" => Ok(Self::Gif),
            "png" => Ok(Self::Png),
            "jpg" => Ok(Self::Jpg),
            "jpeg" => Ok(Self::Jpeg),
            other => Err(AppError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Filename of a raw original, including its own extension
/// (e.g. `photo.gif`).
///
/// Only relative paths made of normal components are accepted, so joining
/// an identity onto a directory never leaves that directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageIdentity(String);

impl ImageIdentity {
    pub fn parse(name: &str) -> Result<Self, AppError> {
        if name.is_empty() || name.contains('\\') || name.contains('\0') {
            return Err(AppError::NotRecognized(name.to_string()));
        }

        // `Path::components` silently drops interior `.` and repeated
        // separators, so check the raw segments as well.
        let segments_ok = name
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
        let components_ok = Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        if !segments_ok || !components_ok {
            return Err(AppError::NotRecognized(name.to_string()));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format of the raw original, taken from the identity's extension.
    pub fn source_format(&self) -> Result<ImageFormat, AppError> {
        ImageFormat::from_path(&self.0)
    }
}

impl fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything that defines one cacheable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailSpec {
    pub identity: ImageIdentity,
    pub target_format: ImageFormat,
    pub max_width: u32,
    pub max_height: u32,
}

impl ThumbnailSpec {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!("{}.{}", self.identity, self.target_format))
    }
}

/// `<identity>.<target format>`: addresses one artifact for both
/// coordination and storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing_is_case_insensitive() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("Jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!(matches!(
            "bmp".parse::<ImageFormat>(),
            Err(AppError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_content_type_keeps_literal_extension() {
        assert_eq!(ImageFormat::Jpg.content_type(), "image/jpg");
        assert_eq!(ImageFormat::Jpeg.content_type(), "image/jpeg");
        assert_eq!(ImageFormat::Png.content_type(), "image/png");
    }

    #[test]
    fn test_jpg_and_jpeg_share_codec() {
        assert_eq!(ImageFormat::Jpg.codec(), ImageFormat::Jpeg.codec());
    }

    #[test]
    fn test_identity_rejects_traversal() {
        for bad in [
            "",
            "../etc/passwd",
            "a/../../b.png",
            "/abs.png",
            "./a.png",
            "a//b.png",
            "a/./b.png",
            "..\\win.png",
        ] {
            assert!(
                matches!(ImageIdentity::parse(bad), Err(AppError::NotRecognized(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_identity_accepts_nested_names() {
        let id = ImageIdentity::parse("albums/2019/cat.jpg").unwrap();
        assert_eq!(id.source_format().unwrap(), ImageFormat::Jpg);
    }

    #[test]
    fn test_cache_key_appends_target_format() {
        let spec = ThumbnailSpec {
            identity: ImageIdentity::parse("photo.gif").unwrap(),
            target_format: ImageFormat::Png,
            max_width: 200,
            max_height: 200,
        };
        assert_eq!(spec.cache_key().as_str(), "photo.gif.png");
    }
}
