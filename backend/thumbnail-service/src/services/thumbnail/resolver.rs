//! Path resolver - maps request paths onto raw and cache locations
//!
//! Pure: no filesystem access, no shared state.

use crate::error::{AppError, Result};
use crate::models::{ImageFormat, ImageIdentity, ThumbnailSpec};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct PathResolver {
    raw_dir: PathBuf,
    thumb_dir: PathBuf,
}

impl PathResolver {
    pub fn new(raw_dir: impl Into<PathBuf>, thumb_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            thumb_dir: thumb_dir.into(),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// Strip the `.<target_format>` suffix from a request path.
    ///
    /// A leading `/` is tolerated. Paths with another suffix, nothing in front
    /// of the suffix, or components that would escape the raw directory are
    /// `NotRecognized`.
    pub fn resolve_identity(
        &self,
        request_path: &str,
        target_format: ImageFormat,
    ) -> Result<ImageIdentity> {
        let path = request_path.strip_prefix('/').unwrap_or(request_path);
        let suffix = format!(".{}", target_format.extension());

        let name = path
            .strip_suffix(suffix.as_str())
            .ok_or_else(|| AppError::NotRecognized(request_path.to_string()))?;

        ImageIdentity::parse(name)
    }

    /// `raw_dir/<identity>`
    pub fn raw_path(&self, identity: &ImageIdentity) -> PathBuf {
        self.raw_dir.join(identity.as_str())
    }

    /// `thumb_dir/<identity>.<target_format>`
    pub fn cache_path(&self, spec: &ThumbnailSpec) -> PathBuf {
        self.thumb_dir.join(spec.cache_key().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, format: ImageFormat) -> ThumbnailSpec {
        ThumbnailSpec {
            identity: ImageIdentity::parse(name).unwrap(),
            target_format: format,
            max_width: 200,
            max_height: 200,
        }
    }

    #[test]
    fn test_generate_paths() {
        let resolver = PathResolver::new("testdata", "output");
        let cases = [
            "accidentally_save_file.gif",
            "blocked_us.png",
            "carlton_pls.jpg",
            "lemur_pudding_cups.jpg",
            "spooning_a_barret.png",
            "whats_in_the_case.gif",
        ];

        for name in cases {
            let s = spec(name, ImageFormat::Jpg);
            assert_eq!(
                resolver.raw_path(&s.identity),
                PathBuf::from(format!("testdata/{name}"))
            );
            assert_eq!(
                resolver.cache_path(&s),
                PathBuf::from(format!("output/{name}.jpg"))
            );
        }
    }

    #[test]
    fn test_resolve_identity_strips_target_suffix() {
        let resolver = PathResolver::new("testdata", "output");
        let id = resolver
            .resolve_identity("/accidentally_save_file.gif.png", ImageFormat::Png)
            .unwrap();
        assert_eq!(id.as_str(), "accidentally_save_file.gif");
    }

    #[test]
    fn test_resolve_identity_rejects_other_format() {
        let resolver = PathResolver::new("testdata", "output");
        let err = resolver
            .resolve_identity("/blocked_us.png.jpg", ImageFormat::Png)
            .unwrap_err();
        assert!(matches!(err, AppError::NotRecognized(_)));
    }

    #[test]
    fn test_resolve_identity_rejects_bare_suffix_and_traversal() {
        let resolver = PathResolver::new("testdata", "output");
        for path in ["/.png", "/png", "/../secret.png.png", "/a/../../b.gif.png"] {
            assert!(
                resolver.resolve_identity(path, ImageFormat::Png).is_err(),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_jpg_and_jpeg_suffixes_are_distinct() {
        let resolver = PathResolver::new("testdata", "output");
        assert!(resolver
            .resolve_identity("/carlton_pls.jpg.jpeg", ImageFormat::Jpg)
            .is_err());
        let id = resolver
            .resolve_identity("/carlton_pls.jpg.jpeg", ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(id.as_str(), "carlton_pls.jpg");
    }
}
