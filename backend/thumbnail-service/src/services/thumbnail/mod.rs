//! Thumbnail generation service
//!
//! This module provides thumbnail serving capabilities:
//! - Path resolver mapping request paths onto raw and cache files
//! - Artifact store for the on-disk thumbnail cache
//! - Image processor for resizing and encoding
//! - Coordinator that runs one generation per key at a time
//! - Service tying the pieces together

pub mod coordinator;
pub mod processor;
pub mod resolver;
pub mod service;
pub mod store;

pub use coordinator::GenerationCoordinator;
pub use processor::{ThumbnailProcessor, ThumbnailResult};
pub use resolver::PathResolver;
pub use service::{Thumbnail, ThumbnailService, ThumbnailServiceConfig, ThumbnailStats, WarmReport};
pub use store::ArtifactStore;
