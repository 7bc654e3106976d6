//! Thumbnail Service
//!
//! Serves resized renditions of raw images over HTTP, generating each one on
//! first request and caching it on disk for every request after that.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
