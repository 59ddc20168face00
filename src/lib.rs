//! Umbra: scoped offline site mirroring
//!
//! This crate implements a polite web crawler that produces a local offline
//! mirror of a site, rewriting cross-references for offline browsing and
//! recording structured metadata about every fetched resource.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod mirror;
pub mod url;

use thiserror::Error;

/// Main error type for Umbra operations
#[derive(Debug, Error)]
pub enum UmbraError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create output root {path}: {message}")]
    OutputRoot { path: String, message: String },
}

/// Configuration-specific errors
///
/// All of these are fatal at startup: the crawl never begins and the
/// process exits non-zero with the message.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("Invalid scope '{0}', expected same-origin, same-host or all")]
    InvalidScope(String),

    #[error("Invalid asset type '{0}', expected js, css, img or font")]
    InvalidAssetType(String),

    #[error("Invalid rate '{0}', expected something like '5rps'")]
    InvalidRate(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Umbra operations
pub type Result<T> = std::result::Result<T, UmbraError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{AssetKind, CrawlConfig, RateLimit, ScopeMode};
pub use crawler::{run_crawl, CrawlSummary};
pub use url::{classify_asset, in_scope, looks_like_page, normalize_url};
