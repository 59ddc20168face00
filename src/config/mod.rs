//! Configuration for a crawl run
//!
//! All configuration arrives through CLI flags; this module holds the parsed
//! options struct plus the small value types (`ScopeMode`, `AssetKind`,
//! `RateLimit`) and their validation.

mod types;
mod validation;

pub use types::{AssetKind, CrawlConfig, RateLimit, ScopeMode};
pub use validation::{parse_asset_list, validate};
