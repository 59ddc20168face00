//! Crawl engine: frontier, rate control, fetching and coordination
//!
//! The coordinator owns the worker pool lifecycle; workers share the
//! frontier, the rate limiter and the mirror writer and communicate only
//! through them.

mod coordinator;
mod fetcher;
mod frontier;
mod rate;

pub use coordinator::{run_crawl, CancelHandle, Coordinator, CrawlSummary, StopReason};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use frontier::{CrawlTarget, Frontier, TargetKind};
pub use rate::RateLimiter;
