//! Crawl coordination: worker pool lifecycle and stop conditions
//!
//! The coordinator seeds the frontier, runs `concurrency` workers over the
//! {dequeue → fetch → extract → enqueue → write} loop, enforces the global
//! page budget, and finishes with the link-rewrite pass and the summary.
//!
//! Lifecycle: INIT (dirs created, seed enqueued) → RUNNING → DRAINING (stop
//! flag set, in-flight work completes, pending items are not fetched) →
//! DONE (rewrite pass, summary flushed).

use crate::config::{validate, AssetKind, CrawlConfig, ScopeMode};
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::frontier::{CrawlTarget, Frontier, TargetKind};
use crate::crawler::rate::RateLimiter;
use crate::extract::{extract_css, extract_html, scan_source_text, ExtractionRecord};
use crate::mirror::{rewrite_css_document, rewrite_html_document, ErrorStage, MirrorWriter};
use crate::url::{classify_asset, looks_like_page, normalize_url};
use crate::Result;
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use url::Url;

/// Why the crawl left the RUNNING phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    MaxPages,
    FrontierExhausted,
    Cancelled,
}

/// Final crawl statistics, serialized once to `_meta/summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub seed_url: String,
    pub scope: ScopeMode,
    pub max_pages: usize,
    /// Distinct URLs ever accepted by the frontier
    pub visited: usize,
    pub pages_fetched: u64,
    pub assets_fetched: u64,
    pub errors: u64,
    pub bytes_total: u64,
    pub duration_ms: u64,
    pub stop_reason: StopReason,
    pub skipped_out_of_scope: u64,
    pub skipped_depth: u64,
    pub output_root: String,
}

/// Shared counters, updated by workers through atomic increments
///
/// The coordinator is the single writer of the final summary; workers only
/// ever report deltas here.
#[derive(Default)]
struct CrawlStats {
    pages: AtomicU64,
    assets: AtomicU64,
    errors: AtomicU64,
    bytes: AtomicU64,
    stop_reason: Mutex<Option<StopReason>>,
}

impl CrawlStats {
    /// First stop reason wins; later ones are ignored
    fn set_stop_reason(&self, reason: StopReason) {
        let mut guard = self.stop_reason.lock().unwrap();
        if guard.is_none() {
            *guard = Some(reason);
        }
    }
}

/// Everything a worker needs, shared by reference
#[derive(Clone)]
struct WorkerCtx {
    config: Arc<CrawlConfig>,
    frontier: Arc<Frontier>,
    writer: Arc<MirrorWriter>,
    limiter: Arc<RateLimiter>,
    client: Client,
    stats: Arc<CrawlStats>,
}

/// Owns the frontier and worker pool for one crawl
pub struct Coordinator {
    ctx: WorkerCtx,
}

impl Coordinator {
    /// Validates the configuration and prepares the output tree
    ///
    /// This is the only place a filesystem failure aborts the crawl: if the
    /// output root cannot be created, nothing has started yet.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        validate(&config)?;

        let writer = MirrorWriter::new(&config)?;
        let user_agent = format!(
            "{}/{} (+mirror)",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        let client = build_http_client(&user_agent)?;
        let limiter = RateLimiter::new(config.rate);
        let frontier = Frontier::new(&config);

        Ok(Self {
            ctx: WorkerCtx {
                config: Arc::new(config),
                frontier: Arc::new(frontier),
                writer: Arc::new(writer),
                limiter: Arc::new(limiter),
                client,
                stats: Arc::new(CrawlStats::default()),
            },
        })
    }

    /// External cancellation handle: stops dequeuing, in-flight work finishes
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            frontier: Arc::clone(&self.ctx.frontier),
            stats: Arc::clone(&self.ctx.stats),
        }
    }

    /// Runs the crawl to completion and returns the summary
    pub async fn run(self) -> Result<CrawlSummary> {
        let ctx = self.ctx;
        let start = Instant::now();

        tracing::info!(
            "Starting crawl of {} (scope {}, max {} pages, depth {}, {} workers, {})",
            ctx.config.seed_url,
            ctx.config.scope,
            ctx.config.max_pages,
            ctx.config.max_depth,
            ctx.config.concurrency,
            ctx.config.rate,
        );

        ctx.frontier.enqueue(CrawlTarget {
            url: ctx.config.seed_url.clone(),
            depth: 0,
            kind: TargetKind::Page,
            discovered_from: None,
        });

        let mut workers = Vec::with_capacity(ctx.config.concurrency);
        for id in 0..ctx.config.concurrency {
            let ctx = ctx.clone();
            workers.push(tokio::spawn(async move {
                worker_loop(ctx, id).await;
            }));
        }
        for worker in workers {
            // Workers never panic by design; a poisoned one is still joined.
            if let Err(e) = worker.await {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        if ctx.config.rewrite_links {
            rewrite_pass(&ctx);
        }

        let stop_reason = ctx
            .stats
            .stop_reason
            .lock()
            .unwrap()
            .unwrap_or(StopReason::FrontierExhausted);

        let summary = CrawlSummary {
            seed_url: ctx.config.seed_url.to_string(),
            scope: ctx.config.scope,
            max_pages: ctx.config.max_pages,
            visited: ctx.frontier.visited_count(),
            pages_fetched: ctx.stats.pages.load(Ordering::SeqCst),
            assets_fetched: ctx.stats.assets.load(Ordering::SeqCst),
            errors: ctx.stats.errors.load(Ordering::SeqCst),
            bytes_total: ctx.stats.bytes.load(Ordering::SeqCst),
            duration_ms: start.elapsed().as_millis() as u64,
            stop_reason,
            skipped_out_of_scope: ctx.frontier.skipped_out_of_scope(),
            skipped_depth: ctx.frontier.skipped_depth(),
            output_root: ctx.writer.host_root().display().to_string(),
        };
        ctx.writer.write_summary(&summary)?;

        tracing::info!(
            "Crawl done: {} pages, {} assets, {} errors in {:?} ({:?})",
            summary.pages_fetched,
            summary.assets_fetched,
            summary.errors,
            start.elapsed(),
            summary.stop_reason,
        );

        Ok(summary)
    }
}

/// Cooperative cancellation for a running crawl
pub struct CancelHandle {
    frontier: Arc<Frontier>,
    stats: Arc<CrawlStats>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.stats.set_stop_reason(StopReason::Cancelled);
        self.frontier.stop();
    }
}

async fn worker_loop(ctx: WorkerCtx, id: usize) {
    while let Some(target) = ctx.frontier.next().await {
        process_target(&ctx, &target).await;
        ctx.frontier.task_done();
    }
    tracing::debug!("Worker {} exiting", id);
}

/// One {fetch → extract → enqueue → write} cycle
///
/// Every failure in here is captured as data (error log entries, counters);
/// nothing propagates out of the worker loop.
async fn process_target(ctx: &WorkerCtx, target: &CrawlTarget) {
    let result = fetch_url(&ctx.client, &ctx.limiter, &target.url).await;

    if let Some(error) = &result.error {
        tracing::debug!("Fetch failed for {}: {}", target.url, error);
        ctx.stats.errors.fetch_add(1, Ordering::SeqCst);
        ctx.writer.log_error(&target.url, ErrorStage::Fetch, error);
        return;
    }

    // An HTML content type or a page-looking URL counts as a page, no
    // matter how the URL was discovered or what else the server claims.
    let content_type = result.content_type.as_deref();
    let is_html =
        content_type.is_some_and(|c| c.contains("text/html")) || looks_like_page(&target.url);

    if is_html {
        process_page(ctx, target, &result, content_type).await;
    } else {
        process_asset(ctx, target, &result, content_type).await;
    }
}

async fn process_page(
    ctx: &WorkerCtx,
    target: &CrawlTarget,
    result: &FetchResult,
    content_type: Option<&str>,
) {
    // Claim a slot in the page budget before any side effect, so
    // pages_fetched can never exceed max-pages even with fetches in flight.
    let claimed = ctx.stats.pages.fetch_add(1, Ordering::SeqCst) + 1;
    if claimed > ctx.config.max_pages as u64 {
        ctx.stats.pages.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("Page budget exhausted, dropping {}", target.url);
        return;
    }
    if claimed == ctx.config.max_pages as u64 {
        ctx.stats.set_stop_reason(StopReason::MaxPages);
        ctx.frontier.stop();
    }

    let text = String::from_utf8_lossy(&result.bytes);
    let record = extract_html(&text, &target.url);
    enqueue_discoveries(ctx, target, &record);

    ctx.stats
        .bytes
        .fetch_add(result.bytes.len() as u64, Ordering::SeqCst);

    let sources = ctx.config.sources.then(|| record.sources_json());
    if let Err(e) = ctx
        .writer
        .write_page(&target.url, target.depth, content_type, &text, sources)
    {
        // The page was fetched but not stored; release its budget slot so
        // pages_fetched reflects pages actually in the mirror.
        ctx.stats.pages.fetch_sub(1, Ordering::SeqCst);
        ctx.stats.errors.fetch_add(1, Ordering::SeqCst);
        ctx.writer
            .log_error(&target.url, ErrorStage::Write, &e.to_string());
    }
    store_raw(ctx, target, result);

    if claimed % 10 == 0 {
        tracing::info!(
            "Progress: {} pages fetched, {} pending",
            claimed,
            ctx.frontier.pending_count()
        );
    }
}

async fn process_asset(
    ctx: &WorkerCtx,
    target: &CrawlTarget,
    result: &FetchResult,
    content_type: Option<&str>,
) {
    let kind = classify_asset(content_type, target.url.path());
    let mut sources = None;

    match kind {
        AssetKind::Js => {
            let text = String::from_utf8_lossy(&result.bytes);
            let hints = scan_source_text(&text);
            // Imports and source maps of fetched scripts feed the frontier.
            for raw in hints.imports.iter().chain(hints.source_maps.iter()) {
                enqueue_raw_ref(ctx, target, raw);
            }
            if ctx.config.sources && !hints.is_empty() {
                sources = serde_json::to_value(&hints).ok();
            }
        }
        AssetKind::Css => {
            let text = String::from_utf8_lossy(&result.bytes);
            let refs = extract_css(&text);
            for raw in refs.urls.iter().chain(refs.source_maps.iter()) {
                enqueue_raw_ref(ctx, target, raw);
            }
        }
        _ => {}
    }

    ctx.stats
        .bytes
        .fetch_add(result.bytes.len() as u64, Ordering::SeqCst);

    match ctx.writer.write_asset(
        &target.url,
        target.depth,
        kind,
        content_type,
        &result.bytes,
        sources,
    ) {
        Ok(_) => {
            ctx.stats.assets.fetch_add(1, Ordering::SeqCst);
        }
        Err(e) => {
            ctx.stats.errors.fetch_add(1, Ordering::SeqCst);
            ctx.writer
                .log_error(&target.url, ErrorStage::Write, &e.to_string());
        }
    }
    store_raw(ctx, target, result);
}

fn store_raw(ctx: &WorkerCtx, target: &CrawlTarget, result: &FetchResult) {
    if !ctx.config.store_raw {
        return;
    }
    if let Err(e) = ctx.writer.write_raw(&target.url, target.depth, &result.bytes) {
        ctx.stats.errors.fetch_add(1, Ordering::SeqCst);
        ctx.writer
            .log_error(&target.url, ErrorStage::Write, &e.to_string());
    }
}

/// Offers everything a page extraction discovered to the frontier
///
/// The frontier applies scope, depth, asset-class and dedup rules; rejected
/// candidates are silent (counted, not errors).
fn enqueue_discoveries(ctx: &WorkerCtx, from: &CrawlTarget, record: &ExtractionRecord) {
    let depth = from.depth + 1;

    for url in &record.outbound_links {
        let kind = if looks_like_page(url) {
            TargetKind::Page
        } else {
            TargetKind::Asset(classify_asset(None, url.path()))
        };
        ctx.frontier.enqueue(CrawlTarget {
            url: url.clone(),
            depth,
            kind,
            discovered_from: Some(from.url.clone()),
        });
    }

    for (url, asset_kind) in &record.asset_refs {
        ctx.frontier.enqueue(CrawlTarget {
            url: url.clone(),
            depth,
            kind: TargetKind::Asset(*asset_kind),
            discovered_from: Some(from.url.clone()),
        });
    }
}

/// Resolves a textual hint (JS import, CSS url, source map) against the
/// resource it came from and offers it to the frontier
fn enqueue_raw_ref(ctx: &WorkerCtx, from: &CrawlTarget, raw: &str) {
    let Ok(url) = normalize_url(raw, Some(&from.url)) else {
        return;
    };
    let kind = if looks_like_page(&url) {
        TargetKind::Page
    } else {
        TargetKind::Asset(classify_asset(None, url.path()))
    };
    ctx.frontier.enqueue(CrawlTarget {
        url,
        depth: from.depth + 1,
        kind,
        discovered_from: Some(from.url.clone()),
    });
}

/// Phase 2: rewrites stored HTML/CSS against the complete URL→path map
///
/// Runs only after draining, when every referenced resource has either been
/// fetched (and is in the map) or definitively excluded.
fn rewrite_pass(ctx: &WorkerCtx) {
    let map = ctx.writer.local_map_snapshot();
    let mut rewritten = 0usize;

    for (url_str, path) in &map {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let is_html = matches!(ext, "html" | "htm");
        let is_css = ext == "css";
        if !is_html && !is_css {
            continue;
        }
        let Ok(doc_url) = Url::parse(url_str) else {
            continue;
        };
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Skipping rewrite of {}: {}", path.display(), e);
                continue;
            }
        };
        let updated = if is_html {
            rewrite_html_document(&text, &doc_url, path, &map)
        } else {
            rewrite_css_document(&text, &doc_url, path, &map)
        };
        if updated != text {
            match ctx.writer.rewrite_in_place(path, &updated) {
                Ok(()) => rewritten += 1,
                Err(e) => {
                    ctx.stats.errors.fetch_add(1, Ordering::SeqCst);
                    ctx.writer
                        .log_error(&doc_url, ErrorStage::Write, &e.to_string());
                }
            }
        }
    }

    tracing::info!("Link rewrite pass updated {} documents", rewritten);
}

/// Runs a complete crawl for the given configuration
pub async fn run_crawl(config: CrawlConfig) -> Result<CrawlSummary> {
    Coordinator::new(config)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimit;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn test_config(result_dir: PathBuf) -> CrawlConfig {
        CrawlConfig {
            seed_url: Url::parse("https://example.com/").unwrap(),
            sources: false,
            result_dir,
            max_pages: 5,
            scope: ScopeMode::SameOrigin,
            include_assets: HashSet::new(),
            respect_robots: false,
            max_depth: 2,
            concurrency: 2,
            rate: "100rps".parse::<RateLimit>().unwrap(),
            rewrite_links: false,
            store_raw: false,
        }
    }

    #[test]
    fn test_stop_reason_first_wins() {
        let stats = CrawlStats::default();
        stats.set_stop_reason(StopReason::MaxPages);
        stats.set_stop_reason(StopReason::Cancelled);
        assert_eq!(
            *stats.stop_reason.lock().unwrap(),
            Some(StopReason::MaxPages)
        );
    }

    #[test]
    fn test_stop_reason_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&StopReason::MaxPages).unwrap(),
            "\"max-pages\""
        );
        assert_eq!(
            serde_json::to_string(&StopReason::FrontierExhausted).unwrap(),
            "\"frontier-exhausted\""
        );
    }

    #[tokio::test]
    async fn test_coordinator_rejects_invalid_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = test_config(dir.path().to_path_buf());
        config.concurrency = 0;
        assert!(Coordinator::new(config).is_err());
    }

    #[tokio::test]
    async fn test_cancelled_crawl_reaches_done() {
        let dir = tempfile::TempDir::new().unwrap();
        let coordinator = Coordinator::new(test_config(dir.path().to_path_buf())).unwrap();
        let cancel = coordinator.cancel_handle();
        cancel.cancel();

        // Seed never gets dequeued; the crawl still finishes cleanly.
        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.pages_fetched, 0);
    }
}
