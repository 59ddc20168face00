use crate::config::{AssetKind, CrawlConfig, ScopeMode};
use crate::url::in_scope;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;
use url::Url;

/// Whether a queued URL is expected to be an HTML page or an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Page,
    Asset(AssetKind),
}

/// A discovered URL accepted for fetching
///
/// Immutable; consumed exactly once by a worker.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    /// Canonical absolute URL
    pub url: Url,
    /// Link depth from the seed (seed is 0)
    pub depth: u32,
    pub kind: TargetKind,
    /// Page the URL was discovered on; `None` for the seed
    pub discovered_from: Option<Url>,
}

struct FrontierState {
    pending: VecDeque<CrawlTarget>,
    /// URLs already enqueued or fetched; a URL enters at most once,
    /// atomically with its enqueue.
    seen: HashSet<String>,
    /// Targets dequeued but not yet reported done
    in_flight: usize,
}

/// Thread-safe pending queue with deduplication and depth/scope enforcement
///
/// The single source of truth for "has this URL been seen". The combined
/// check-and-insert in [`Frontier::enqueue`] happens under one lock, so two
/// concurrent workers can never both enqueue the same URL.
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    stopped: AtomicBool,
    seed: Url,
    scope: ScopeMode,
    max_depth: u32,
    include_assets: HashSet<AssetKind>,
    skipped_out_of_scope: AtomicU64,
    skipped_depth: AtomicU64,
}

impl Frontier {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            state: Mutex::new(FrontierState {
                pending: VecDeque::new(),
                seen: HashSet::new(),
                in_flight: 0,
            }),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
            seed: config.seed_url.clone(),
            scope: config.scope,
            max_depth: config.max_depth,
            include_assets: config.include_assets.clone(),
            skipped_out_of_scope: AtomicU64::new(0),
            skipped_depth: AtomicU64::new(0),
        }
    }

    /// Offers a target to the frontier
    ///
    /// Returns `false` (no side effect) when the URL is out of scope, beyond
    /// the depth limit, an excluded asset class, already seen, or the crawl
    /// is draining.
    pub fn enqueue(&self, target: CrawlTarget) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }
        if target.depth > self.max_depth {
            self.skipped_depth.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if !in_scope(&target.url, &self.seed, self.scope) {
            self.skipped_out_of_scope.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if let TargetKind::Asset(kind) = target.kind {
            if !self.include_assets.contains(&kind) {
                return false;
            }
        }

        let mut state = self.state.lock().unwrap();
        if !state.seen.insert(target.url.as_str().to_string()) {
            return false;
        }
        state.pending.push_back(target);
        drop(state);

        self.notify.notify_one();
        true
    }

    /// Yields the next target, waiting while the queue is momentarily empty
    /// but fetches are still in flight
    ///
    /// Returns `None` when the crawl is over: the stop flag is set, or the
    /// queue is empty with nothing in flight.
    pub async fn next(&self) -> Option<CrawlTarget> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register with the Notify before re-checking state; an
            // unregistered future would miss a notify_waiters() issued
            // between the check and the await.
            notified.as_mut().enable();
            {
                let mut state = self.state.lock().unwrap();
                if self.stopped.load(Ordering::SeqCst) {
                    return None;
                }
                if let Some(target) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(target);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Marks one dequeued target as fully processed
    pub fn task_done(&self) {
        let mut state = self.state.lock().unwrap();
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        // Wake everyone so idle workers can re-check the exit condition.
        self.notify.notify_waiters();
    }

    /// Cooperative stop: nothing further is dequeued, in-flight work finishes
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of distinct URLs ever accepted
    pub fn visited_count(&self) -> usize {
        self.state.lock().unwrap().seen.len()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn skipped_out_of_scope(&self) -> u64 {
        self.skipped_out_of_scope.load(Ordering::Relaxed)
    }

    pub fn skipped_depth(&self) -> u64 {
        self.skipped_depth.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimit;
    use std::sync::Arc;

    fn test_config(scope: ScopeMode, max_depth: u32) -> CrawlConfig {
        CrawlConfig {
            seed_url: Url::parse("https://example.com/").unwrap(),
            sources: false,
            result_dir: std::path::PathBuf::from("./out"),
            max_pages: 100,
            scope,
            include_assets: [AssetKind::Js, AssetKind::Css].into_iter().collect(),
            respect_robots: false,
            max_depth,
            concurrency: 2,
            rate: "5rps".parse::<RateLimit>().unwrap(),
            rewrite_links: true,
            store_raw: false,
        }
    }

    fn page(url: &str, depth: u32) -> CrawlTarget {
        CrawlTarget {
            url: Url::parse(url).unwrap(),
            depth,
            kind: TargetKind::Page,
            discovered_from: None,
        }
    }

    #[test]
    fn test_enqueue_accepts_once() {
        let frontier = Frontier::new(&test_config(ScopeMode::SameOrigin, 3));
        assert!(frontier.enqueue(page("https://example.com/a", 1)));
        assert!(!frontier.enqueue(page("https://example.com/a", 1)));
        assert_eq!(frontier.visited_count(), 1);
        assert_eq!(frontier.pending_count(), 1);
    }

    #[test]
    fn test_enqueue_rejects_out_of_scope() {
        let frontier = Frontier::new(&test_config(ScopeMode::SameOrigin, 3));
        assert!(!frontier.enqueue(page("https://other.com/a", 1)));
        assert_eq!(frontier.skipped_out_of_scope(), 1);
        assert_eq!(frontier.visited_count(), 0);
    }

    #[test]
    fn test_enqueue_rejects_beyond_depth() {
        let frontier = Frontier::new(&test_config(ScopeMode::SameOrigin, 2));
        assert!(!frontier.enqueue(page("https://example.com/deep", 3)));
        assert_eq!(frontier.skipped_depth(), 1);
    }

    #[test]
    fn test_enqueue_rejects_excluded_asset_class() {
        let frontier = Frontier::new(&test_config(ScopeMode::SameOrigin, 3));
        let target = CrawlTarget {
            url: Url::parse("https://example.com/logo.png").unwrap(),
            depth: 1,
            kind: TargetKind::Asset(AssetKind::Img),
            discovered_from: None,
        };
        assert!(!frontier.enqueue(target));
    }

    #[test]
    fn test_enqueue_rejects_after_stop() {
        let frontier = Frontier::new(&test_config(ScopeMode::SameOrigin, 3));
        frontier.stop();
        assert!(!frontier.enqueue(page("https://example.com/a", 1)));
    }

    #[tokio::test]
    async fn test_next_returns_none_when_drained() {
        let frontier = Frontier::new(&test_config(ScopeMode::SameOrigin, 3));
        frontier.enqueue(page("https://example.com/a", 0));

        let target = frontier.next().await.unwrap();
        assert_eq!(target.url.as_str(), "https://example.com/a");

        frontier.task_done();
        assert!(frontier.next().await.is_none());
    }

    #[tokio::test]
    async fn test_next_returns_none_after_stop() {
        let frontier = Frontier::new(&test_config(ScopeMode::SameOrigin, 3));
        frontier.enqueue(page("https://example.com/a", 0));
        frontier.stop();
        assert!(frontier.next().await.is_none());
        assert_eq!(frontier.pending_count(), 1); // drained, not fetched
    }

    #[tokio::test]
    async fn test_waiting_worker_sees_late_discovery() {
        let frontier = Arc::new(Frontier::new(&test_config(ScopeMode::SameOrigin, 3)));
        frontier.enqueue(page("https://example.com/a", 0));

        // Worker 1 takes /a and later discovers /b; worker 2 blocks until
        // the discovery lands.
        let first = frontier.next().await.unwrap();
        assert_eq!(first.url.path(), "/a");

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.next().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(frontier.enqueue(page("https://example.com/b", 1)));
        frontier.task_done();

        let second = waiter.await.unwrap().unwrap();
        assert_eq!(second.url.path(), "/b");
    }

    #[tokio::test]
    async fn test_all_workers_exit_when_drained() {
        // Contended drain: every worker must observe the final task_done
        // wakeup and exit, even if it was between its state check and its
        // await when the wakeup fired.
        let frontier = Arc::new(Frontier::new(&test_config(ScopeMode::SameOrigin, 6)));
        frontier.enqueue(page("https://example.com/r", 0));

        let mut workers = Vec::new();
        for _ in 0..4 {
            let frontier = Arc::clone(&frontier);
            workers.push(tokio::spawn(async move {
                let mut processed = 0usize;
                while let Some(target) = frontier.next().await {
                    for i in 0..2 {
                        let child = format!("{}/{}", target.url, i);
                        frontier.enqueue(page(&child, target.depth + 1));
                    }
                    tokio::task::yield_now().await;
                    frontier.task_done();
                    processed += 1;
                }
                processed
            }));
        }

        let total = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            let mut total = 0;
            for worker in workers {
                total += worker.await.unwrap();
            }
            total
        })
        .await
        .expect("a worker missed the final wakeup and never exited");

        assert_eq!(total, frontier.visited_count());
        assert_eq!(frontier.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_no_duplicates() {
        let frontier = Arc::new(Frontier::new(&test_config(ScopeMode::SameOrigin, 3)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let frontier = Arc::clone(&frontier);
            handles.push(tokio::spawn(async move {
                frontier.enqueue(page("https://example.com/same", 1))
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(frontier.pending_count(), 1);
    }
}
