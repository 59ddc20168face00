use crate::config::{AssetKind, CrawlConfig};
use crate::mirror::paths::{with_content_digest, MirrorLayout};
use crate::{UmbraError, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use url::Url;

/// Kind tag for crawl.jsonl records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Page,
    Asset,
    Raw,
}

/// Stage tag for errors.jsonl records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    Fetch,
    Extract,
    Write,
}

/// One line of crawl.jsonl
#[derive(Debug, Serialize)]
struct CrawlRecord<'a> {
    url: &'a str,
    #[serde(rename = "type")]
    kind: ResourceKind,
    path: String,
    #[serde(rename = "contentType")]
    content_type: Option<&'a str>,
    #[serde(rename = "byteSize")]
    byte_size: usize,
    depth: u32,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<serde_json::Value>,
}

/// One line of errors.jsonl
#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    url: &'a str,
    stage: ErrorStage,
    message: &'a str,
    timestamp: String,
}

/// Persists pages, assets and raw responses and appends metadata records
///
/// The writer exclusively owns the output tree and the log handles. Log
/// appends are serialized behind per-file locks so concurrent workers never
/// interleave partial lines; every line is a complete JSON record on its own.
pub struct MirrorWriter {
    layout: MirrorLayout,
    store_raw: bool,
    crawl_log: Mutex<File>,
    error_log: Mutex<File>,
    /// Canonical URL -> absolute mirror path, fed to the link rewriter
    local_map: Mutex<HashMap<String, PathBuf>>,
    /// Mirror path -> owning canonical URL; colliding writes get a
    /// content-digest suffix instead of overwriting
    claimed_paths: Mutex<HashMap<PathBuf, String>>,
}

impl MirrorWriter {
    /// Creates the output tree and opens the log files
    ///
    /// Failure here aborts the whole crawl; per-resource write failures
    /// later do not.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let layout = MirrorLayout::new(&config.result_dir, &config.seed_url);
        layout
            .ensure_dirs(config.store_raw)
            .map_err(|e| UmbraError::OutputRoot {
                path: layout.host_root.display().to_string(),
                message: e.to_string(),
            })?;

        let open_append = |path: &Path| -> std::io::Result<File> {
            OpenOptions::new().create(true).append(true).open(path)
        };
        let crawl_log = open_append(&layout.meta_dir.join("crawl.jsonl"))?;
        let error_log = open_append(&layout.meta_dir.join("errors.jsonl"))?;

        Ok(Self {
            layout,
            store_raw: config.store_raw,
            crawl_log: Mutex::new(crawl_log),
            error_log: Mutex::new(error_log),
            local_map: Mutex::new(HashMap::new()),
            claimed_paths: Mutex::new(HashMap::new()),
        })
    }

    pub fn host_root(&self) -> &Path {
        &self.layout.host_root
    }

    /// Stores an HTML page and appends its crawl record
    pub fn write_page(
        &self,
        url: &Url,
        depth: u32,
        content_type: Option<&str>,
        text: &str,
        sources: Option<serde_json::Value>,
    ) -> Result<PathBuf> {
        let path = self.claim_path(url, self.layout.page_path(url), text.as_bytes());
        write_bytes(&path, text.as_bytes())?;
        self.remember(url, &path);
        self.append_crawl_record(
            url,
            ResourceKind::Page,
            &path,
            content_type,
            text.len(),
            depth,
            sources,
        )?;
        Ok(path)
    }

    /// Stores an asset and appends its crawl record
    pub fn write_asset(
        &self,
        url: &Url,
        depth: u32,
        kind: AssetKind,
        content_type: Option<&str>,
        bytes: &[u8],
        sources: Option<serde_json::Value>,
    ) -> Result<PathBuf> {
        let path = self.claim_path(url, self.layout.asset_path(url, kind), bytes);
        write_bytes(&path, bytes)?;
        self.remember(url, &path);
        self.append_crawl_record(
            url,
            ResourceKind::Asset,
            &path,
            content_type,
            bytes.len(),
            depth,
            sources,
        )?;
        Ok(path)
    }

    /// Stores the unmodified response bytes (only with `--store-raw`)
    pub fn write_raw(&self, url: &Url, depth: u32, bytes: &[u8]) -> Result<()> {
        if !self.store_raw {
            return Ok(());
        }
        let path = self.layout.raw_path(url);
        write_bytes(&path, bytes)?;
        self.append_crawl_record(url, ResourceKind::Raw, &path, None, bytes.len(), depth, None)
    }

    /// Appends one record to errors.jsonl
    ///
    /// Logging an error must never itself fail the crawl, so IO problems
    /// here are only traced.
    pub fn log_error(&self, url: &Url, stage: ErrorStage, message: &str) {
        let record = ErrorRecord {
            url: url.as_str(),
            stage,
            message,
            timestamp: Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.append_line(&self.error_log, &record) {
            tracing::error!("Failed to append to errors.jsonl: {}", e);
        }
    }

    /// Snapshot of the URL→path map for the rewrite pass
    pub fn local_map_snapshot(&self) -> HashMap<String, PathBuf> {
        self.local_map.lock().unwrap().clone()
    }

    /// Writes the final summary, once, at crawl end
    pub fn write_summary<S: Serialize>(&self, summary: &S) -> Result<()> {
        let path = self.layout.meta_dir.join("summary.json");
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Rewrites a stored document in place (used by the rewrite pass)
    pub fn rewrite_in_place(&self, path: &Path, contents: &str) -> Result<()> {
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Claims a mirror path for a URL, exactly once per path
    ///
    /// Distinct canonical URLs can map to the same candidate path
    /// (`/about` vs `/about/index.html`); the later claimant gets a
    /// content-digest suffix so each path is written by exactly one URL.
    fn claim_path(&self, url: &Url, candidate: PathBuf, bytes: &[u8]) -> PathBuf {
        let mut claimed = self.claimed_paths.lock().unwrap();
        let path = match claimed.get(&candidate) {
            Some(owner) if owner != url.as_str() => with_content_digest(&candidate, bytes),
            _ => candidate,
        };
        claimed.insert(path.clone(), url.as_str().to_string());
        path
    }

    fn remember(&self, url: &Url, path: &Path) {
        self.local_map
            .lock()
            .unwrap()
            .insert(url.as_str().to_string(), path.to_path_buf());
    }

    #[allow(clippy::too_many_arguments)]
    fn append_crawl_record(
        &self,
        url: &Url,
        kind: ResourceKind,
        path: &Path,
        content_type: Option<&str>,
        byte_size: usize,
        depth: u32,
        sources: Option<serde_json::Value>,
    ) -> Result<()> {
        let rel = path
            .strip_prefix(&self.layout.host_root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        let record = CrawlRecord {
            url: url.as_str(),
            kind,
            path: rel,
            content_type,
            byte_size,
            depth,
            timestamp: Utc::now().to_rfc3339(),
            sources,
        };
        self.append_line(&self.crawl_log, &record)
    }

    fn append_line<T: Serialize>(&self, log: &Mutex<File>, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut file = log.lock().unwrap();
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
