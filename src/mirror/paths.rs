use crate::config::AssetKind;
use crate::url::host_key;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory layout for one mirrored host
#[derive(Debug, Clone)]
pub struct MirrorLayout {
    pub host_root: PathBuf,
    pub meta_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub raw_dir: PathBuf,
}

impl MirrorLayout {
    pub fn new(result_dir: &Path, seed: &Url) -> Self {
        let host_root = result_dir.join("mirror").join(host_key(seed));
        Self {
            meta_dir: host_root.join("_meta"),
            pages_dir: host_root.join("pages"),
            assets_dir: host_root.join("assets"),
            raw_dir: host_root.join("raw"),
            host_root,
        }
    }

    /// Creates the directory tree; `raw/` only when raw storage is enabled
    pub fn ensure_dirs(&self, store_raw: bool) -> io::Result<()> {
        std::fs::create_dir_all(&self.meta_dir)?;
        std::fs::create_dir_all(&self.pages_dir)?;
        std::fs::create_dir_all(&self.assets_dir)?;
        if store_raw {
            std::fs::create_dir_all(&self.raw_dir)?;
        }
        Ok(())
    }

    /// Absolute local path for a page URL
    pub fn page_path(&self, url: &Url) -> PathBuf {
        self.pages_dir.join(page_rel_path(url))
    }

    /// Absolute local path for an asset URL
    pub fn asset_path(&self, url: &Url, kind: AssetKind) -> PathBuf {
        self.assets_dir.join(asset_rel_path(url, kind))
    }

    /// Absolute local path for a raw response copy
    pub fn raw_path(&self, url: &Url) -> PathBuf {
        self.raw_dir.join(raw_file_name(url))
    }
}

/// Relative path under `pages/` for a page URL
///
/// The URL path maps directly onto directories; directory-ish or
/// extensionless URLs get an `index.html`. A query string is digested into
/// the file name so distinct queries never collide.
pub fn page_rel_path(url: &Url) -> PathBuf {
    let raw_path = url.path();
    let mut rel = raw_path.trim_start_matches('/').to_string();

    if rel.is_empty() {
        rel = "index".to_string();
    }
    let last = rel.rsplit('/').next().unwrap_or("");
    if raw_path.ends_with('/') || !last.contains('.') {
        rel = format!("{}/index.html", rel.trim_end_matches('/'));
    }

    if let Some(query) = url.query() {
        rel = insert_digest(&rel, query);
    }

    PathBuf::from(rel)
}

/// Relative path under `assets/` for an asset URL, namespaced by class
pub fn asset_rel_path(url: &Url, kind: AssetKind) -> PathBuf {
    let mut rel = url.path().trim_start_matches('/').to_string();
    if rel.is_empty() {
        rel = "asset".to_string();
    }
    if rel.ends_with('/') {
        rel.push_str("index");
    }

    let name = rel.rsplit('/').next().unwrap_or("");
    if !name.contains('.') {
        rel = format!("{}.{}", rel, kind.default_extension());
    }

    if let Some(query) = url.query() {
        rel = insert_digest(&rel, query);
    }

    Path::new(kind.dir_name()).join(rel)
}

/// Content-addressed file name for a raw response copy
pub fn raw_file_name(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    format!("{}.bin", &hex::encode(hasher.finalize())[..16])
}

/// Disambiguates a colliding mirror path with a digest of the content
///
/// Distinct canonical URLs can map to the same mirror file (for example
/// `/about` and `/about/index.html`); the second writer gets a content-hash
/// suffix so neither overwrites the other.
pub fn with_content_digest(path: &Path, bytes: &[u8]) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());
    let digest = &digest[..8];

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let new_name = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.{}.{}", stem, digest, ext),
        _ => format!("{}.{}", name, digest),
    };
    path.with_file_name(new_name)
}

/// Inserts an 8-hex-char digest of `query` before the file extension
fn insert_digest(rel: &str, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    let digest = hex::encode(hasher.finalize());
    let digest = &digest[..8];

    match rel.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') => {
            format!("{}.{}.{}", stem, digest, ext)
        }
        _ => format!("{}.{}", rel, digest),
    }
}
