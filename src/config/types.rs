use crate::ConfigError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// Parsed options for a single crawl run
///
/// Immutable for the crawl's lifetime; shared by every worker behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Canonical seed URL the crawl starts from
    pub seed_url: Url,

    /// Emit source-extraction metadata (script hints, forms) into crawl.jsonl
    pub sources: bool,

    /// Output root directory (the mirror lands under `<result_dir>/mirror/<host>/`)
    pub result_dir: PathBuf,

    /// Stop fetching pages once this many have been fetched
    pub max_pages: usize,

    /// Scope rule applied to every discovered URL
    pub scope: ScopeMode,

    /// Asset classes eligible for fetching
    pub include_assets: HashSet<AssetKind>,

    /// Reserved: robots.txt enforcement is accepted but not implemented
    pub respect_robots: bool,

    /// Maximum link depth from the seed
    pub max_depth: u32,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Global outbound request rate
    pub rate: RateLimit,

    /// Rewrite stored documents so in-mirror references become relative paths
    pub rewrite_links: bool,

    /// Additionally store unmodified response bytes under `raw/`
    pub store_raw: bool,
}

/// Scope rule determining whether a discovered URL is eligible for fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScopeMode {
    /// Same scheme, host and port as the seed
    #[serde(rename = "same-origin")]
    SameOrigin,
    /// Same host as the seed, any scheme/port
    #[serde(rename = "same-host")]
    SameHost,
    /// Everything is in scope
    #[serde(rename = "all")]
    All,
}

impl FromStr for ScopeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "same-origin" => Ok(ScopeMode::SameOrigin),
            "same-host" => Ok(ScopeMode::SameHost),
            "all" => Ok(ScopeMode::All),
            other => Err(ConfigError::InvalidScope(other.to_string())),
        }
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScopeMode::SameOrigin => "same-origin",
            ScopeMode::SameHost => "same-host",
            ScopeMode::All => "all",
        };
        write!(f, "{}", s)
    }
}

/// Classification of a non-page resource
///
/// The four named classes can be selected with `--include-assets`; `Other`
/// is an internal classification outcome and never eligible for fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Js,
    Css,
    Img,
    Font,
    Other,
}

impl AssetKind {
    /// Directory name under `assets/` for this class
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Js => "js",
            AssetKind::Css => "css",
            AssetKind::Img => "img",
            AssetKind::Font => "font",
            AssetKind::Other => "misc",
        }
    }

    /// Default file extension for extensionless assets of this class
    pub fn default_extension(self) -> &'static str {
        match self {
            AssetKind::Js => "js",
            AssetKind::Css => "css",
            _ => "bin",
        }
    }
}

impl FromStr for AssetKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "js" => Ok(AssetKind::Js),
            "css" => Ok(AssetKind::Css),
            "img" => Ok(AssetKind::Img),
            "font" => Ok(AssetKind::Font),
            other => Err(ConfigError::InvalidAssetType(other.to_string())),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Global outbound request rate, parsed from strings like `"5rps"`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    per_second: f64,
}

impl RateLimit {
    pub fn per_second(&self) -> f64 {
        self.per_second
    }

    /// Minimum interval between issued requests
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.per_second)
    }
}

impl FromStr for RateLimit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_suffix("rps").unwrap_or(s).trim();
        let per_second: f64 = digits
            .parse()
            .map_err(|_| ConfigError::InvalidRate(s.to_string()))?;
        if !per_second.is_finite() || per_second <= 0.0 {
            return Err(ConfigError::InvalidRate(s.to_string()));
        }
        Ok(RateLimit { per_second })
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}rps", self.per_second)
    }
}
