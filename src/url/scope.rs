use crate::config::{AssetKind, ScopeMode};
use url::Url;

/// Extensions that mark a URL as a page rather than an asset
const PAGE_EXTENSIONS: &[&str] = &["html", "htm", "php", "asp", "aspx", "jsp"];

/// Evaluates scope membership for a discovered URL
///
/// * `SameOrigin` compares scheme + host + port exactly
/// * `SameHost` compares host only
/// * `All` accepts everything
pub fn in_scope(url: &Url, seed: &Url, mode: ScopeMode) -> bool {
    match mode {
        ScopeMode::SameOrigin => {
            url.scheme() == seed.scheme()
                && url.host_str() == seed.host_str()
                && url.port_or_known_default() == seed.port_or_known_default()
        }
        ScopeMode::SameHost => url.host_str() == seed.host_str(),
        ScopeMode::All => true,
    }
}

/// Directory key for a URL's host, including a non-default port
///
/// `https://example.com/` maps to `example.com`,
/// `http://127.0.0.1:8080/` to `127.0.0.1:8080`.
pub fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown-host");
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Classifies a resource by content type and/or URL path
pub fn classify_asset(content_type: Option<&str>, path: &str) -> AssetKind {
    let ctype = content_type.unwrap_or("").to_ascii_lowercase();
    let path = path.to_ascii_lowercase();

    let has_ext = |exts: &[&str]| exts.iter().any(|e| path.ends_with(e));

    if ctype.contains("javascript") || has_ext(&[".js", ".mjs", ".cjs"]) {
        AssetKind::Js
    } else if ctype.contains("css") || has_ext(&[".css"]) {
        AssetKind::Css
    } else if ["font", "woff", "ttf"].iter().any(|s| ctype.contains(s))
        || has_ext(&[".woff", ".woff2", ".ttf", ".otf"])
    {
        AssetKind::Font
    } else if ctype.contains("image")
        || ctype.contains("svg")
        || has_ext(&[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico"])
    {
        AssetKind::Img
    } else {
        AssetKind::Other
    }
}

/// Heuristic: does this URL look like an HTML page rather than an asset?
///
/// Trailing slash or an extensionless final segment counts as a page, as do
/// the common dynamic-page extensions.
pub fn looks_like_page(url: &Url) -> bool {
    let path = url.path();
    if path.ends_with('/') {
        return true;
    }
    let name = path.rsplit('/').next().unwrap_or("");
    match name.rsplit_once('.') {
        Some((_, ext)) => PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => true,
    }
}
