use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
];

/// Normalizes a URL into its canonical form
///
/// Relative references are resolved against `base` when one is given; a bare
/// seed like `example.com` (no base, no scheme) is retried as HTTPS.
///
/// # Normalization Steps
///
/// 1. Resolve against `base` (or parse absolutely)
/// 2. Reject non-http(s) schemes (`mailto:`, `tel:`, `javascript:`, `data:`, ...)
/// 3. Lowercase scheme and host, drop default ports
/// 4. Remove the fragment
/// 5. Collapse `.`/`..` path segments and repeated slashes,
///    trim the trailing slash on non-root paths
/// 6. Drop tracking query parameters, sort the rest
///
/// Idempotent: normalizing an already-canonical URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use umbra::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.COM/a/../b/#frag", None).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/b");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = match base {
        Some(base) => base
            .join(raw)
            .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?,
        None => match Url::parse(raw) {
            Ok(u) => u,
            // A schemeless seed like "example.com" gets an https:// prefix.
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{}", raw))
                    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?
            }
            Err(e) => return Err(UrlError::Parse(format!("{}: {}", raw, e))),
        },
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    // The url crate already lowercases scheme and host and drops default
    // ports, so only host presence needs checking here.
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{}={}", k, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Collapses dot segments and repeated slashes, trims non-root trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Drops tracking parameters and sorts the remainder for a stable form
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_host() {
        let result = normalize_url("https://EXAMPLE.COM/Page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_default_port() {
        let result = normalize_url("https://example.com:443/page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_explicit_port() {
        let result = normalize_url("http://example.com:8080/page", None).unwrap();
        assert_eq!(result.as_str(), "http://example.com:8080/page");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let result = normalize_url("https://example.com/page/", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_root_slash_kept() {
        let result = normalize_url("https://example.com/", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_dot_segments_collapsed() {
        let result = normalize_url("https://example.com/a/../b/./c", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_repeated_slashes_collapsed() {
        let result = normalize_url("https://example.com///a//b", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/a/b");
    }

    #[test]
    fn test_tracking_params_stripped() {
        let result =
            normalize_url("https://example.com/p?utm_source=x&keep=1&fbclid=y", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/p?keep=1");
    }

    #[test]
    fn test_query_params_sorted() {
        let result = normalize_url("https://example.com/p?b=2&a=1", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/p?a=1&b=2");
    }

    #[test]
    fn test_relative_resolution() {
        let base = Url::parse("https://example.com/dir/page.html").unwrap();
        let result = normalize_url("../other", Some(&base)).unwrap();
        assert_eq!(result.as_str(), "https://example.com/other");
    }

    #[test]
    fn test_schemeless_seed_gets_https() {
        let result = normalize_url("example.com/page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_rejects_special_schemes() {
        for raw in [
            "mailto:a@example.com",
            "tel:+123456",
            "javascript:void(0)",
            "data:text/plain,hi",
        ] {
            let base = Url::parse("https://example.com/").unwrap();
            assert!(
                normalize_url(raw, Some(&base)).is_err(),
                "expected rejection for {}",
                raw
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let cases = [
            "https://example.com/",
            "https://Example.com/a/../b?utm_source=x&z=1&a=2#frag",
            "http://example.com:8080//x/./y/",
        ];
        for raw in cases {
            let once = normalize_url(raw, None).unwrap();
            let twice = normalize_url(once.as_str(), None).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", raw);
        }
    }
}
