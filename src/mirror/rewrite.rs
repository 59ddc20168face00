use crate::url::normalize_url;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

/// HTML attributes eligible for rewriting
const REWRITE_ATTRS: &[(&str, &str)] = &[
    ("a", "href"),
    ("link", "href"),
    ("script", "src"),
    ("img", "src"),
];

fn css_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap())
}

/// Relative reference from one mirror file to another
///
/// Both paths must be absolute paths inside the same mirror tree. The result
/// uses forward slashes so it works as a URL reference.
pub fn relative_ref(from_file: &Path, to_file: &Path) -> String {
    let from_dir: Vec<_> = from_file
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    let to_parts: Vec<_> = to_file.components().collect();

    let common = from_dir
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    parts.extend(
        to_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Rewrites in-mirror references of a stored HTML document to relative paths
///
/// Pure function over (document text, URL→path map): references whose
/// canonical URL is in the map become paths relative to `doc_path`;
/// everything else (out of scope, unfetched) is left untouched. Replacement
/// is textual on the stored source, matching `attr="value"` / `attr='value'`
/// pairs collected from the parsed tree. Best effort, like the extraction
/// heuristics: identical `attr="value"` text inside `<pre>` blocks or script
/// bodies is rewritten too, since replacements are not anchored to the
/// elements they came from.
pub fn rewrite_html_document(
    html: &str,
    doc_url: &Url,
    doc_path: &Path,
    local_map: &HashMap<String, PathBuf>,
) -> String {
    let document = Html::parse_document(html);
    let mut replacements: Vec<(String, String)> = Vec::new();

    for (tag, attr) in REWRITE_ATTRS {
        let Ok(selector) = Selector::parse(&format!("{}[{}]", tag, attr)) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(raw) = element.value().attr(attr) else {
                continue;
            };
            let Ok(canonical) = normalize_url(raw, Some(doc_url)) else {
                continue;
            };
            let Some(target) = local_map.get(canonical.as_str()) else {
                continue;
            };
            let rel = relative_ref(doc_path, target);
            if rel == raw {
                continue;
            }
            for quote in ['"', '\''] {
                replacements.push((
                    format!("{}={q}{}{q}", attr, raw, q = quote),
                    format!("{}={q}{}{q}", attr, rel, q = quote),
                ));
            }
        }
    }

    replacements.sort();
    replacements.dedup();

    let mut out = html.to_string();
    for (from, to) in replacements {
        out = out.replace(&from, &to);
    }
    out
}

/// Rewrites in-mirror `url(...)` references of a stored CSS document
pub fn rewrite_css_document(
    css: &str,
    doc_url: &Url,
    doc_path: &Path,
    local_map: &HashMap<String, PathBuf>,
) -> String {
    css_url_re()
        .replace_all(css, |caps: &regex::Captures| {
            let raw = &caps[1];
            let mapped = normalize_url(raw, Some(doc_url))
                .ok()
                .and_then(|canonical| local_map.get(canonical.as_str()));
            match mapped {
                Some(target) => format!("url(\"{}\")", relative_ref(doc_path, target)),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> HashMap<String, PathBuf> {
        entries
            .iter()
            .map(|(u, p)| (u.to_string(), PathBuf::from(p)))
            .collect()
    }

    #[test]
    fn test_relative_ref_sibling() {
        let rel = relative_ref(
            Path::new("/m/pages/a.html"),
            Path::new("/m/pages/b.html"),
        );
        assert_eq!(rel, "b.html");
    }

    #[test]
    fn test_relative_ref_across_trees() {
        let rel = relative_ref(
            Path::new("/m/pages/docs/a.html"),
            Path::new("/m/assets/css/site.css"),
        );
        assert_eq!(rel, "../../assets/css/site.css");
    }

    #[test]
    fn test_rewrite_html_in_mirror_link() {
        let doc_url = Url::parse("https://example.com/a.html").unwrap();
        let local_map = map(&[
            ("https://example.com/a.html", "/m/pages/a.html"),
            ("https://example.com/b.html", "/m/pages/b.html"),
        ]);
        let html = r#"<html><body><a href="/b.html">B</a></body></html>"#;
        let out = rewrite_html_document(html, &doc_url, Path::new("/m/pages/a.html"), &local_map);
        assert!(out.contains(r#"href="b.html""#), "got: {}", out);
    }

    #[test]
    fn test_rewrite_html_leaves_unmapped_absolute() {
        let doc_url = Url::parse("https://example.com/a.html").unwrap();
        let local_map = map(&[("https://example.com/a.html", "/m/pages/a.html")]);
        let html = r#"<a href="https://external.net/x">X</a>"#;
        let out = rewrite_html_document(html, &doc_url, Path::new("/m/pages/a.html"), &local_map);
        assert_eq!(out, html);
    }

    #[test]
    fn test_rewrite_roundtrip_resolves_to_target() {
        // Resolving the rewritten relative link from the document's own
        // mirror path must land exactly on the target's mirror path.
        let doc_url = Url::parse("https://example.com/docs/a.html").unwrap();
        let doc_path = Path::new("/m/pages/docs/a.html");
        let target_path = "/m/assets/css/site.css";
        let local_map = map(&[("https://example.com/site.css", target_path)]);

        let html = r#"<link rel="stylesheet" href="/site.css">"#;
        let out = rewrite_html_document(html, &doc_url, doc_path, &local_map);

        let rel_start = out.find("href=\"").unwrap() + 6;
        let rel_end = out[rel_start..].find('"').unwrap() + rel_start;
        let rel = &out[rel_start..rel_end];

        let mut resolved = doc_path.parent().unwrap().to_path_buf();
        for part in rel.split('/') {
            if part == ".." {
                resolved.pop();
            } else {
                resolved.push(part);
            }
        }
        assert_eq!(resolved, PathBuf::from(target_path));
    }

    #[test]
    fn test_rewrite_css() {
        let doc_url = Url::parse("https://example.com/css/site.css").unwrap();
        let doc_path = Path::new("/m/assets/css/site.css");
        let local_map = map(&[("https://example.com/img/bg.png", "/m/assets/img/img/bg.png")]);

        let css = "body { background: url(/img/bg.png); border-image: url(/img/missing.png); }";
        let out = rewrite_css_document(css, &doc_url, doc_path, &local_map);
        assert!(out.contains(r#"url("../img/img/bg.png")"#), "got: {}", out);
        assert!(out.contains("url(/img/missing.png)"));
    }

    #[test]
    fn test_rewrite_is_pure() {
        let doc_url = Url::parse("https://example.com/a.html").unwrap();
        let local_map = map(&[("https://example.com/b.html", "/m/pages/b.html")]);
        let html = r#"<a href="/b.html">B</a>"#;
        let once = rewrite_html_document(html, &doc_url, Path::new("/m/pages/a.html"), &local_map);
        let again = rewrite_html_document(html, &doc_url, Path::new("/m/pages/a.html"), &local_map);
        assert_eq!(once, again);
    }
}
