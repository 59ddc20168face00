use crate::extract::hints::scan_source_text;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn css_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).unwrap())
}

/// References found in a CSS document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssRefs {
    /// `url(...)` references, deduplicated and sorted
    pub urls: Vec<String>,

    /// `sourceMappingURL=` references
    pub source_maps: Vec<String>,
}

/// Scans CSS text for `url(...)` references and source map comments
///
/// `data:` URIs are skipped; everything else is returned as written so the
/// caller can resolve it against the stylesheet URL.
pub fn extract_css(text: &str) -> CssRefs {
    let urls: BTreeSet<String> = css_url_re()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|u| !u.starts_with("data:"))
        .collect();

    CssRefs {
        urls: urls.into_iter().collect(),
        source_maps: scan_source_text(text).source_maps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_refs() {
        let css = r#"
            body { background: url(/img/bg.png); }
            .icon { background-image: url("../icons/x.svg"); }
            @font-face { src: url('fonts/face.woff2'); }
        "#;
        let refs = extract_css(css);
        assert_eq!(
            refs.urls,
            vec!["../icons/x.svg", "/img/bg.png", "fonts/face.woff2"]
        );
    }

    #[test]
    fn test_data_uri_skipped() {
        let refs = extract_css("a { background: url(data:image/png;base64,AAAA); }");
        assert!(refs.urls.is_empty());
    }

    #[test]
    fn test_source_map() {
        let refs = extract_css("body{}\n/*# sourceMappingURL=main.css.map */");
        assert_eq!(refs.source_maps, vec!["main.css.map"]);
    }

    #[test]
    fn test_plain_css() {
        let refs = extract_css("body { color: red; }");
        assert!(refs.urls.is_empty());
        assert!(refs.source_maps.is_empty());
    }
}
