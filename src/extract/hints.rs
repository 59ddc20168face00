use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn source_map_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sourceMappingURL\s*=\s*([^\s*]+)").unwrap())
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:import\s+(?:[^'"]+from\s+)?|import\()\s*['"]([^'"]+)['"]"#).unwrap()
    })
}

fn network_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:fetch|axios\.(?:get|post|put|delete|patch))\s*\(\s*['"]([^'"]+)['"]"#)
            .unwrap()
    })
}

/// Hints scraped from script text without executing it
///
/// Lossy by construction: literal string arguments only, no evaluation,
/// no awareness of string concatenation or template literals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceHints {
    /// `sourceMappingURL=` references
    pub source_maps: Vec<String>,

    /// ES module import specifiers (static and dynamic)
    pub imports: Vec<String>,

    /// Literal `fetch(...)` / `axios.<verb>(...)` call-site URLs
    pub network_hints: Vec<String>,
}

impl SourceHints {
    pub fn is_empty(&self) -> bool {
        self.source_maps.is_empty() && self.imports.is_empty() && self.network_hints.is_empty()
    }
}

/// Scans JS (or inline script) text for source maps, imports and network
/// call sites. Results are deduplicated and sorted.
pub fn scan_source_text(text: &str) -> SourceHints {
    let source_maps: BTreeSet<String> = source_map_re()
        .captures_iter(text)
        .map(|c| c[1].trim_end_matches("*/").trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let imports: BTreeSet<String> = import_re()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect();

    let network_hints: BTreeSet<String> = network_hint_re()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect();

    SourceHints {
        source_maps: source_maps.into_iter().collect(),
        imports: imports.into_iter().collect(),
        network_hints: network_hints.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_map_comment() {
        let hints = scan_source_text("console.log(1);\n//# sourceMappingURL=app.js.map\n");
        assert_eq!(hints.source_maps, vec!["app.js.map"]);
    }

    #[test]
    fn test_source_map_block_comment() {
        let hints = scan_source_text("/*# sourceMappingURL=bundle.css.map */");
        assert_eq!(hints.source_maps, vec!["bundle.css.map"]);
    }

    #[test]
    fn test_static_imports() {
        let js = r#"
            import { a } from "./a.js";
            import b from './lib/b.js';
            import "side-effect";
        "#;
        let hints = scan_source_text(js);
        assert_eq!(hints.imports, vec!["./a.js", "./lib/b.js", "side-effect"]);
    }

    #[test]
    fn test_dynamic_import() {
        let hints = scan_source_text(r#"const m = await import("./lazy.js");"#);
        assert_eq!(hints.imports, vec!["./lazy.js"]);
    }

    #[test]
    fn test_network_hints() {
        let js = r#"
            fetch("/api/items");
            axios.get('/api/users');
            axios.post("/api/login", body);
        "#;
        let hints = scan_source_text(js);
        assert_eq!(
            hints.network_hints,
            vec!["/api/items", "/api/login", "/api/users"]
        );
    }

    #[test]
    fn test_dedup() {
        let js = r#"fetch("/api/x"); fetch("/api/x");"#;
        let hints = scan_source_text(js);
        assert_eq!(hints.network_hints, vec!["/api/x"]);
    }

    #[test]
    fn test_non_literal_calls_ignored() {
        // Heuristic only sees literal string arguments.
        let hints = scan_source_text("fetch(buildUrl()); axios.get(endpoint);");
        assert!(hints.network_hints.is_empty());
    }

    #[test]
    fn test_empty_text() {
        assert!(scan_source_text("").is_empty());
    }
}
