use crate::config::AssetKind;
use crate::extract::hints::{scan_source_text, SourceHints};
use crate::url::{classify_asset, normalize_url};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use url::Url;

/// One `<input>`/`<textarea>`/`<select>` inside a form
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Metadata about a `<form>` element
#[derive(Debug, Clone, Serialize)]
pub struct FormInfo {
    /// Resolved absolute action URL, if the form has one
    pub action: Option<String>,
    pub method: String,
    pub inputs: Vec<FormField>,
}

/// Everything extracted from one successfully parsed HTML document
///
/// Outbound links and asset references are canonical URLs in document order,
/// deduplicated. Scope filtering happens later, at the frontier.
#[derive(Debug, Clone)]
pub struct ExtractionRecord {
    pub source_url: Url,

    /// Candidate page links (`a[href]`)
    pub outbound_links: Vec<Url>,

    /// Referenced assets with their classification
    pub asset_refs: Vec<(Url, AssetKind)>,

    /// Heuristic hints per inline `<script>` body
    pub inline_script_hints: Vec<SourceHints>,

    /// All `sourceMappingURL=` references found in inline scripts
    pub source_map_hints: Vec<String>,

    /// All literal fetch/axios call-site URLs found in inline scripts
    pub network_hints: Vec<String>,

    /// Canonical `script[src]` URLs
    pub external_script_urls: Vec<Url>,

    pub forms: Vec<FormInfo>,
}

impl ExtractionRecord {
    /// Empty record for documents that could not be parsed
    pub fn empty(source_url: Url) -> Self {
        Self {
            source_url,
            outbound_links: Vec::new(),
            asset_refs: Vec::new(),
            inline_script_hints: Vec::new(),
            source_map_hints: Vec::new(),
            network_hints: Vec::new(),
            external_script_urls: Vec::new(),
            forms: Vec::new(),
        }
    }

    /// JSON value for the `sources` field of a crawl record
    ///
    /// Includes everything the document yielded, fetched or not: links and
    /// asset references that scope, depth, or the class filter later reject
    /// are still observable here.
    pub fn sources_json(&self) -> serde_json::Value {
        serde_json::json!({
            "outbound_links": self.outbound_links
                .iter()
                .map(Url::as_str)
                .collect::<Vec<_>>(),
            "asset_refs": self.asset_refs
                .iter()
                .map(|(url, kind)| serde_json::json!({
                    "url": url.as_str(),
                    "class": kind,
                }))
                .collect::<Vec<_>>(),
            "inline_scripts": self.inline_script_hints,
            "source_maps": self.source_map_hints,
            "network_hints": self.network_hints,
            "external_script_urls": self.external_script_urls
                .iter()
                .map(Url::as_str)
                .collect::<Vec<_>>(),
            "forms": self.forms,
        })
    }
}

/// Walks the parsed document tree once, collecting links, asset references,
/// inline script hints and form metadata
///
/// References are resolved against `doc_url` and normalized; anything that
/// fails normalization (special schemes, malformed hrefs) is dropped.
pub fn extract_html(html: &str, doc_url: &Url) -> ExtractionRecord {
    let document = Html::parse_document(html);
    let mut record = ExtractionRecord::empty(doc_url.clone());

    let mut seen_links: HashSet<String> = HashSet::new();
    let mut seen_assets: HashSet<String> = HashSet::new();

    let mut push_link = |record: &mut ExtractionRecord, raw: &str| {
        if let Ok(url) = normalize_url(raw, Some(doc_url)) {
            if seen_links.insert(url.as_str().to_string()) {
                record.outbound_links.push(url);
            }
        }
    };

    let mut push_asset = |record: &mut ExtractionRecord, raw: &str, kind_hint: Option<AssetKind>| {
        if let Ok(url) = normalize_url(raw, Some(doc_url)) {
            let kind = kind_hint.unwrap_or_else(|| classify_asset(None, url.path()));
            if seen_assets.insert(url.as_str().to_string()) {
                record.asset_refs.push((url, kind));
            }
        }
    };

    // <a href>
    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push_link(&mut record, href);
            }
        }
    }

    // <link href> for stylesheets, preloads and icons
    if let Ok(selector) = Selector::parse("link[href]") {
        for element in document.select(&selector) {
            let rel = element.value().attr("rel").unwrap_or("");
            let relevant = rel.split_whitespace().any(|r| {
                matches!(r, "stylesheet" | "preload" | "icon" | "shortcut" | "modulepreload")
            });
            if !relevant {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                let hint = if rel.contains("stylesheet") {
                    Some(AssetKind::Css)
                } else {
                    None
                };
                push_asset(&mut record, href, hint);
            }
        }
    }

    // <script src>
    if let Ok(selector) = Selector::parse("script[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                if let Ok(url) = normalize_url(src, Some(doc_url)) {
                    record.external_script_urls.push(url);
                }
                push_asset(&mut record, src, Some(AssetKind::Js));
            }
        }
    }

    // <img src>, srcset variants, <video poster>
    if let Ok(selector) = Selector::parse("img[src]") {
        for element in document.select(&selector) {
            if let Some(src) = element.value().attr("src") {
                push_asset(&mut record, src, Some(AssetKind::Img));
            }
        }
    }
    if let Ok(selector) = Selector::parse("img[srcset], source[srcset]") {
        for element in document.select(&selector) {
            if let Some(srcset) = element.value().attr("srcset") {
                for candidate in srcset.split(',') {
                    if let Some(url_part) = candidate.trim().split_whitespace().next() {
                        push_asset(&mut record, url_part, Some(AssetKind::Img));
                    }
                }
            }
        }
    }
    if let Ok(selector) = Selector::parse("video[poster]") {
        for element in document.select(&selector) {
            if let Some(poster) = element.value().attr("poster") {
                push_asset(&mut record, poster, Some(AssetKind::Img));
            }
        }
    }

    // Inline <script> bodies, scanned with the text heuristics
    if let Ok(selector) = Selector::parse("script") {
        for element in document.select(&selector) {
            if element.value().attr("src").is_some() {
                continue;
            }
            let text: String = element.text().collect();
            if text.trim().is_empty() {
                continue;
            }
            let hints = scan_source_text(&text);
            if !hints.is_empty() {
                record
                    .source_map_hints
                    .extend(hints.source_maps.iter().cloned());
                record
                    .network_hints
                    .extend(hints.network_hints.iter().cloned());
            }
            record.inline_script_hints.push(hints);
        }
    }

    // <form> metadata
    if let Ok(selector) = Selector::parse("form") {
        for element in document.select(&selector) {
            record.forms.push(extract_form(element, doc_url));
        }
    }

    record
}

fn extract_form(form: ElementRef<'_>, doc_url: &Url) -> FormInfo {
    let action = form
        .value()
        .attr("action")
        .filter(|a| !a.trim().is_empty())
        .and_then(|a| doc_url.join(a).ok())
        .map(|u| u.to_string());

    let method = form
        .value()
        .attr("method")
        .unwrap_or("get")
        .to_ascii_lowercase();

    let mut inputs = Vec::new();
    if let Ok(selector) = Selector::parse("input, textarea, select") {
        for field in form.select(&selector) {
            let tag = field.value().name().to_string();
            inputs.push(FormField {
                name: field.value().attr("name").map(str::to_string),
                field_type: field
                    .value()
                    .attr("type")
                    .map(str::to_string)
                    .unwrap_or(tag),
            });
        }
    }

    FormInfo {
        action,
        method,
        inputs,
    }
}
