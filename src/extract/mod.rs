//! Content extraction: links, asset references and source hints
//!
//! Two clearly separated stages feed the frontier and the metadata logs:
//!
//! * structural extraction walks the parsed HTML tree once ([`html`])
//! * heuristic extraction scans script/CSS text with regexes ([`hints`],
//!   [`css`]) — lossy and non-authoritative by design, it is not a JS parser
//!
//! Extraction never fails the crawl; a parse problem degrades to an empty
//! record plus a logged warning.

mod css;
mod hints;
mod html;

pub use css::{extract_css, CssRefs};
pub use hints::{scan_source_text, SourceHints};
pub use html::{extract_html, ExtractionRecord, FormField, FormInfo};
