//! On-disk mirror layout, metadata logs and link rewriting
//!
//! The writer exclusively owns the output directory tree and the log file
//! handles. Layout under `<result>/mirror/<host>/`:
//!
//! ```text
//! _meta/crawl.jsonl      one JSON record per fetched resource
//! _meta/errors.jsonl     one JSON record per failed fetch/extract/write
//! _meta/summary.json     final crawl summary, written once
//! pages/...              HTML documents (rewritten when enabled)
//! assets/<class>/...     js/css/img/font per --include-assets
//! raw/...                unmodified response bytes, only with --store-raw
//! ```

mod paths;
mod rewrite;
mod writer;

pub use paths::{asset_rel_path, page_rel_path, raw_file_name, with_content_digest, MirrorLayout};
pub use rewrite::{relative_ref, rewrite_css_document, rewrite_html_document};
pub use writer::{ErrorStage, MirrorWriter, ResourceKind};
