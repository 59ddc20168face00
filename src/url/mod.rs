//! URL canonicalization and classification
//!
//! Pure functions with no crawl state: normalization, scope membership and
//! asset classification. Every URL the crawler touches goes through
//! [`normalize_url`] first so the frontier's visited set only ever sees
//! canonical forms.

mod normalize;
mod scope;

pub use normalize::normalize_url;
pub use scope::{classify_asset, host_key, in_scope, looks_like_page};
