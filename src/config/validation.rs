use crate::config::types::{AssetKind, CrawlConfig};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates a fully assembled crawl configuration
///
/// All violations are fatal at startup: the crawl never begins.
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    let scheme = config.seed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::InvalidSeed(format!(
            "seed must be http(s), got scheme '{}'",
            scheme
        )));
    }

    if config.seed_url.host_str().is_none() {
        return Err(ConfigError::InvalidSeed(
            "seed URL has no host".to_string(),
        ));
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Parses a comma-separated asset list like `"js,css,img,font"`
pub fn parse_asset_list(list: &str) -> Result<HashSet<AssetKind>, ConfigError> {
    let mut kinds = HashSet::new();
    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        kinds.insert(part.parse::<AssetKind>()?);
    }
    Ok(kinds)
}
