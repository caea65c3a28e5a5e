//! YAML configuration for sources, feeds and the PubMed query.
//!
//! Every section is optional; omitted sections fall back to the built-in
//! defaults. A missing or invalid file is logged and the defaults are used.
//!
//! ```yaml
//! sources:
//!   - name: WHO
//!     seeds: ["https://www.who.int/publications"]
//!   - name: NICE
//!     seeds: ["https://www.nice.org.uk/search?q=diabetes"]
//!     follow:
//!       - href_contains: /guidance/
//!     require_keyword: false
//! feeds:
//!   - https://www.thelancet.com/rssfeed/landia_current.xml
//! pubmed:
//!   term: diabetes mellitus
//!   retmax: 50
//! ```

use crate::models::SourceDescriptor;
use crate::scrapers::{default_sources, pubmed::PubMedConfig, rss::DEFAULT_FEEDS};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub sources: Vec<SourceDescriptor>,
    pub feeds: Vec<String>,
    pub pubmed: PubMedConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            pubmed: PubMedConfig::default(),
        }
    }
}

/// Load the config file, or the defaults when `path` is `None` or unusable.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&Path>) -> WatchConfig {
    let Some(path) = path else {
        info!("No config file given; using built-in sources");
        return WatchConfig::default();
    };

    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read config; using built-in sources");
            return WatchConfig::default();
        }
    };

    match serde_yaml::from_str::<WatchConfig>(&raw) {
        Ok(config) => {
            info!(
                path = %path.display(),
                sources = config.sources.len(),
                feeds = config.feeds.len(),
                "Loaded config"
            );
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid config; using built-in sources");
            WatchConfig::default()
        }
    }
}
