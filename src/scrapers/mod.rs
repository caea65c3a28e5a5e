//! Source scrapers for health-organization websites.
//!
//! Each publisher is described by a [`SourceDescriptor`]; the built-in
//! descriptors live in one submodule per site. Crawling is generic: every
//! source runs through [`crawl_source`], a staged descent from seed pages
//! through zero or more follow stages to a final PDF collection pass.
//!
//! # Supported Sources
//!
//! | Source | Module | Stages | Keyword filter |
//! |--------|--------|--------|----------------|
//! | ADA | [`ada`] | seeds → PDFs | off |
//! | WHO | [`who`] | seeds → PDFs | on |
//! | IDF | [`idf`] | seeds → PDFs | on |
//! | MOHFW | [`mohfw`] | seeds → PDFs | on |
//! | NICE | [`nice`] | search → guidance pages → PDFs | on, then off |
//! | PubMed | [`pubmed`] | metadata only | n/a |
//! | RSS | [`rss`] | feed entries; direct PDF links downloaded | n/a |
//!
//! Page fetches within a source are spaced by a [`Pacer`]. A page that fails
//! to load contributes no links; it never aborts the source.

pub mod ada;
pub mod idf;
pub mod mohfw;
pub mod nice;
pub mod pubmed;
pub mod rss;
pub mod who;

use crate::extract::{extract_follow_links, extract_pdf_links};
use crate::fetch::{Fetcher, fetch_page};
use crate::models::SourceDescriptor;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Built-in sources in crawl order.
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        ada::descriptor(),
        who::descriptor(),
        idf::descriptor(),
        mohfw::descriptor(),
        nice::descriptor(),
    ]
}

/// Fixed courtesy delay between consecutive page fetches.
///
/// The first call to [`Pacer::wait`] returns immediately.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    pub async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            debug!(delay_ms = self.delay.as_millis() as u64, "Pausing between requests");
            sleep(self.delay).await;
        }
        self.started = true;
    }
}

/// Crawl one source and return its candidate PDF URLs, sorted and deduplicated.
///
/// Seeds form the initial frontier. Each follow stage replaces the frontier
/// with the sub-page links found on it; the final frontier is scanned for
/// PDF links under the source's keyword policy.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn crawl_source<F: Fetcher>(
    fetcher: &F,
    source: &SourceDescriptor,
    pacer: &mut Pacer,
) -> BTreeSet<String> {
    let mut frontier: Vec<String> = source.seeds.iter().cloned().unique().collect();

    for (depth, stage) in source.follow.iter().enumerate() {
        let mut next = BTreeSet::new();
        for page_url in &frontier {
            pacer.wait().await;
            match fetch_page(fetcher, page_url).await {
                Ok(page) => {
                    let links =
                        extract_follow_links(&page, &page.url, stage.href_contains.as_deref());
                    info!(url = %page_url, depth, count = links.len(), "Found sub-pages to follow");
                    next.extend(links);
                }
                Err(e) => warn!(url = %page_url, depth, error = %e, "Page fetch failed; no links from it"),
            }
        }
        frontier = next.into_iter().collect();
    }

    let mut candidates = BTreeSet::new();
    for page_url in &frontier {
        pacer.wait().await;
        match fetch_page(fetcher, page_url).await {
            Ok(page) => {
                let links = extract_pdf_links(&page, &page.url, source.require_keyword);
                info!(url = %page_url, count = links.len(), "Found PDF links");
                candidates.extend(links);
            }
            Err(e) => warn!(url = %page_url, error = %e, "Page fetch failed; no links from it"),
        }
    }

    info!(count = candidates.len(), pages = frontier.len(), "Collected candidate PDFs");
    candidates
}
