//! PubMed daily literature metadata via NCBI E-utilities.
//!
//! Metadata only: no PDFs are downloaded and the download engine is never
//! involved. Two requests are made:
//!
//! 1. `esearch.fcgi` for `<term> AND YYYY/MM/DD[dp]` → list of PMIDs
//! 2. `esummary.fcgi` for those PMIDs (skipped when the list is empty)
//!
//! The raw JSON of the last response is written to
//! `<out_dir>/pubmed_<YYYY-MM-DD>.json`.

use super::Pacer;
use crate::fetch::Fetcher;
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

/// Query settings; every field may be overridden from the YAML config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PubMedConfig {
    pub base_url: String,
    pub term: String,
    pub retmax: u32,
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            term: "diabetes".to_string(),
            retmax: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// `esearch` URL for articles published on `date`.
pub fn search_url(config: &PubMedConfig, date: NaiveDate) -> String {
    let term = format!("{} AND {}[dp]", config.term, date.format("%Y/%m/%d"));
    format!(
        "{}/esearch.fcgi?db=pubmed&term={}&retmode=json&retmax={}",
        config.base_url.trim_end_matches('/'),
        urlencoding::encode(&term),
        config.retmax
    )
}

/// `esummary` URL for a batch of PMIDs.
pub fn summary_url(config: &PubMedConfig, ids: &[String]) -> String {
    format!(
        "{}/esummary.fcgi?db=pubmed&id={}&retmode=json",
        config.base_url.trim_end_matches('/'),
        ids.join(",")
    )
}

/// Fetch the day's PubMed metadata and save it as JSON.
///
/// Returns the written path, or `None` when any step failed (already logged).
#[instrument(level = "info", skip_all, fields(date = %date))]
pub async fn fetch_daily_summary<F: Fetcher>(
    fetcher: &F,
    config: &PubMedConfig,
    out_dir: &Path,
    date: NaiveDate,
    pacer: &mut Pacer,
) -> Option<PathBuf> {
    let url = search_url(config, date);
    pacer.wait().await;
    let search_raw = match fetcher.fetch_text(&url).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(%url, error = %e, "PubMed search failed");
            return None;
        }
    };

    let ids = match serde_json::from_str::<SearchResponse>(&search_raw) {
        Ok(response) => response.esearchresult.idlist,
        Err(e) => {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&search_raw, 300),
                "PubMed search returned unexpected JSON"
            );
            return None;
        }
    };
    info!(count = ids.len(), "PubMed search complete");

    let payload = if ids.is_empty() {
        search_raw
    } else {
        let url = summary_url(config, &ids);
        pacer.wait().await;
        let raw = match fetcher.fetch_text(&url).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "PubMed summary failed");
                return None;
            }
        };
        if let Err(e) = serde_json::from_str::<serde_json::Value>(&raw) {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&raw, 300),
                "PubMed summary is not valid JSON"
            );
            return None;
        }
        raw
    };

    let path = out_dir.join(format!("pubmed_{date}.json"));
    if let Err(e) = fs::create_dir_all(out_dir).await {
        error!(error = %e, "Could not create PubMed folder");
        return None;
    }
    match fs::write(&path, payload).await {
        Ok(()) => {
            info!(path = %path.display(), "Saved PubMed metadata");
            Some(path)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed writing PubMed metadata");
            None
        }
    }
}
