//! HTTP access for pages and documents.
//!
//! All network I/O goes through the [`Fetcher`] trait so the crawl and
//! download logic can run against an in-memory fake in tests. The production
//! implementation, [`HttpFetcher`], wraps a shared `reqwest` client.
//!
//! # Outcome classification
//!
//! | Outcome | Result |
//! |---------|--------|
//! | HTTP 200 | `Ok(body)` |
//! | Any other status | [`FetchError::Status`] |
//! | DNS, connect, timeout, body read | [`FetchError::Transport`] |
//!
//! There are no retries: a failed fetch means "nothing from this URL this run".

use crate::extract::Page;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Identification header sent with every request.
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (guideline archiver)"
);

/// Timeout for HTML pages and metadata APIs.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for binary document downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(45);

/// Why a fetch produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Retrieves remote content.
///
/// Implementations must only return `Ok` for an HTTP 200 response.
pub trait Fetcher {
    /// Fetch a page or API response as text (page timeout).
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch a binary document (download timeout).
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetch an HTML page, returning the URL it was finally served from
    /// alongside the body. Fetchers that do not follow redirects report the
    /// requested URL.
    async fn fetch_html(&self, url: &Url) -> Result<(Url, String), FetchError> {
        let body = self.fetch_text(url.as_str()).await?;
        Ok((url.clone(), body))
    }
}

/// Fetch and parse an HTML page into a [`Page`].
///
/// Relative links resolve against the URL the page was finally served from,
/// so a seed that redirects elsewhere still yields correct absolute links.
/// The body is parsed immediately; the HTML tree is not held across awaits.
#[instrument(level = "debug", skip(fetcher))]
pub async fn fetch_page<F: Fetcher>(fetcher: &F, url: &str) -> Result<Page, FetchError> {
    let requested = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let (base, body) = fetcher.fetch_html(&requested).await?;
    if base != requested {
        debug!(final_url = %base, "Page was redirected");
    }
    let page = Page::parse(base, &body);
    debug!(anchors = page.anchor_count(), "Parsed page");
    Ok(page)
}

/// [`Fetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher sending [`USER_AGENT`] on every request.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response, FetchError> {
        info!(%url, timeout_secs = timeout.as_secs(), "Requesting");
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, elapsed_ms = t0.elapsed().as_millis() as u64, "Request failed");
                FetchError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%url, status = status.as_u16(), "Non-200 response");
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url, PAGE_TIMEOUT).await?;
        response.text().await.map_err(|e| {
            warn!(%url, error = %e, "Failed reading response body");
            FetchError::Transport(e.to_string())
        })
    }

    async fn fetch_html(&self, url: &Url) -> Result<(Url, String), FetchError> {
        let response = self.get(url.as_str(), PAGE_TIMEOUT).await?;
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| {
            warn!(%url, error = %e, "Failed reading response body");
            FetchError::Transport(e.to_string())
        })?;
        Ok((final_url, body))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url, DOWNLOAD_TIMEOUT).await?;
        let bytes = response.bytes().await.map_err(|e| {
            warn!(%url, error = %e, "Failed reading download body");
            FetchError::Transport(e.to_string())
        })?;
        debug!(%url, bytes = bytes.len(), "Downloaded");
        Ok(bytes.to_vec())
    }
}
