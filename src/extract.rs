//! Link extraction from parsed HTML.
//!
//! Extraction works against the [`AnchorDocument`] capability (iterate
//! anchors, read href, read visible text) rather than a concrete parser.
//! `scraper::Html` implements it directly; [`Page`] is a parsed snapshot that
//! owns its anchors so it can be kept across awaits.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Keyword stem deciding whether a link is on topic.
pub const TOPIC_STEM: &str = "diabet";

static TOPIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i){TOPIC_STEM}")).expect("topic regex is valid"));

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// A hyperlink as found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Raw `href` attribute, possibly relative.
    pub href: String,
    /// Visible text with whitespace collapsed.
    pub text: String,
}

/// Anything that can list its hyperlinks.
pub trait AnchorDocument {
    fn anchors(&self) -> Vec<Anchor>;
}

impl AnchorDocument for Html {
    fn anchors(&self) -> Vec<Anchor> {
        self.select(&ANCHOR_SELECTOR)
            .filter_map(|element| {
                let href = element.value().attr("href")?.trim();
                Some(Anchor {
                    href: href.to_string(),
                    text: element.text().flat_map(str::split_whitespace).join(" "),
                })
            })
            .collect()
    }
}

/// A fetched page reduced to its URL and anchors.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    anchors: Vec<Anchor>,
}

impl Page {
    /// Parse an HTML body. Malformed markup yields whatever anchors the
    /// parser recovers, possibly none.
    pub fn parse(url: Url, body: &str) -> Self {
        let document = Html::parse_document(body);
        Self {
            url,
            anchors: document.anchors(),
        }
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

impl AnchorDocument for Page {
    fn anchors(&self) -> Vec<Anchor> {
        self.anchors.clone()
    }
}

/// Whether `s` mentions the topic stem, ignoring case.
pub fn mentions_topic(s: &str) -> bool {
    TOPIC_RE.is_match(s)
}

/// Loose PDF test: `.pdf` anywhere in the href, ignoring case.
///
/// Matches `...file.pdf?download=1` and `/x.pdf/view` as well as incidental
/// hits such as `/a.pdfs`.
pub fn looks_like_pdf(href: &str) -> bool {
    href.to_ascii_lowercase().contains(".pdf")
}

/// Resolve `href` against `base`, keeping only http(s) results.
fn resolve(base: &Url, href: &str) -> Option<Url> {
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Collect absolute PDF URLs from a document.
///
/// When `require_keyword` is set, a link is kept only if the topic stem
/// appears in its href or visible text.
pub fn extract_pdf_links<D: AnchorDocument>(
    doc: &D,
    base_url: &Url,
    require_keyword: bool,
) -> HashSet<String> {
    doc.anchors()
        .into_iter()
        .filter(|a| !require_keyword || mentions_topic(&a.href) || mentions_topic(&a.text))
        .filter(|a| looks_like_pdf(&a.href))
        .filter_map(|a| resolve(base_url, &a.href))
        .map(String::from)
        .collect()
}

/// Collect absolute URLs of sub-pages worth descending into.
///
/// A link qualifies when its visible text mentions the topic stem and, if
/// `href_contains` is given, its resolved URL contains that fragment.
/// Fragments (`#...`) are dropped so in-page anchors collapse to one page.
pub fn extract_follow_links<D: AnchorDocument>(
    doc: &D,
    base_url: &Url,
    href_contains: Option<&str>,
) -> HashSet<String> {
    doc.anchors()
        .into_iter()
        .filter(|a| mentions_topic(&a.text))
        .filter_map(|a| resolve(base_url, &a.href))
        .map(|mut url| {
            url.set_fragment(None);
            String::from(url)
        })
        .filter(|url| href_contains.is_none_or(|fragment| url.contains(fragment)))
        .collect()
}
