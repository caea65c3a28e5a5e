//! Journal RSS/Atom feeds.
//!
//! Feeds are recorded as metadata: every entry from every feed is written to
//! `<out_dir>/rss_<YYYY-MM-DD>.json`. Entries linking straight to a PDF are
//! also handed to the download engine under the `RSS` source.

use super::Pacer;
use crate::engine::DownloadEngine;
use crate::fetch::Fetcher;
use crate::models::SourceTally;
use crate::utils::ends_with_ignore_ascii_case;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument, warn};

/// Source name used in the index for feed downloads.
pub const RSS_SOURCE: &str = "RSS";

/// Feeds polled when the config does not list any.
pub const DEFAULT_FEEDS: &[&str] = &["https://www.thelancet.com/rssfeed/landia_current.xml"];

/// One `<item>` (RSS 2.0) or `<entry>` (Atom).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

impl FeedEntry {
    pub fn links_to_pdf(&self) -> bool {
        ends_with_ignore_ascii_case(&self.link, ".pdf")
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    Published,
}

/// Atom `<link href="...">`; only the first alternate link is kept.
fn take_atom_link(entry: &mut FeedEntry, element: &BytesStart<'_>) -> quick_xml::Result<()> {
    if !entry.link.is_empty() {
        return Ok(());
    }
    let rel = match element.try_get_attribute("rel")? {
        Some(attr) => attr.unescape_value()?.into_owned(),
        None => "alternate".to_string(),
    };
    if rel != "alternate" {
        return Ok(());
    }
    if let Some(href) = element.try_get_attribute("href")? {
        entry.link = href.unescape_value()?.trim().to_string();
    }
    Ok(())
}

fn push_text(entry: &mut FeedEntry, field: Field, text: &str) {
    let text = text.trim();
    match field {
        Field::Title => entry.title.push_str(text),
        Field::Link => entry.link.push_str(text),
        Field::Published => {
            entry.published.get_or_insert_with(String::new).push_str(text);
        }
    }
}

/// Parse an RSS 2.0 or Atom document into its entries.
pub fn parse_feed(xml: &str) -> quick_xml::Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" | b"entry" => current = Some(FeedEntry::default()),
                b"title" => field = Some(Field::Title),
                b"link" => {
                    field = Some(Field::Link);
                    if let Some(entry) = current.as_mut() {
                        take_atom_link(entry, &e)?;
                    }
                }
                b"pubDate" | b"published" | b"updated" | b"date" => {
                    // First date element wins.
                    field = match current.as_ref() {
                        Some(entry) if entry.published.is_some() => None,
                        _ => Some(Field::Published),
                    };
                }
                _ => field = None,
            },
            Event::Empty(e) if e.local_name().as_ref() == b"link" => {
                if let Some(entry) = current.as_mut() {
                    take_atom_link(entry, &e)?;
                }
            }
            Event::Text(t) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    push_text(entry, f, &t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    push_text(entry, f, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                if matches!(e.local_name().as_ref(), b"item" | b"entry") {
                    entries.extend(current.take());
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Poll every feed, download direct PDF links and save the entries as JSON.
#[instrument(level = "info", skip_all, fields(feeds = feeds.len()))]
pub async fn process_feeds<F: Fetcher>(
    fetcher: &F,
    engine: &mut DownloadEngine,
    feeds: &[String],
    out_dir: &Path,
    date: NaiveDate,
    pacer: &mut Pacer,
) -> SourceTally {
    let mut tally = SourceTally::default();
    let mut snapshot: BTreeMap<&str, Vec<FeedEntry>> = BTreeMap::new();

    for feed in feeds {
        pacer.wait().await;
        let xml = match fetcher.fetch_text(feed).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(%feed, error = %e, "Feed fetch failed");
                continue;
            }
        };
        let entries = match parse_feed(&xml) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%feed, error = %e, "Feed is not valid XML");
                continue;
            }
        };
        info!(%feed, count = entries.len(), "Parsed feed");

        for entry in entries.iter().filter(|e| e.links_to_pdf()) {
            tally.candidates += 1;
            let outcome = engine.download(fetcher, &entry.link, out_dir, RSS_SOURCE).await;
            tally.add_outcome(&outcome);
        }
        snapshot.insert(feed.as_str(), entries);
    }

    if snapshot.is_empty() {
        return tally;
    }

    let path = out_dir.join(format!("rss_{date}.json"));
    let json = match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize feed entries");
            return tally;
        }
    };
    if let Err(e) = fs::create_dir_all(out_dir).await {
        error!(error = %e, "Could not create RSS folder");
    } else if let Err(e) = fs::write(&path, json).await {
        error!(path = %path.display(), error = %e, "Failed writing feed entries");
    } else {
        info!(path = %path.display(), "Saved feed entries");
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeFetcher;
    use crate::state::{SeenUrls, StateStore};
    use std::time::Duration;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Journal</title>
  <item>
    <title>Glucose targets &amp; outcomes</title>
    <link>https://journal.test/article/1</link>
    <pubDate>Sat, 17 Oct 2026 00:00:00 GMT</pubDate>
  </item>
  <item>
    <title><![CDATA[Consensus report (PDF)]]></title>
    <link> https://journal.test/files/consensus.PDF </link>
  </item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom journal</title>
  <entry>
    <title>Insulin pricing</title>
    <link rel="related" href="https://journal.test/related"/>
    <link href="https://journal.test/a/2"/>
    <updated>2026-10-18T08:00:00Z</updated>
    <published>2026-10-17T08:00:00Z</published>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let entries = parse_feed(RSS).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Glucose targets & outcomes");
        assert_eq!(entries[0].link, "https://journal.test/article/1");
        assert_eq!(
            entries[0].published.as_deref(),
            Some("Sat, 17 Oct 2026 00:00:00 GMT")
        );
        assert_eq!(entries[1].title, "Consensus report (PDF)");
        assert_eq!(entries[1].link, "https://journal.test/files/consensus.PDF");
        assert!(entries[1].links_to_pdf());
        assert!(!entries[0].links_to_pdf());
    }

    #[test]
    fn test_parse_atom_entries() {
        let entries = parse_feed(ATOM).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Insulin pricing");
        assert_eq!(entries[0].link, "https://journal.test/a/2");
        assert_eq!(entries[0].published.as_deref(), Some("2026-10-18T08:00:00Z"));
    }

    #[test]
    fn test_parse_rejects_broken_xml() {
        assert!(parse_feed("<rss><channel><item></channel></rss>").is_err());
    }

    #[tokio::test]
    async fn test_process_feeds_downloads_pdf_entries_and_saves_json() {
        let tmp = tempfile::tempdir().unwrap();
        let out_dir = tmp.path().join("RSS");
        let feed = "https://journal.test/rss.xml".to_string();
        let fetcher = FakeFetcher::new()
            .with_page(&feed, RSS)
            .with_file("https://journal.test/files/consensus.PDF", b"%PDF");
        let store = StateStore::new(tmp.path().join("seen.json"), tmp.path().join("index.csv"));
        let mut engine = DownloadEngine::new(store, SeenUrls::new());
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let tally = process_feeds(
            &fetcher,
            &mut engine,
            &[feed.clone(), "https://journal.test/missing.xml".to_string()],
            &out_dir,
            date,
            &mut Pacer::new(Duration::ZERO),
        )
        .await;

        assert_eq!(tally.candidates, 1);
        assert_eq!(tally.saved, 1);
        assert!(out_dir.join("consensus.PDF").exists());
        assert_eq!(engine.records()[0].source, RSS_SOURCE);

        let raw = std::fs::read_to_string(out_dir.join("rss_2026-10-18.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[feed.as_str()].as_array().unwrap().len(), 2);
        assert!(json.get("https://journal.test/missing.xml").is_none());
    }
}
