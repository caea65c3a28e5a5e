//! Data models shared across the crawl pipeline.
//!
//! - [`SourceDescriptor`]: static description of one publisher (seeds, stages, policy)
//! - [`FollowStage`]: one hop of a multi-stage crawl
//! - [`IndexEntry`]: one durable row of the download index
//! - [`DownloadRecord`]: a file downloaded during the current run
//! - [`DownloadOutcome`] / [`SourceTally`]: per-candidate and per-source results

use serde::Deserialize;
use std::path::PathBuf;

/// A publisher crawled for guideline PDFs.
///
/// Sources are static configuration: built-in defaults live in the
/// `scrapers` modules and may be replaced wholesale from the YAML config.
///
/// Crawling descends from `seeds` through each entry of `follow` in order,
/// then collects PDF links from the pages reached by the last stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceDescriptor {
    /// Short display name, also used as the `source` column of the index.
    pub name: String,
    /// Pages fetched first.
    pub seeds: Vec<String>,
    /// Intermediate hops selecting sub-pages before PDF collection.
    #[serde(default)]
    pub follow: Vec<FollowStage>,
    /// Whether PDF links must mention the topic keyword.
    #[serde(default = "default_require_keyword")]
    pub require_keyword: bool,
    /// Output folder under the data root; defaults to `name`.
    #[serde(default)]
    pub folder: Option<String>,
}

fn default_require_keyword() -> bool {
    true
}

impl SourceDescriptor {
    /// Folder name PDFs from this source are written to.
    pub fn folder(&self) -> &str {
        self.folder.as_deref().unwrap_or(&self.name)
    }
}

/// One hop of a staged crawl.
///
/// Keeps links whose visible text mentions the topic keyword and, when
/// `href_contains` is set, whose absolute URL contains that fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FollowStage {
    #[serde(default)]
    pub href_contains: Option<String>,
}

/// A row of the append-only download index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub source: String,
    pub filename: String,
    pub url: String,
    /// ISO-8601 UTC timestamp of the download.
    pub download_date: String,
}

/// A file saved during the current run; feeds the notification only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub source: String,
    pub filename: String,
    pub url: String,
}

/// What the download engine did with one candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// URL already recorded in a previous or the current run.
    AlreadySeen,
    /// A file with the derived name already existed; URL adopted without fetching.
    Adopted,
    /// Downloaded and written to the given path.
    Saved(PathBuf),
    /// Fetch or write failed; state untouched so the next run retries.
    Failed,
}

/// Per-source counters for the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceTally {
    pub candidates: usize,
    pub saved: usize,
    pub already_seen: usize,
    pub adopted: usize,
    pub failed: usize,
}

impl SourceTally {
    pub fn add_outcome(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::AlreadySeen => self.already_seen += 1,
            DownloadOutcome::Adopted => self.adopted += 1,
            DownloadOutcome::Saved(_) => self.saved += 1,
            DownloadOutcome::Failed => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &SourceTally) {
        self.candidates += other.candidates;
        self.saved += other.saved;
        self.already_seen += other.already_seen;
        self.adopted += other.adopted;
        self.failed += other.failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_defaults_to_name() {
        let source = SourceDescriptor {
            name: "WHO".to_string(),
            seeds: vec![],
            follow: vec![],
            require_keyword: true,
            folder: None,
        };
        assert_eq!(source.folder(), "WHO");
    }

    #[test]
    fn test_source_deserialization_defaults() {
        let yaml = r#"
name: IDF
seeds:
  - https://idf.org/resources/
"#;
        let source: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(source.name, "IDF");
        assert!(source.require_keyword);
        assert!(source.follow.is_empty());
        assert_eq!(source.folder(), "IDF");
    }

    #[test]
    fn test_source_deserialization_with_stages() {
        let yaml = r#"
name: NICE
seeds: ["https://www.nice.org.uk/search?q=diabetes"]
follow:
  - href_contains: /guidance/
require_keyword: false
folder: nice_pdfs
"#;
        let source: SourceDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(source.follow.len(), 1);
        assert_eq!(source.follow[0].href_contains.as_deref(), Some("/guidance/"));
        assert!(!source.require_keyword);
        assert_eq!(source.folder(), "nice_pdfs");
    }

    #[test]
    fn test_tally_counts_outcomes() {
        let mut tally = SourceTally::default();
        tally.add_outcome(&DownloadOutcome::Saved(PathBuf::from("a.pdf")));
        tally.add_outcome(&DownloadOutcome::AlreadySeen);
        tally.add_outcome(&DownloadOutcome::Adopted);
        tally.add_outcome(&DownloadOutcome::Failed);
        tally.add_outcome(&DownloadOutcome::Failed);
        assert_eq!(tally.saved, 1);
        assert_eq!(tally.already_seen, 1);
        assert_eq!(tally.adopted, 1);
        assert_eq!(tally.failed, 2);

        let mut total = SourceTally::default();
        total.merge(&tally);
        total.merge(&tally);
        assert_eq!(total.failed, 4);
    }
}
