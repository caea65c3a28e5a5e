//! Run orchestration across sources.
//!
//! Sources run strictly one after another; within a source, candidates are
//! downloaded one at a time in sorted order. A source that fails entirely
//! simply contributes an empty tally.

use crate::engine::DownloadEngine;
use crate::fetch::Fetcher;
use crate::models::{DownloadOutcome, SourceDescriptor, SourceTally};
use crate::scrapers::{Pacer, crawl_source};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Per-source tallies for one run, in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub per_source: Vec<(String, SourceTally)>,
}

impl RunSummary {
    pub fn record(&mut self, source: &str, tally: SourceTally) {
        self.per_source.push((source.to_string(), tally));
    }

    pub fn total(&self) -> SourceTally {
        let mut total = SourceTally::default();
        for (_, tally) in &self.per_source {
            total.merge(tally);
        }
        total
    }
}

/// Crawl every source and feed its candidates through the engine.
#[instrument(level = "info", skip_all, fields(sources = sources.len(), root = %root.display()))]
pub async fn run_sources<F: Fetcher>(
    fetcher: &F,
    engine: &mut DownloadEngine,
    sources: &[SourceDescriptor],
    root: &Path,
    request_delay: Duration,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for source in sources {
        info!(source = %source.name, "=== Updating source ===");
        let mut pacer = Pacer::new(request_delay);
        let candidates = crawl_source(fetcher, source, &mut pacer).await;
        let folder = root.join(source.folder());

        let mut tally = SourceTally {
            candidates: candidates.len(),
            ..SourceTally::default()
        };
        for url in &candidates {
            let outcome = engine.download(fetcher, url, &folder, &source.name).await;
            if let DownloadOutcome::Saved(path) = &outcome {
                debug!(source = %source.name, path = %path.display(), "New document");
            }
            tally.add_outcome(&outcome);
        }

        info!(
            source = %source.name,
            candidates = tally.candidates,
            saved = tally.saved,
            already_seen = tally.already_seen,
            adopted = tally.adopted,
            failed = tally.failed,
            "Source complete"
        );
        summary.record(&source.name, tally);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::fetch::testing::FakeFetcher;
    use crate::state::{SeenUrls, StateStore};

    fn source(name: &str, seed: &str, require_keyword: bool) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            seeds: vec![seed.to_string()],
            follow: vec![],
            require_keyword,
            folder: None,
        }
    }

    fn fixture() -> (FakeFetcher, Vec<SourceDescriptor>) {
        let fetcher = FakeFetcher::new()
            .with_page_error(
                "https://down.test/",
                FetchError::Transport("dns error".to_string()),
            )
            .with_page(
                "https://ada.test/issue",
                r#"<a href="/s1.pdf">Standards</a><a href="/s2.pdf?download=1">Summary</a>"#,
            )
            .with_page(
                "https://who.test/pubs",
                r#"<a href="/diabetes-report.pdf">Report</a><a href="/budget.pdf">Budget</a>"#,
            )
            .with_file("https://ada.test/s1.pdf", b"s1")
            .with_file("https://ada.test/s2.pdf?download=1", b"s2")
            .with_file("https://who.test/diabetes-report.pdf", b"who");
        let sources = vec![
            source("DOWN", "https://down.test/", true),
            source("ADA", "https://ada.test/issue", false),
            source("WHO", "https://who.test/pubs", true),
        ];
        (fetcher, sources)
    }

    fn store_in(dir: &Path) -> StateStore {
        StateStore::new(dir.join("seen.json"), dir.join("index.csv"))
    }

    #[tokio::test]
    async fn test_failing_source_does_not_affect_others() {
        let tmp = tempfile::tempdir().unwrap();
        let (fetcher, sources) = fixture();
        let mut engine = DownloadEngine::new(store_in(tmp.path()), SeenUrls::new());

        let summary =
            run_sources(&fetcher, &mut engine, &sources, tmp.path(), Duration::ZERO).await;

        assert_eq!(summary.per_source[0].0, "DOWN");
        assert_eq!(summary.per_source[0].1, SourceTally::default());
        assert_eq!(summary.per_source[1].1.saved, 2);
        assert_eq!(summary.per_source[2].1.saved, 1);
        assert_eq!(summary.total().saved, 3);
        assert!(tmp.path().join("ADA").join("s1.pdf").exists());
        assert!(tmp.path().join("ADA").join("s2.pdf").exists());
        assert!(tmp.path().join("WHO").join("diabetes-report.pdf").exists());
        assert!(!tmp.path().join("WHO").join("budget.pdf").exists());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let (fetcher, sources) = fixture();

        let mut first = DownloadEngine::new(store.clone(), store.load().await);
        run_sources(&fetcher, &mut first, &sources, tmp.path(), Duration::ZERO).await;
        let (seen_after_first, records) = first.into_parts();
        assert_eq!(records.len(), 3);
        store.save(&seen_after_first).await;
        let index_after_first = std::fs::read_to_string(store.index_path()).unwrap();

        let mut second = DownloadEngine::new(store.clone(), store.load().await);
        let summary =
            run_sources(&fetcher, &mut second, &sources, tmp.path(), Duration::ZERO).await;
        let (seen_after_second, records) = second.into_parts();

        assert!(records.is_empty());
        assert_eq!(summary.total().saved, 0);
        assert_eq!(summary.total().already_seen, 3);
        assert_eq!(seen_after_second, seen_after_first);
        assert_eq!(
            std::fs::read_to_string(store.index_path()).unwrap(),
            index_after_first
        );
    }

    #[tokio::test]
    async fn test_seen_set_never_shrinks_after_state_loss() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let (fetcher, sources) = fixture();

        let mut first = DownloadEngine::new(store.clone(), SeenUrls::new());
        run_sources(&fetcher, &mut first, &sources, tmp.path(), Duration::ZERO).await;
        let first_len = first.seen().len();
        let calls_before = fetcher.calls().len();

        // Seen-state lost: files on disk are adopted instead of re-downloaded.
        let mut second = DownloadEngine::new(store.clone(), SeenUrls::new());
        let summary =
            run_sources(&fetcher, &mut second, &sources, tmp.path(), Duration::ZERO).await;

        assert_eq!(summary.total().adopted, 3);
        assert!(second.seen().len() >= first_len);
        assert!(second.records().is_empty());
        // Only the three seed pages were requested again.
        assert_eq!(fetcher.calls().len(), calls_before + sources.len());
    }
}
