//! Download/dedup engine.
//!
//! The engine owns the run's mutable state (the seen set and the list of
//! files saved this run) and decides, per candidate URL, whether to skip,
//! adopt an existing file, or download.
//!
//! # Decision sequence
//!
//! 1. URL already seen → [`DownloadOutcome::AlreadySeen`], no I/O
//! 2. Derived filename already on disk → mark seen, [`DownloadOutcome::Adopted`]
//! 3. Fetch bytes → write, mark seen, record, index → [`DownloadOutcome::Saved`]
//!
//! Any failure in step 3 leaves state untouched so the URL is retried next run.
//! Documents are staged as `<name>.part` and renamed into place, so only
//! complete files are ever adopted.

use crate::fetch::Fetcher;
use crate::models::{DownloadOutcome, DownloadRecord, IndexEntry};
use crate::state::{SeenUrls, StateStore};
use crate::utils::{local_filename, utc_timestamp};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
pub struct DownloadEngine {
    store: StateStore,
    seen: SeenUrls,
    records: Vec<DownloadRecord>,
}

impl DownloadEngine {
    pub fn new(store: StateStore, seen: SeenUrls) -> Self {
        Self {
            store,
            seen,
            records: Vec::new(),
        }
    }

    pub fn seen(&self) -> &SeenUrls {
        &self.seen
    }

    /// Files saved during this run, in download order.
    #[cfg(test)]
    pub fn records(&self) -> &[DownloadRecord] {
        &self.records
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Process one candidate URL for `source`, saving into `folder`.
    #[instrument(level = "info", skip(self, fetcher, folder), fields(folder = %folder.display()))]
    pub async fn download<F: Fetcher>(
        &mut self,
        fetcher: &F,
        url: &str,
        folder: &Path,
        source: &str,
    ) -> DownloadOutcome {
        if self.seen.contains(url) {
            debug!("Already downloaded; skipping");
            return DownloadOutcome::AlreadySeen;
        }

        let filename = local_filename(url);
        let path = folder.join(&filename);

        if fs::try_exists(&path).await.unwrap_or(false) {
            info!(path = %path.display(), "File already present; adopting URL without download");
            self.seen.insert(url);
            return DownloadOutcome::Adopted;
        }

        let bytes = match fetcher.fetch_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Download failed; will retry next run");
                return DownloadOutcome::Failed;
            }
        };

        if let Err(e) = fs::create_dir_all(folder).await {
            error!(error = %e, "Could not create source folder");
            return DownloadOutcome::Failed;
        }
        if let Err(e) = write_atomically(&path, &bytes).await {
            error!(path = %path.display(), error = %e, "Could not write document");
            return DownloadOutcome::Failed;
        }
        info!(path = %path.display(), bytes = bytes.len(), "Saved document");

        self.seen.insert(url);
        self.records.push(DownloadRecord {
            source: source.to_string(),
            filename: filename.clone(),
            url: url.to_string(),
        });

        let entry = IndexEntry {
            source: source.to_string(),
            filename,
            url: url.to_string(),
            download_date: utc_timestamp(),
        };
        if let Err(e) = self.store.append_index(&entry).await {
            warn!(error = %e, "Failed to append download index row");
        }

        DownloadOutcome::Saved(path)
    }

    /// Consume the engine, returning the final seen set and this run's records.
    pub fn into_parts(self) -> (SeenUrls, Vec<DownloadRecord>) {
        (self.seen, self.records)
    }
}

/// Write `bytes` to a sibling `.part` file and rename it over `path`.
///
/// A failed or interrupted write never leaves anything at `path`.
async fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut part_name = path.as_os_str().to_owned();
    part_name.push(".part");
    let part_path = PathBuf::from(part_name);

    let result = match fs::write(&part_path, bytes).await {
        Ok(()) => fs::rename(&part_path, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        let _ = fs::remove_file(&part_path).await;
    }
    result
}
