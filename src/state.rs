//! Persistent crawl state: the seen-URL set, the download index and the event log.
//!
//! # Files
//!
//! ```text
//! guidelines/
//! ├── downloaded_urls.json   # sorted JSON array, cross-run
//! ├── download_index.csv     # append-only, cross-run
//! └── update_log.txt         # truncated at the start of every run
//! ```
//!
//! Every operation here degrades to a warning: a broken state file must never
//! stop a crawl.

use crate::models::IndexEntry;
use crate::utils::csv_field;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Header row of the download index.
pub const INDEX_HEADER: &str = "source,filename,url,download_date";

/// URLs downloaded in any run so far.
///
/// Only grows; there is no removal API. Iteration is sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeenUrls(BTreeSet<String>);

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url)
    }

    /// Record a URL; returns `true` if it was not already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.0.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for SeenUrls {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Locations of the cross-run state files.
#[derive(Debug, Clone)]
pub struct StateStore {
    seen_path: PathBuf,
    index_path: PathBuf,
}

impl StateStore {
    pub fn new(seen_path: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            seen_path: seen_path.into(),
            index_path: index_path.into(),
        }
    }

    #[cfg(test)]
    pub fn seen_path(&self) -> &Path {
        &self.seen_path
    }

    #[cfg(test)]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Load the seen set. Missing, unreadable or malformed files yield an
    /// empty set and a warning.
    #[instrument(level = "info", skip_all, fields(path = %self.seen_path.display()))]
    pub async fn load(&self) -> SeenUrls {
        let raw = match fs::read_to_string(&self.seen_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("No seen-state file yet; starting with an empty set");
                return SeenUrls::new();
            }
            Err(e) => {
                warn!(error = %e, "Could not read seen-state file; starting with an empty set");
                return SeenUrls::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(urls) => {
                let seen: SeenUrls = urls.into_iter().collect();
                info!(count = seen.len(), "Loaded seen URLs");
                seen
            }
            Err(e) => {
                warn!(error = %e, "Seen-state file is malformed; starting with an empty set");
                SeenUrls::new()
            }
        }
    }

    /// Persist the seen set as a sorted, pretty-printed JSON array.
    ///
    /// Writes a sibling temp file then renames it over the target so a crash
    /// mid-write leaves the previous state intact. Failures are logged only.
    #[instrument(level = "info", skip_all, fields(path = %self.seen_path.display(), count = seen.len()))]
    pub async fn save(&self, seen: &SeenUrls) {
        if let Err(e) = self.try_save(seen).await {
            warn!(error = %e, "Failed to persist seen-state");
        } else {
            info!("Saved seen URLs");
        }
    }

    async fn try_save(&self, seen: &SeenUrls) -> io::Result<()> {
        let urls: Vec<&str> = seen.iter().collect();
        let json = serde_json::to_string_pretty(&urls)?;

        if let Some(parent) = self.seen_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut tmp_name = self.seen_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &self.seen_path).await
    }

    /// Append one row to the download index, writing the header first if the
    /// file is new or empty.
    #[instrument(level = "debug", skip_all, fields(url = %entry.url))]
    pub async fn append_index(&self, entry: &IndexEntry) -> io::Result<()> {
        let needs_header = match fs::metadata(&self.index_path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(e),
        };

        let mut rows = String::new();
        if needs_header {
            rows.push_str(INDEX_HEADER);
            rows.push('\n');
        }
        rows.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&entry.source),
            csv_field(&entry.filename),
            csv_field(&entry.url),
            csv_field(&entry.download_date)
        ));

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.index_path)
            .await?;
        file.write_all(rows.as_bytes()).await?;
        file.flush().await?;
        debug!(header = needs_header, "Appended index row");
        Ok(())
    }
}

/// Truncate (or create) the run-scoped event log and return it for the
/// logging layer to write to.
pub fn reset_log(path: &Path) -> io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(path)
}
