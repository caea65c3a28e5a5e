//! Command-line interface definitions.
//!
//! All options have defaults; email settings may also come from the
//! environment so credentials stay out of shell history.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Crawl health-organization websites for new diabetes guideline PDFs.
///
/// # Examples
///
/// ```sh
/// # Default layout under ./guidelines
/// diabetes_guideline_watch
///
/// # Custom output root and config, no PubMed
/// diabetes_guideline_watch -o /srv/guidelines -c watch.yaml --skip-pubmed
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root directory for downloaded documents and state files
    #[arg(short, long, default_value = "guidelines")]
    pub output_dir: PathBuf,

    /// Seen-URL state file [default: <output-dir>/downloaded_urls.json]
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Download index CSV [default: <output-dir>/download_index.csv]
    #[arg(long)]
    pub index_file: Option<PathBuf>,

    /// Run log, truncated every run [default: <output-dir>/update_log.txt]
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Optional YAML config overriding sources, feeds and the PubMed query
    #[arg(short, long, env = "GUIDELINE_WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pause between page requests to the same source, in seconds
    #[arg(long, default_value_t = 2)]
    pub request_delay_secs: u64,

    /// Skip the PubMed metadata query
    #[arg(long)]
    pub skip_pubmed: bool,

    /// Skip RSS feeds
    #[arg(long)]
    pub skip_rss: bool,

    /// Sender account for notifications
    #[arg(long, env = "EMAIL_USER")]
    pub email_user: Option<String>,

    /// Sender credential for notifications
    #[arg(long, env = "EMAIL_PASS", hide_env_values = true)]
    pub email_pass: Option<String>,

    /// Notification recipient
    #[arg(long, env = "EMAIL_TO")]
    pub email_to: Option<String>,

    /// SMTP relay host (implicit TLS)
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,
}

impl Cli {
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("downloaded_urls.json"))
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("download_index.csv"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("update_log.txt"))
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }
}
