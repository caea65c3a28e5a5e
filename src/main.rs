//! # Diabetes Guideline Watch
//!
//! An incremental crawler that watches health-organization websites for
//! diabetes guideline PDFs, downloads the ones it has not seen before,
//! records provenance, and emails an operator when something new arrives.
//!
//! ## Usage
//!
//! ```sh
//! EMAIL_USER=bot@example.org EMAIL_PASS=... EMAIL_TO=ops@example.org \
//!     diabetes_guideline_watch -o ./guidelines
//! ```
//!
//! ## Architecture
//!
//! The run is a strictly sequential pipeline:
//! 1. **State**: truncate the run log, load the seen-URL set
//! 2. **Crawl**: for each source, fetch seed pages (and any follow stages)
//!    and extract candidate PDF links
//! 3. **Dedup/download**: skip seen URLs, adopt files already on disk,
//!    download the rest and append them to the index
//! 4. **Collaborators**: PubMed metadata and RSS feeds (optional)
//! 5. **Persist & notify**: save the seen set, email the run's new files
//!
//! Every failure is contained and logged; the process always exits 0.

use chrono::Utc;
use clap::Parser;
use std::fs::File;
use std::sync::Mutex;
use tracing::{Subscriber, debug, error, info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod engine;
mod extract;
mod fetch;
mod models;
mod notify;
mod pipeline;
mod scrapers;
mod state;
mod utils;

use cli::Cli;
use engine::DownloadEngine;
use fetch::HttpFetcher;
use notify::{EmailSettings, SmtpNotifier, notify_new_downloads};
use scrapers::{Pacer, pubmed, rss};
use state::StateStore;
use utils::ensure_writable_dir;

/// Run-log layer: one plain line per event, RFC 3339 UTC timestamp first.
fn file_log_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tfmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(Mutex::new(file))
}

/// Console output plus, when available, an ANSI-free copy in the run log.
fn init_tracing(log_file: Option<File>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tfmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339());
    let file = log_file.map(file_log_layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let log_path = args.log_path();
    let log_file = state::reset_log(&log_path);
    let log_error = log_file.as_ref().err().map(|e| e.to_string());
    init_tracing(log_file.ok());
    if let Some(e) = log_error {
        warn!(path = %log_path.display(), error = %e, "Could not reset run log; logging to console only");
    }

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "guideline watch starting");
    debug!(
        output_dir = %args.output_dir.display(),
        config = ?args.config,
        skip_pubmed = args.skip_pubmed,
        skip_rss = args.skip_rss,
        "Parsed CLI arguments"
    );

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable; downloads will fail this run"
        );
    }

    let config = config::load_config(args.config.as_deref()).await;
    let store = StateStore::new(args.state_path(), args.index_path());
    let seen = store.load().await;
    let seen_before = seen.len();

    let fetcher = match HttpFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Could not build HTTP client; nothing to do");
            return;
        }
    };

    let mut engine = DownloadEngine::new(store, seen);
    let summary = pipeline::run_sources(
        &fetcher,
        &mut engine,
        &config.sources,
        &args.output_dir,
        args.request_delay(),
    )
    .await;

    let today = Utc::now().date_naive();
    if args.skip_pubmed {
        info!("PubMed query skipped");
    } else {
        let mut pacer = Pacer::new(args.request_delay());
        pubmed::fetch_daily_summary(
            &fetcher,
            &config.pubmed,
            &args.output_dir.join("PubMed"),
            today,
            &mut pacer,
        )
        .await;
    }

    let rss_tally = if args.skip_rss || config.feeds.is_empty() {
        info!("RSS feeds skipped");
        None
    } else {
        let mut pacer = Pacer::new(args.request_delay());
        Some(
            rss::process_feeds(
                &fetcher,
                &mut engine,
                &config.feeds,
                &args.output_dir.join(rss::RSS_SOURCE),
                today,
                &mut pacer,
            )
            .await,
        )
    };

    engine.store().save(engine.seen()).await;
    let (seen, records) = engine.into_parts();

    let mut total = summary.total();
    if let Some(tally) = rss_tally {
        total.merge(&tally);
    }
    info!(
        new_files = records.len(),
        candidates = total.candidates,
        already_seen = total.already_seen,
        adopted = total.adopted,
        failed = total.failed,
        seen_before,
        seen_after = seen.len(),
        "Crawl finished"
    );

    let notifier = match EmailSettings::from_parts(
        args.email_user.clone(),
        args.email_pass.clone(),
        args.email_to.clone(),
        args.smtp_host.clone(),
    ) {
        Ok(settings) => Some(SmtpNotifier::new(settings)),
        Err(missing) => {
            debug!(?missing, "Email settings incomplete");
            None
        }
    };
    notify_new_downloads(notifier.as_ref(), &records).await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
}
