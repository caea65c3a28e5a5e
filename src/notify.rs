//! Operator notification for newly downloaded documents.
//!
//! A notification is attempted only when the run saved at least one file and
//! all email settings are present. Missing settings and send failures are
//! logged as warnings; they never affect the run's exit status.

use crate::models::DownloadRecord;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::{self, Write};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Complete SMTP settings. Built only when every value is present.
#[derive(Clone)]
pub struct EmailSettings {
    pub sender: String,
    pub password: String,
    pub recipient: String,
    pub smtp_host: String,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("smtp_host", &self.smtp_host)
            .finish()
    }
}

impl EmailSettings {
    /// Combine optional settings, returning the names of any that are missing.
    pub fn from_parts(
        sender: Option<String>,
        password: Option<String>,
        recipient: Option<String>,
        smtp_host: String,
    ) -> Result<Self, Vec<&'static str>> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let mut missing = Vec::new();
        if !present(&sender) {
            missing.push("EMAIL_USER");
        }
        if !present(&password) {
            missing.push("EMAIL_PASS");
        }
        if !present(&recipient) {
            missing.push("EMAIL_TO");
        }

        match (sender, password, recipient) {
            (Some(sender), Some(password), Some(recipient)) if missing.is_empty() => Ok(Self {
                sender,
                password,
                recipient,
                smtp_host,
            }),
            _ => Err(missing),
        }
    }
}

/// Delivers a plain-text message to the operator.
pub trait Notifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// [`Notifier`] using authenticated SMTP over TLS.
#[derive(Debug)]
pub struct SmtpNotifier {
    settings: EmailSettings,
}

impl SmtpNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }
}

impl Notifier for SmtpNotifier {
    #[instrument(level = "info", skip_all, fields(to = %self.settings.recipient, host = %self.settings.smtp_host))]
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.settings.sender.parse()?)
            .to(self.settings.recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.settings.smtp_host)?
            .credentials(Credentials::new(
                self.settings.sender.clone(),
                self.settings.password.clone(),
            ))
            .build();
        mailer.send(email).await?;
        Ok(())
    }
}

/// Result of the notification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    NothingNew,
    NotConfigured,
    Sent,
    Failed,
}

/// Subject and body listing the files saved this run.
pub fn compose(records: &[DownloadRecord]) -> (String, String) {
    let subject = format!("{} new diabetes guideline document(s) downloaded", records.len());
    let mut body = String::from("The following documents were downloaded:\n\n");
    for record in records {
        let _ = writeln!(body, "[{}] {}\n    {}", record.source, record.filename, record.url);
    }
    (subject, body)
}

/// Send the run's notification if there is anything to report.
pub async fn notify_new_downloads<N: Notifier>(
    notifier: Option<&N>,
    records: &[DownloadRecord],
) -> NotifyOutcome {
    if records.is_empty() {
        info!("No new documents; no notification sent");
        return NotifyOutcome::NothingNew;
    }
    let Some(notifier) = notifier else {
        warn!(count = records.len(), "Email settings incomplete; skipping notification");
        return NotifyOutcome::NotConfigured;
    };

    let (subject, body) = compose(records);
    match notifier.send(&subject, &body).await {
        Ok(()) => {
            info!(count = records.len(), "Notification sent");
            NotifyOutcome::Sent
        }
        Err(e) => {
            warn!(error = %e, "Notification failed");
            NotifyOutcome::Failed
        }
    }
}
