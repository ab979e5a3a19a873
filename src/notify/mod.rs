//! Completion notifications
//!
//! A notification is sent only when the resolved recipient list is non-empty.
//! Failing to notify is logged and never fails the run.

mod mailgun;

pub use mailgun::MailgunNotifier;

use crate::output::RunSummary;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("MAILGUN_API_KEY is not set")]
    MissingApiKey,

    #[error("No recipients for notification")]
    NoRecipients,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("All {attempts} attempts to send the notification failed")]
    Exhausted { attempts: u32 },
}

pub type NotifyResult<T> = Result<T, NotifyError>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, text: &str, recipients: &[String]) -> NotifyResult<()>;
}

/// Picks the recipient list: run parameter, then configuration, then the
/// comma-separated environment default
pub fn resolve_recipients(
    explicit: &[String],
    configured: &[String],
    env_default: Option<&str>,
) -> Vec<String> {
    let split = |values: &[String]| -> Vec<String> {
        values
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    };

    let explicit = split(explicit);
    if !explicit.is_empty() {
        return explicit;
    }

    let configured = split(configured);
    if !configured.is_empty() {
        return configured;
    }

    env_default
        .map(|value| split(&[value.to_string()]))
        .unwrap_or_default()
}

/// Subject and plain-text body for a finished run
pub fn compose_message(summary: &RunSummary) -> (String, String) {
    let subject = format!(
        "[{}] {} - {} saved, {} errors",
        summary.scraper_name, summary.notes, summary.saved_items, summary.errors
    );

    let mut text = format!(
        "Run {} ({}) ended: {}\n\n\
         Started: {} UTC\n\
         Finished: {} UTC ({} min)\n\n\
         Encountered: {}\n\
         Unique: {}\n\
         Duplicates: {}\n\
         Excluded: {}\n\
         Saved: {}\n\
         Errors: {}\n\n\
         Output: {}\n\
         Summary: {}\n",
        summary.run_id,
        summary.scraper_name,
        summary.notes,
        summary.start_time_utc,
        summary.end_time_utc,
        summary.elapsed_minutes,
        summary.total_encountered,
        summary.unique_items,
        summary.duplicate_items,
        summary.excluded_record_count,
        summary.saved_items,
        summary.errors,
        summary.output_file,
        summary.summary_file,
    );
    if let Some(url) = &summary.output_url {
        text.push_str(&format!("Download: {}\n", url));
    }

    (subject, text)
}
