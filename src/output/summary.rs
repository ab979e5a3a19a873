//! Run summary aggregation
//!
//! The summary is built once, after every traversal has finished or the run
//! was cancelled, from the final counters. Its count fields are derived here
//! and nowhere else:
//!
//! - `total_encountered = unique_items + duplicate_items`
//! - `saved_items = max(0, unique_items - excluded_items)`

use crate::output::csv_sink::UTF8_BOM;
use crate::output::traits::OutputResult;
use crate::state::RunCounters;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Timestamp format used in the summary
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Start and end of a run
#[derive(Debug, Clone, Copy)]
pub struct RunTiming {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl RunTiming {
    /// Whole seconds between start and end, never negative
    pub fn elapsed_seconds(&self) -> u64 {
        (self.finished - self.started).num_seconds().max(0) as u64
    }
}

/// Where the run's files ended up
#[derive(Debug, Clone, Default)]
pub struct OutputLocations {
    /// Local path or `s3://bucket/key`
    pub output_file: String,
    pub summary_file: String,

    /// Public URLs, for storage uploads only
    pub output_url: Option<String>,
    pub summary_url: Option<String>,
}

/// Run identity and policy flags recorded in the summary
#[derive(Debug, Clone, Default)]
pub struct SummaryContext {
    pub run_id: String,
    pub scraper_name: String,
    pub source: String,
    pub category_matching: bool,
    pub locations: OutputLocations,

    /// Records accepted by the output sink
    pub written_items: u64,
}

/// Final snapshot of one run, serialized as the summary JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub scraper_name: String,
    pub source: String,
    pub what_inputs: Vec<String>,
    pub where_inputs: Vec<String>,
    /// `"yes"` or `"no"`
    pub category_matching: String,
    pub start_time_utc: String,
    pub end_time_utc: String,
    pub elapsed_seconds: u64,
    pub elapsed_minutes: u64,
    pub total_encountered: u64,
    pub unique_items: u64,
    pub duplicate_items: u64,
    pub errors: u64,
    pub excluded_record_count: u64,
    pub saved_items: u64,
    pub written_items: u64,
    pub total_requests: u64,
    pub total_responses: u64,
    pub output_file: String,
    pub summary_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_url: Option<String>,
    /// Why the run ended, e.g. `finished` or `cancelled`
    pub notes: String,
}

/// Builds the run summary from the final counters
///
/// Term lists are recorded sorted and without repeats.
pub fn finalize(
    counters: &RunCounters,
    what_inputs: &[String],
    where_inputs: &[String],
    timing: RunTiming,
    reason: &str,
    context: SummaryContext,
) -> RunSummary {
    let elapsed_seconds = timing.elapsed_seconds();

    RunSummary {
        run_id: context.run_id,
        scraper_name: context.scraper_name,
        source: context.source,
        what_inputs: sorted_unique(what_inputs),
        where_inputs: sorted_unique(where_inputs),
        category_matching: if context.category_matching { "yes" } else { "no" }.to_string(),
        start_time_utc: timing.started.format(TIMESTAMP_FORMAT).to_string(),
        end_time_utc: timing.finished.format(TIMESTAMP_FORMAT).to_string(),
        elapsed_seconds,
        elapsed_minutes: elapsed_seconds / 60,
        total_encountered: counters.total_encountered(),
        unique_items: counters.unique_items,
        duplicate_items: counters.duplicate_items,
        errors: counters.errors,
        excluded_record_count: counters.excluded_items,
        saved_items: counters.saved_items(),
        written_items: context.written_items,
        total_requests: counters.total_requests_issued,
        total_responses: counters.total_responses_received,
        output_file: context.locations.output_file,
        summary_file: context.locations.summary_file,
        output_url: context.locations.output_url,
        summary_url: context.locations.summary_url,
        notes: reason.to_string(),
    }
}

fn sorted_unique(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl RunSummary {
    /// Pretty JSON prefixed with a UTF-8 byte-order mark
    pub fn to_json_bytes(&self) -> OutputResult<Vec<u8>> {
        let mut bytes = UTF8_BOM.to_vec();
        serde_json::to_writer_pretty(&mut bytes, self)?;
        Ok(bytes)
    }

    /// Writes the summary to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> OutputResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json_bytes()?)?;
        tracing::info!("Summary saved locally to: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn timing() -> RunTiming {
        RunTiming {
            started: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            finished: Utc.with_ymd_and_hms(2026, 3, 1, 12, 2, 5).unwrap(),
        }
    }

    fn counters() -> RunCounters {
        RunCounters {
            total_requests_issued: 5,
            total_responses_received: 4,
            unique_items: 7,
            duplicate_items: 3,
            excluded_items: 2,
            errors: 1,
        }
    }

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_counts_reconcile() {
        let summary = finalize(
            &counters(),
            &terms(&["bakery"]),
            &terms(&["Toronto"]),
            timing(),
            "finished",
            SummaryContext::default(),
        );

        assert_eq!(summary.total_encountered, 10);
        assert_eq!(summary.total_encountered, summary.unique_items + summary.duplicate_items);
        assert_eq!(summary.saved_items, 5);
        assert_eq!(summary.excluded_record_count, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.total_requests, 5);
        assert_eq!(summary.notes, "finished");
    }

    #[test]
    fn test_saved_items_floor_at_zero() {
        let counters = RunCounters {
            unique_items: 1,
            excluded_items: 4,
            ..RunCounters::default()
        };
        let summary = finalize(&counters, &[], &[], timing(), "finished", SummaryContext::default());
        assert_eq!(summary.saved_items, 0);
    }

    #[test]
    fn test_timing_and_term_snapshots() {
        let summary = finalize(
            &RunCounters::default(),
            &terms(&["plumber", "bakery", "plumber"]),
            &terms(&["Toronto", "Ottawa"]),
            timing(),
            "cancelled",
            SummaryContext {
                category_matching: true,
                ..SummaryContext::default()
            },
        );

        assert_eq!(summary.what_inputs, vec!["bakery", "plumber"]);
        assert_eq!(summary.where_inputs, vec!["Ottawa", "Toronto"]);
        assert_eq!(summary.start_time_utc, "2026-03-01 12:00:00");
        assert_eq!(summary.end_time_utc, "2026-03-01 12:02:05");
        assert_eq!(summary.elapsed_seconds, 125);
        assert_eq!(summary.elapsed_minutes, 2);
        assert_eq!(summary.category_matching, "yes");
    }

    #[test]
    fn test_json_has_bom_and_omits_missing_urls() {
        let summary = finalize(
            &counters(),
            &[],
            &[],
            timing(),
            "finished",
            SummaryContext {
                run_id: "yellowpages_us-20260301T120000Z".to_string(),
                ..SummaryContext::default()
            },
        );
        let bytes = summary.to_json_bytes().unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let value: serde_json::Value = serde_json::from_slice(&bytes[UTF8_BOM.len()..]).unwrap();
        assert_eq!(value["run_id"], "yellowpages_us-20260301T120000Z");
        assert_eq!(value["duplicate_items"], 3);
        assert!(value.get("output_url").is_none());
    }

    #[test]
    fn test_write_to_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("YP_US/output/run/summary.json");
        let summary = finalize(&counters(), &[], &[], timing(), "finished", SummaryContext::default());

        summary.write_to(&path).unwrap();
        assert!(path.exists());
    }
}
