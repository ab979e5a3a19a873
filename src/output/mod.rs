//! Output module for records and run summaries
//!
//! This module handles:
//! - Streaming listing records to CSV (local file or in-memory buffer)
//! - Building and writing the run summary
//! - Printing a console report of the run
//! - Laying out output paths per site and run

mod csv_sink;
pub mod stats;
mod summary;
mod traits;

pub use csv_sink::{CsvSink, UTF8_BOM};
pub use stats::print_summary;
pub use summary::{finalize, OutputLocations, RunSummary, RunTiming, SummaryContext};
pub use traits::{CollectingSink, OutputError, OutputResult, RecordSink};

use crate::sites::SiteKind;
use std::path::{Path, PathBuf};

/// Local paths of one run's files
///
/// Files live in `<base-dir>/<site dir>/output/<dir-name>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub dir: PathBuf,
    pub output_path: PathBuf,
    pub summary_path: PathBuf,
}

impl RunLayout {
    pub fn new(
        base_dir: &str,
        site: SiteKind,
        dir_name: &str,
        output_file: &str,
        summary_file: &str,
    ) -> Self {
        let dir = Path::new(base_dir)
            .join(site.output_dir())
            .join("output")
            .join(dir_name.trim());

        Self {
            output_path: dir.join(output_file),
            summary_path: dir.join(summary_file),
            dir,
        }
    }

    /// Object key of the CSV when uploaded
    pub fn output_key(&self) -> String {
        storage_key(&self.output_path)
    }

    /// Object key of the summary when uploaded
    pub fn summary_key(&self) -> String {
        storage_key(&self.summary_path)
    }
}

/// Object-storage key for a local path: separators become `/`
pub fn storage_key(path: &Path) -> String {
    let key = path
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
        .replace('\\', "/");
    key.trim_start_matches("./").trim_start_matches('/').to_string()
}
