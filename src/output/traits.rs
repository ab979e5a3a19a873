//! Output sink traits and error types

use crate::extract::ListingRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write output: {0}")]
    Write(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Consumer of the finished record stream
///
/// Records arrive in emission order. A record handed to a sink stays written
/// even if the run is cancelled later.
pub trait RecordSink: Send {
    /// Writes one record
    fn write_record(&mut self, record: &ListingRecord) -> OutputResult<()>;

    /// Pushes buffered rows to the underlying writer
    fn flush(&mut self) -> OutputResult<()>;

    /// Number of records written so far
    fn written(&self) -> u64;
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub records: Vec<ListingRecord>,
}

impl RecordSink for CollectingSink {
    fn write_record(&mut self, record: &ListingRecord) -> OutputResult<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }

    fn written(&self) -> u64 {
        self.records.len() as u64
    }
}
