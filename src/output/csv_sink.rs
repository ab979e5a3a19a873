//! CSV record sink
//!
//! Files start with a UTF-8 byte-order mark so spreadsheet tools pick the
//! right encoding, followed by the header row. The header is written up front
//! so a run without records still produces a well-formed file.

use crate::extract::ListingRecord;
use crate::output::traits::{OutputResult, RecordSink};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// UTF-8 byte-order mark
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes listing records as CSV rows to any writer
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    written: u64,
}

impl<W: Write> CsvSink<W> {
    /// Writes the BOM and header row, then returns the sink
    pub fn new(mut inner: W) -> OutputResult<Self> {
        inner.write_all(UTF8_BOM)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(ListingRecord::COLUMNS)?;

        Ok(Self { writer, written: 0 })
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::output::OutputError::Io(e.into_error()))
    }
}

impl CsvSink<BufWriter<File>> {
    /// Creates the file (and its parent directories) at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        tracing::info!("Writing CSV to local file: {}", path.display());
        Self::new(BufWriter::new(file))
    }
}

impl CsvSink<Vec<u8>> {
    /// Buffers the whole CSV in memory, for upload at run end
    pub fn in_memory() -> OutputResult<Self> {
        tracing::info!("Writing CSV to memory buffer for upload");
        Self::new(Vec::new())
    }
}

impl<W: Write + Send> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &ListingRecord) -> OutputResult<()> {
        self.writer.serialize(record)?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }
}
