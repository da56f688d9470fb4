//! Row sinks for streaming exports

use crate::models::FlatRow;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for exported rows. Rows arrive one at a time and should be
/// written through, not collected.
pub trait RowSink {
    fn write_row(&mut self, row: &FlatRow) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError>;
}

/// CSV with a header row; absent sample fields become empty cells
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    /// Create the sink and write the header immediately, so an empty
    /// export still yields a valid file
    pub fn new(inner: W) -> Result<Self, SinkError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(FlatRow::COLUMNS)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &FlatRow) -> Result<(), SinkError> {
        self.writer.serialize(row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON object per line; absent sample fields are `null`
pub struct JsonLinesSink<W: Write> {
    inner: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> RowSink for JsonLinesSink<W> {
    fn write_row(&mut self, row: &FlatRow) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.inner, row)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Collects rows in memory; for small reads such as a single series
impl RowSink for Vec<FlatRow> {
    fn write_row(&mut self, row: &FlatRow) -> Result<(), SinkError> {
        self.push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
