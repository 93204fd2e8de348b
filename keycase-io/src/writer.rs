//! Output writer for converted values

use keycase_core::{KeycaseError, Result, StructuredValue};
use std::io::{BufWriter, Write};

/// Output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One compact JSON value per line
    Ndjson,
    /// A single JSON document
    Json {
        /// Indent the document
        pretty: bool,
    },
}

/// Buffered writer for converted values
pub struct RecordWriter<W: Write> {
    inner: BufWriter<W>,
    format: OutputFormat,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Create a writer using `format`
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            inner: BufWriter::new(writer),
            format,
            written: 0,
        }
    }

    /// Write one value followed by a newline.
    pub fn write_value(&mut self, value: &StructuredValue) -> Result<()> {
        match self.format {
            OutputFormat::Json { pretty: true } => {
                serde_json::to_writer_pretty(&mut self.inner, value)?
            }
            OutputFormat::Ndjson | OutputFormat::Json { pretty: false } => {
                serde_json::to_writer(&mut self.inner, value)?
            }
        }
        self.inner.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Values written so far
    pub fn values_written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|err| KeycaseError::Io(err.into_error()))
    }
}
