//! Input readers with limit enforcement

use keycase_core::{KeycaseError, Limits, Result, StructuredValue};
use std::io::{BufRead, Read};

/// One non-blank NDJSON line, not yet parsed
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 1-based line number in the input
    pub line: usize,
    /// Line contents without the trailing newline
    pub bytes: Vec<u8>,
}

impl RawRecord {
    /// Parse the line as a JSON value, tagging errors with the line number.
    pub fn parse(&self) -> Result<StructuredValue> {
        serde_json::from_slice(&self.bytes).map_err(|source| KeycaseError::InvalidRecord {
            line: self.line,
            source,
        })
    }
}

/// Streaming NDJSON reader
///
/// Blank lines are skipped. Lines longer than `max_line_bytes` fail with
/// [`KeycaseError::LimitExceeded`] without buffering the rest of the line.
pub struct RecordReader<R: BufRead> {
    reader: R,
    limits: Limits,
    line: usize,
    bytes_read: u64,
    buf: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R, limits: Limits) -> Self {
        Self {
            reader,
            limits,
            line: 0,
            bytes_read: 0,
            buf: Vec::new(),
        }
    }

    /// Bytes consumed so far, newlines included
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of the last line read (blank lines count)
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Read the next non-blank line without parsing it.
    pub fn next_raw(&mut self) -> Result<Option<RawRecord>> {
        let max_line_bytes = self.limits.max_line_bytes;
        loop {
            self.buf.clear();
            let read = self
                .reader
                .by_ref()
                .take(max_line_bytes as u64 + 1)
                .read_until(b'\n', &mut self.buf)?;
            if read == 0 {
                return Ok(None);
            }

            self.line += 1;
            self.bytes_read += read as u64;

            if self.buf.last() == Some(&b'\n') {
                self.buf.pop();
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
            }

            if self.buf.len() > max_line_bytes {
                return Err(KeycaseError::LimitExceeded(format!(
                    "line {} is longer than max_line_bytes ({})",
                    self.line, max_line_bytes
                )));
            }

            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(Some(RawRecord {
                line: self.line,
                bytes: std::mem::take(&mut self.buf),
            }));
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<(usize, StructuredValue)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_raw() {
            Ok(Some(raw)) => Some(raw.parse().map(|value| (raw.line, value))),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Read and parse one whole JSON document.
///
/// Returns the value and the number of bytes consumed.
pub fn read_document<R: Read>(reader: R, limits: &Limits) -> Result<(StructuredValue, u64)> {
    let mut buffer = Vec::new();
    reader
        .take(limits.max_document_bytes as u64 + 1)
        .read_to_end(&mut buffer)?;

    if buffer.len() > limits.max_document_bytes {
        return Err(KeycaseError::LimitExceeded(format!(
            "document is larger than max_document_bytes ({})",
            limits.max_document_bytes
        )));
    }

    let value = serde_json::from_slice(&buffer)?;
    Ok((value, buffer.len() as u64))
}
