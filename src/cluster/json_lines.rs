//! Incremental newline-delimited JSON decoder.
//!
//! The cluster streams one JSON document per line and pads idle periods with
//! blank keep-alive lines. Chunks arrive at arbitrary byte boundaries, so the
//! decoder buffers the unfinished tail between calls, up to a line limit.
//! An oversized line is reported once as a decode error and its bytes are
//! dropped up to the next newline.

use serde::de::DeserializeOwned;

use crate::stream::SourceError;

/// Longest line accepted by default. Health reports are the largest documents.
pub const DEFAULT_MAX_LINE: usize = 16 * 1024 * 1024;

#[derive(Debug)]
pub struct JsonLines {
    buffer: Vec<u8>,
    max_line: usize,
    /// Inside an oversized line that was already reported.
    discarding: bool,
}

impl Default for JsonLines {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE)
    }
}

impl JsonLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Feed a chunk and return every complete record it finishes.
    pub fn push<T: DeserializeOwned>(&mut self, chunk: &[u8]) -> Vec<Result<T, SourceError>> {
        let mut records = Vec::new();
        let mut chunk = chunk;

        if self.discarding {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(offset) => {
                    self.discarding = false;
                    chunk = &chunk[offset + 1..];
                }
                None => return records,
            }
        }
        self.buffer.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].iter().position(|b| *b == b'\n') {
            let line = &self.buffer[consumed..consumed + offset];
            consumed += offset + 1;
            if line.len() > self.max_line {
                records.push(Err(self.too_long()));
            } else if let Some(record) = decode_line(line) {
                records.push(record);
            }
        }
        self.buffer.drain(..consumed);

        if self.buffer.len() > self.max_line {
            self.buffer.clear();
            self.discarding = true;
            records.push(Err(self.too_long()));
        }
        records
    }

    /// Decode whatever is left once the stream has ended.
    pub fn finish<T: DeserializeOwned>(&mut self) -> Option<Result<T, SourceError>> {
        self.discarding = false;
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }

    fn too_long(&self) -> SourceError {
        SourceError::Decode(format!("line exceeds {} bytes", self.max_line))
    }
}

fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Option<Result<T, SourceError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_slice(line).map_err(|e| SourceError::Decode(e.to_string())))
}
