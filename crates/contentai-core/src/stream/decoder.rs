//! Line-buffered NDJSON decoder.

use std::io::{self, Read};

use serde_json::Value;

use super::cancel::CancelToken;

/// Bytes requested per `read` call on the response body.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Incremental decoder state for one response body.
///
/// Data arrives in chunks that may hold a partial line, a complete line, or
/// several lines. Everything up to the last `\n` is parsed; the tail is kept
/// until the next chunk completes it.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Bytes after the last newline seen so far. Kept as bytes so a UTF-8
    /// sequence split across chunks is decoded only once it is whole.
    buffer: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the complete, non-blank lines it finished.
    pub fn feed_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let incomplete = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, incomplete);

        complete
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Feed a chunk and return the JSON values of every line it completed.
    ///
    /// Lines that fail to parse are logged and skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.feed_lines(chunk)
            .iter()
            .filter_map(|line| parse_line(line))
            .collect()
    }

    /// Number of buffered bytes not yet terminated by a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// End of stream. An unterminated trailing fragment is dropped, not
    /// parsed; returns how many bytes were discarded.
    pub fn finish(self) -> usize {
        let dropped = self.buffer.len();
        if dropped > 0 {
            log::debug!(
                "Discarding {} bytes of unterminated stream data: {}",
                dropped,
                String::from_utf8_lossy(&self.buffer)
            );
        }
        dropped
    }
}

/// Parse one line as a standalone JSON value.
///
/// Blank lines yield `None` silently; malformed lines are logged.
pub fn parse_line(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Skipping malformed stream line ({}): {}", e, trimmed);
            None
        }
    }
}

/// How a [`decode_reader`] loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEnd {
    /// The body reached EOF.
    Eof,
    /// The token was cancelled; remaining data was not consumed.
    Cancelled,
}

/// Read `reader` to the end, invoking `on_value` for each decoded line.
///
/// `on_value` gets the raw line text alongside its parsed value. The token
/// is checked before every read and before every callback, so nothing is
/// delivered once it is cancelled. A read error after cancellation counts
/// as [`ReadEnd::Cancelled`].
pub fn decode_reader<R, F>(mut reader: R, cancel: &CancelToken, mut on_value: F) -> io::Result<ReadEnd>
where
    R: Read,
    F: FnMut(&str, Value),
{
    let mut decoder = StreamDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        if cancel.is_cancelled() {
            return Ok(ReadEnd::Cancelled);
        }

        let read = match reader.read(&mut chunk) {
            Ok(0) => {
                decoder.finish();
                return Ok(ReadEnd::Eof);
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) if cancel.is_cancelled() => return Ok(ReadEnd::Cancelled),
            Err(e) => return Err(e),
        };

        for line in decoder.feed_lines(&chunk[..read]) {
            if cancel.is_cancelled() {
                return Ok(ReadEnd::Cancelled);
            }
            if let Some(value) = parse_line(&line) {
                on_value(&line, value);
            }
        }
    }
}
