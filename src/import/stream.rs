//! Chunked readers for streamed import bodies.
//!
//! An NDJSON body is split into bounded chunks; each chunk becomes one
//! import invocation. A JSON array document is read whole.

use crate::types::ImportRecord;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read};
use thiserror::Error;

/// Records per chunk when the caller does not say otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Longest accepted NDJSON line (10 MiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: longer than {max_bytes} bytes")]
    LineTooLong { line: u64, max_bytes: usize },
    #[error("line {line}: {source}")]
    Json {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid document: {0}")]
    Document(#[source] serde_json::Error),
}

/// Bounds applied to a streamed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLimits {
    pub chunk_size: usize,
    pub max_line_bytes: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// How the import body is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// Sniff: a body starting with `[` is a JSON array, anything else NDJSON.
    #[default]
    Auto,
    Json,
    Ndjson,
}

impl InputFormat {
    /// Resolve `Auto` by peeking at the first non-whitespace byte.
    pub fn detect<R: BufRead>(self, reader: &mut R) -> std::io::Result<InputFormat> {
        if self != InputFormat::Auto {
            return Ok(self);
        }
        loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(InputFormat::Ndjson);
            }
            match buf.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(pos) => {
                    let format = if buf[pos] == b'[' {
                        InputFormat::Json
                    } else {
                        InputFormat::Ndjson
                    };
                    return Ok(format);
                }
                None => {
                    let len = buf.len();
                    reader.consume(len);
                }
            }
        }
    }
}

/// Parse a whole JSON array of records.
pub fn read_document<R: Read>(reader: R) -> Result<Vec<ImportRecord>, StreamError> {
    serde_json::from_reader(reader).map_err(StreamError::Document)
}

/// Yields NDJSON records in chunks of at most `chunk_size`.
pub struct ChunkReader<R> {
    reader: R,
    limits: StreamLimits,
    line_no: u64,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> ChunkReader<R> {
    pub fn new(reader: R, limits: StreamLimits) -> Self {
        Self {
            reader,
            limits: StreamLimits {
                chunk_size: limits.chunk_size.max(1),
                ..limits
            },
            line_no: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Lines consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    /// Read one line into `self.buf`, enforcing the length bound.
    /// Returns false at end of input.
    fn read_line(&mut self) -> Result<bool, StreamError> {
        self.buf.clear();
        let limit = self.limits.max_line_bytes as u64 + 1;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        } else if read as u64 == limit {
            return Err(StreamError::LineTooLong {
                line: self.line_no,
                max_bytes: self.limits.max_line_bytes,
            });
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(true)
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<ImportRecord>>, StreamError> {
        let mut chunk = Vec::new();
        while chunk.len() < self.limits.chunk_size {
            if !self.read_line()? {
                self.done = true;
                break;
            }
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record = serde_json::from_slice(&self.buf).map_err(|source| StreamError::Json {
                line: self.line_no,
                source,
            })?;
            chunk.push(record);
        }
        Ok((!chunk.is_empty()).then_some(chunk))
    }
}

impl<R: BufRead> Iterator for ChunkReader<R> {
    type Item = Result<Vec<ImportRecord>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn limits(chunk_size: usize, max_line_bytes: usize) -> StreamLimits {
        StreamLimits {
            chunk_size,
            max_line_bytes,
        }
    }

    fn ndjson(n: usize) -> String {
        (0..n)
            .map(|i| format!(r#"{{"id":"bd-{i}","title":"Task {i}"}}"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_chunks_are_bounded() {
        let body = ndjson(5);
        let chunks: Vec<_> = ChunkReader::new(Cursor::new(body), limits(2, 1024))
            .collect::<Result<_, _>>()
            .unwrap();
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(chunks[2][0].id, "bd-4");
    }

    #[test]
    fn test_blank_lines_and_crlf_ignored() {
        let body = "{\"id\":\"bd-1\",\"title\":\"a\"}\r\n\r\n  \n{\"id\":\"bd-2\",\"title\":\"b\"}\n";
        let mut reader = ChunkReader::new(Cursor::new(body), limits(10, 1024));
        let chunk = reader.next().unwrap().unwrap();
        assert_eq!(chunk.len(), 2);
        assert!(reader.next().is_none());
        assert_eq!(reader.lines_read(), 4);
    }

    #[test]
    fn test_long_line_rejected_with_line_number() {
        let body = format!("{}\n{}\n", r#"{"id":"bd-1","title":"a"}"#, "x".repeat(64));
        let mut reader = ChunkReader::new(Cursor::new(body), limits(10, 32));
        match reader.next().unwrap() {
            Err(StreamError::LineTooLong { line, max_bytes }) => {
                assert_eq!(line, 2);
                assert_eq!(max_bytes, 32);
            }
            other => panic!("expected LineTooLong, got {:?}", other.map(|c| c.len())),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_bad_json_reports_line() {
        let body = "{\"id\":\"bd-1\",\"title\":\"a\"}\nnot json\n";
        let err = ChunkReader::new(Cursor::new(body), limits(10, 1024))
            .next()
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().starts_with("line 2:"));
    }

    #[test]
    fn test_detect_format() {
        let mut json = Cursor::new("  \n [ {} ]");
        assert_eq!(InputFormat::Auto.detect(&mut json).unwrap(), InputFormat::Json);
        let docs = read_document(json).unwrap();
        assert_eq!(docs.len(), 1);

        let mut lines = Cursor::new("{\"id\":\"bd-1\"}\n");
        assert_eq!(InputFormat::Auto.detect(&mut lines).unwrap(), InputFormat::Ndjson);
        let mut empty = Cursor::new("");
        assert_eq!(InputFormat::Auto.detect(&mut empty).unwrap(), InputFormat::Ndjson);
        assert_eq!(InputFormat::Json.detect(&mut Cursor::new("{")).unwrap(), InputFormat::Json);
    }
}
