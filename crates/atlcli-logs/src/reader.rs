//! Lazy decoding of daily log files into records

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::PathBuf;

use atlcli_types::EventRecord;

/// Decode one log line
///
/// Returns `None` for blank, truncated, or otherwise malformed lines. Records
/// lacking `id`, `timestamp`, `level`, or `type` are malformed.
pub fn decode_line(line: &str) -> Option<EventRecord> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Decode raw line bytes, rejecting invalid UTF-8
pub fn decode_bytes(line: &[u8]) -> Option<EventRecord> {
    std::str::from_utf8(line).ok().and_then(decode_line)
}

/// Demand-driven record iterator over an ordered list of files
///
/// Files are opened one at a time in the given order and read top to bottom.
/// The next file is only opened once the current one is exhausted, so a
/// consumer that stops early never touches the remaining files.
pub struct RecordStream {
    /// Files not yet opened
    files: std::vec::IntoIter<PathBuf>,

    /// File being read
    current: Option<BufReader<File>>,

    /// Reused line buffer
    line: Vec<u8>,

    /// Lines pulled from disk so far (valid or not)
    lines_read: usize,
}

impl RecordStream {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files: files.into_iter(),
            current: None,
            line: Vec::new(),
            lines_read: 0,
        }
    }

    /// Number of lines handed to the decoder so far
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    fn open_next(&mut self) -> bool {
        let Some(path) = self.files.next() else {
            return false;
        };
        match File::open(&path) {
            Ok(file) => self.current = Some(BufReader::new(file)),
            // Rotated away or unreadable: nothing to decode
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "skipping log file"),
        }
        true
    }
}

impl Iterator for RecordStream {
    type Item = EventRecord;

    fn next(&mut self) -> Option<EventRecord> {
        loop {
            if self.current.is_none() {
                if !self.open_next() {
                    return None;
                }
                continue;
            }
            let Some(reader) = self.current.as_mut() else {
                continue;
            };

            self.line.clear();
            match reader.read_until(b'\n', &mut self.line) {
                Ok(0) => self.current = None,
                Ok(_) => {
                    self.lines_read += 1;
                    if let Some(record) = decode_bytes(&self.line) {
                        return Some(record);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "read failed, moving to next log file");
                    self.current = None;
                }
            }
        }
    }
}

impl FusedIterator for RecordStream {}
