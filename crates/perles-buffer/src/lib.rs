#![deny(missing_docs)]
//! A bounded ring buffer of recent textual output lines for a single
//! supervised process (`spec.md` §4.1).
//!
//! Thread-safe under a single mutex; `append` is O(1) and drops the
//! oldest line once the buffer is at capacity.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Soft limit for a single line before callers should truncate it
/// (`spec.md` §4.1: "≈500 chars for tool-result lines").
pub const SOFT_LINE_LIMIT: usize = 500;

/// Default ring capacity when none is specified.
pub const DEFAULT_CAPACITY: usize = 100;

/// A fixed-capacity ring of text lines.
pub struct OutputBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl OutputBuffer {
    /// Create a buffer with the given capacity. A capacity of `0` means
    /// every append is immediately dropped (no history kept).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Append one line, dropping the oldest line if the buffer is full.
    pub fn append(&self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().expect("output buffer mutex poisoned");
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Return a snapshot copy of the currently buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .expect("output buffer mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Truncate `line` to at most `limit` chars, appending a trailing `"..."`
/// marker when truncation occurred. Operates on `char` boundaries so it
/// never panics on multi-byte UTF-8 input.
pub fn truncate_line(line: &str, limit: usize) -> String {
    if line.chars().count() <= limit {
        return line.to_string();
    }
    let mut truncated: String = line.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}
