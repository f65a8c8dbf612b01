//! Call-trace block extraction
//!
//! A block starts at an occurrence of the call-trace marker and runs up to the
//! next occurrence (or the end of the log). Blocks are produced lazily and in
//! file order; the iterator is `Clone`, so a listing can be restarted cheaply.

use serde::Serialize;

use super::frame::StackFrame;

/// Marker printed by the kernel's backtrace printer
pub const CALL_TRACE_MARKER: &str = "Call Trace:";

/// One call-trace block borrowed from the crash log text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallTraceBlock<'a> {
    /// Position in file order (0-based)
    pub index: usize,
    /// Byte offset of the marker occurrence
    pub offset: usize,
    /// 0-based line of the marker
    pub line_number: usize,
    /// Full log line containing the marker, used as display label
    pub header: &'a str,
    /// Text from the marker up to the next marker or end of log
    #[serde(skip)]
    pub text: &'a str,
    #[serde(skip)]
    has_successor: bool,
}

impl<'a> CallTraceBlock<'a> {
    /// Split the block into stack frames: every non-blank line after the marker line.
    ///
    /// When another block follows, the last line is the prefix of the next marker
    /// line (e.g. its timestamp) and is not a frame.
    pub fn frames(&self) -> impl Iterator<Item = StackFrame> + 'a {
        let body = self.text.split_once('\n').map_or("", |(_, rest)| rest);
        let body = if self.has_successor {
            body.rfind('\n').map_or("", |end| &body[..=end])
        } else {
            body
        };

        body.lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(StackFrame::parse)
    }
}

/// Lazy iterator over the call-trace blocks of a log
#[derive(Debug, Clone)]
pub struct CallTraceBlocks<'a> {
    text: &'a str,
    marker: &'a str,
    next_start: Option<usize>,
    index: usize,
    /// Line count up to `scanned`, so line numbers are computed incrementally
    line: usize,
    scanned: usize,
}

/// Find all blocks starting with `marker` in `text`
#[must_use]
pub fn call_trace_blocks<'a>(text: &'a str, marker: &'a str) -> CallTraceBlocks<'a> {
    let next_start = if marker.is_empty() { None } else { text.find(marker) };
    CallTraceBlocks { text, marker, next_start, index: 0, line: 0, scanned: 0 }
}

impl<'a> Iterator for CallTraceBlocks<'a> {
    type Item = CallTraceBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let after = start + self.marker.len();
        let next = self.text[after..].find(self.marker).map(|pos| after + pos);
        self.next_start = next;

        self.line += count_lines(&self.text[self.scanned..start]);
        self.scanned = start;

        let line_start = self.text[..start].rfind('\n').map_or(0, |pos| pos + 1);
        let line_end = self.text[start..].find('\n').map_or(self.text.len(), |pos| start + pos);

        let block = CallTraceBlock {
            index: self.index,
            offset: start,
            line_number: self.line,
            header: self.text[line_start..line_end].trim_end(),
            text: &self.text[start..next.unwrap_or(self.text.len())],
            has_successor: next.is_some(),
        };
        self.index += 1;
        Some(block)
    }
}

/// 0-based line number of the last occurrence of `needle` starting at or before
/// `cursor` (a byte offset). `None` searches the whole text.
#[must_use]
pub fn line_of_last_occurrence(text: &str, needle: &str, cursor: Option<usize>) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }

    let limit = cursor.map_or(text.len(), |c| c.min(text.len()));
    let mut end = (limit + needle.len()).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let pos = text[..end].rfind(needle)?;
    Some(count_lines(&text[..pos]))
}

fn count_lines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}
