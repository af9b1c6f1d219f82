use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads the text of a function back from its file.
///
/// `body_line` is the registry's start line, which points one past the
/// declaration line, so the span taken is `body_line - 1 ..= end_line`
/// (1-indexed, clamped to the file). Lines lose their `\n` or `\r\n`
/// terminator and are joined back with `\n`.
pub fn extract_source(path: &Path, body_line: usize, end_line: usize) -> Result<String> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(slice_lines(&text, body_line, end_line))
}

pub(crate) fn slice_lines(text: &str, body_line: usize, end_line: usize) -> String {
    let first = body_line.saturating_sub(2);
    let count = end_line.saturating_sub(first);
    text.split('\n')
        .skip(first)
        .take(count)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}
