//! Text utilities: positions, line terminators, and removal spans.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//!
//! The removal helpers compute how much text to consume when a statement or
//! a list item disappears, so deletions do not leave blank lines, dangling
//! commas or stray indentation behind.

use crate::patch::Span;

// ============================================================================
// Positions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// Columns count bytes, not characters. If `offset` exceeds content length,
/// returns the position at end of content.
pub fn byte_offset_to_position(content: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for &byte in &content[..offset] {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// 1-indexed line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> u32 {
    byte_offset_to_position(source.as_bytes(), offset).0
}

/// Extract the lines `start_line - 2 ..= end_line + 2` (clamped) joined by `\n`.
///
/// This is the context attached to diagnostics: the offending lines plus
/// two lines either side.
pub fn source_context(source: &str, start_line: u32, end_line: u32) -> String {
    let lines: Vec<&str> = source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let first = (start_line.max(1) as usize).saturating_sub(2).max(1) - 1;
    let last = (end_line as usize + 2).min(lines.len());
    if first >= last {
        return String::new();
    }
    lines[first..last].join("\n")
}

// ============================================================================
// Line Terminators
// ============================================================================

/// The terminator used for inserted text: `\r\n` if the input contains any
/// `\r\n`, otherwise `\n`.
pub fn detect_line_terminator(source: &str) -> &'static str {
    if source.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// If `offset` is followed by optional spaces/tabs and a line terminator,
/// return the offset just past that terminator.
fn end_of_line_after(source: &str, offset: usize) -> Option<usize> {
    let rest = &source[offset..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    let skipped = rest.len() - trimmed.len();
    if trimmed.starts_with("\r\n") {
        Some(offset + skipped + 2)
    } else if trimmed.starts_with('\n') {
        Some(offset + skipped + 1)
    } else if trimmed.is_empty() {
        Some(source.len())
    } else {
        None
    }
}

fn only_indentation(text: &str) -> bool {
    text.bytes().all(|b| b == b' ' || b == b'\t')
}

/// True if the line that ends right before `line_start` is blank (or there is
/// no such line because `line_start` is the beginning of the file).
fn previous_line_blank(source: &str, line_start: usize) -> bool {
    if line_start == 0 {
        return true;
    }
    let before = &source[..line_start - 1];
    let before = before.strip_suffix('\r').unwrap_or(before);
    let prev_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    before[prev_start..].trim().is_empty()
}

// ============================================================================
// Removal Spans
// ============================================================================

/// Extend `span` over a `;` that directly follows it.
pub fn absorb_semicolon(source: &str, span: Span) -> Span {
    if source[span.end..].starts_with(';') {
        Span::new(span.start, span.end + 1)
    } else {
        span
    }
}

/// Span to delete when removing a whole statement.
///
/// When the statement sits alone on its line(s) the span grows to cover the
/// indentation before it and the terminator after it. If the statement is
/// also preceded by a blank line (or the start of the file) and followed by
/// one, that following blank line is consumed too so that blank lines do not
/// pile up where the statement used to be.
pub fn statement_removal_span(source: &str, stmt: Span) -> Span {
    let start_of_line = line_start(source, stmt.start);
    let owns_line_start = only_indentation(&source[start_of_line..stmt.start]);
    let trailing = blank_run_after(source, stmt.end);

    match (owns_line_start, end_of_line_after(source, stmt.end)) {
        (true, Some(mut end)) => {
            if end < source.len() && previous_line_blank(source, start_of_line) {
                if let Some(next_end) = end_of_line_after(source, end) {
                    if next_end > end && source[end..next_end].trim().is_empty() {
                        end = next_end;
                    }
                }
            }
            Span::new(start_of_line, end)
        }
        // Code precedes the statement on its line; the terminator stays with it.
        (false, Some(_)) => Span::new(
            stmt.start - blank_run_before(source, stmt.start),
            stmt.end + trailing,
        ),
        _ => Span::new(stmt.start, stmt.end + trailing),
    }
}

/// Extend a whole-line removal over the `//` comment lines directly above
/// it. A span that does not start a line is returned unchanged.
pub fn absorb_leading_line_comments(source: &str, span: Span) -> Span {
    if line_start(source, span.start) != span.start {
        return span;
    }
    let mut start = span.start;
    while start > 0 {
        let prev_start = line_start(source, start - 1);
        if !source[prev_start..start].trim_start().starts_with("//") {
            break;
        }
        start = prev_start;
    }
    Span::new(start, span.end)
}

/// Merge touching statement removals and let each merged run consume one
/// following blank line, the way a single statement would.
///
/// Removing `a` and `b` one by one from `\n\na\nb\n\nc` keeps both
/// blank lines; removing them as a run keeps one.
pub fn coalesce_line_removals(source: &str, mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by_key(|span| span.start);
    let mut runs = merge_touching(spans);
    for run in &mut runs {
        let whole_lines = line_start(source, run.start) == run.start
            && (run.end == source.len() || source[..run.end].ends_with('\n'));
        if !whole_lines || run.end == source.len() || ends_with_blank_line(&source[run.start..run.end]) {
            continue;
        }
        if !previous_line_blank(source, run.start) {
            continue;
        }
        if let Some(next_end) = end_of_line_after(source, run.end) {
            if next_end > run.end && source[run.end..next_end].trim().is_empty() {
                run.end = next_end;
            }
        }
    }
    merge_touching(runs)
}

fn merge_touching(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

fn ends_with_blank_line(text: &str) -> bool {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let body = body.strip_suffix('\r').unwrap_or(body);
    let last = body.rfind('\n').map(|i| &body[i + 1..]).unwrap_or(body);
    last.trim().is_empty()
}

fn blank_run_after(source: &str, offset: usize) -> usize {
    let rest = &source[offset..];
    rest.len() - rest.trim_start_matches([' ', '\t']).len()
}

fn blank_run_before(source: &str, offset: usize) -> usize {
    let before = &source[..offset];
    before.len() - before.trim_end_matches([' ', '\t']).len()
}

/// Span to delete when removing the consecutive run `first..=last` of a
/// comma-separated list whose item spans are `items`.
///
/// The run takes the separator that follows it (up to the next item) when a
/// later item survives, otherwise the separator that precedes it.
///
/// # Panics
/// Panics if `first > last` or `last >= items.len()`.
pub fn list_removal_span(items: &[Span], first: usize, last: usize) -> Span {
    assert!(first <= last && last < items.len(), "invalid list run");
    if last + 1 < items.len() {
        Span::new(items[first].start, items[last + 1].start)
    } else if first > 0 {
        Span::new(items[first - 1].end, items[last].end)
    } else {
        Span::new(items[first].start, items[last].end)
    }
}

/// Group the removed indices of a list into consecutive runs and compute
/// one removal span per run.
pub fn list_removal_spans(items: &[Span], removed: &[bool]) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut i = 0;
    while i < items.len() {
        if removed[i] {
            let first = i;
            while i + 1 < items.len() && removed[i + 1] {
                i += 1;
            }
            spans.push(list_removal_span(items, first, i));
        }
        i += 1;
    }
    spans
}
