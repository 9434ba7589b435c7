//! Span-anchored text edits applied atomically to a single source file.
//!
//! The codemod never re-prints a whole module. Every change it makes is one of
//! three primitives anchored at byte offsets of the *original* text:
//!
//! | Primitive | Description | Span Semantics |
//! |-----------|-------------|----------------|
//! | `Replace(span, text)` | Replace content at span with new text | `span.start..span.end` becomes `text` |
//! | `Delete(span)` | Remove content at span | Equivalent to `Replace(span, "")` |
//! | `InsertAt(position, text)` | Insert at absolute position | Zero-width span at position |
//!
//! [`BatchSpanEditor`] collects primitives and applies them in one pass, so
//! untouched code keeps its exact formatting.
//!
//! # Example
//!
//! ```
//! use ember_data_codemod_core::patch::{BatchSpanEditor, EditPrimitive, Span};
//!
//! let source = "export default DS.Model.extend();\n";
//!
//! let mut editor = BatchSpanEditor::new(source);
//! editor.add(EditPrimitive::Replace {
//!     span: Span::new(15, 23),
//!     new_text: "Model".to_string(),
//! });
//! editor.add(EditPrimitive::InsertAt {
//!     position: 0,
//!     text: "import Model from '@ember-data/model';\n".to_string(),
//! });
//!
//! let result = editor.apply().unwrap();
//! assert_eq!(
//!     result,
//!     "import Model from '@ember-data/model';\nexport default Model.extend();\n"
//! );
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Span
// ============================================================================

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if a byte offset falls inside the span.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Edit Primitives
// ============================================================================

/// An atomic edit operation on source text.
///
/// Edit primitives are collected and applied in reverse position order
/// to preserve span validity as text lengths change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPrimitive {
    /// Replace content at span with new text.
    Replace { span: Span, new_text: String },

    /// Delete content at span. Equivalent to `Replace { span, new_text: "" }`.
    Delete { span: Span },

    /// Insert text at an absolute byte position.
    InsertAt { position: usize, text: String },
}

impl EditPrimitive {
    /// Returns the span of original text this edit consumes.
    /// For InsertAt, returns a zero-width span at the position.
    pub fn effective_span(&self) -> Span {
        match self {
            EditPrimitive::Replace { span, .. } => *span,
            EditPrimitive::Delete { span } => *span,
            EditPrimitive::InsertAt { position, .. } => Span::new(*position, *position),
        }
    }

    /// Returns the insertion point (byte offset where new text begins).
    pub fn insertion_point(&self) -> usize {
        match self {
            EditPrimitive::Replace { span, .. } => span.start,
            EditPrimitive::Delete { span } => span.start,
            EditPrimitive::InsertAt { position, .. } => *position,
        }
    }

    /// Returns true if this is a pure insertion.
    pub fn is_insertion(&self) -> bool {
        matches!(self, EditPrimitive::InsertAt { .. })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error type for batch edit operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchEditError {
    /// Two edits have overlapping spans.
    #[error("overlapping edits: {edit1_span} and {edit2_span}")]
    OverlappingEdits { edit1_span: Span, edit2_span: Span },

    /// An edit span extends beyond source length.
    #[error("span {span} is out of bounds for source of length {source_len}")]
    SpanOutOfBounds { span: Span, source_len: usize },

    /// An edit boundary splits a multi-byte character.
    #[error("span {span} does not fall on character boundaries")]
    NotCharBoundary { span: Span },

    /// No edits to apply.
    #[error("no edits to apply")]
    EmptyEdits,
}

/// Result type for batch edit operations.
pub type BatchEditResult<T> = Result<T, BatchEditError>;

// ============================================================================
// Batch Editor
// ============================================================================

/// A batch editor that collects edit primitives and applies them atomically.
///
/// Either every edit applies or none does: validation (bounds, character
/// boundaries, overlaps) runs before the first byte is touched.
pub struct BatchSpanEditor<'src> {
    source: &'src str,
    edits: Vec<EditPrimitive>,
}

impl<'src> BatchSpanEditor<'src> {
    /// Create a new BatchSpanEditor for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Add an edit primitive to the batch.
    pub fn add(&mut self, edit: EditPrimitive) {
        self.edits.push(edit);
    }

    /// Add multiple edit primitives.
    pub fn add_all(&mut self, edits: impl IntoIterator<Item = EditPrimitive>) {
        self.edits.extend(edits);
    }

    /// Apply all queued edits and return the transformed source.
    ///
    /// Edits are applied in reverse position order to preserve span validity.
    ///
    /// # Errors
    ///
    /// - `BatchEditError::OverlappingEdits` if any two edits overlap
    /// - `BatchEditError::SpanOutOfBounds` if any span exceeds source length
    /// - `BatchEditError::NotCharBoundary` if a span splits a UTF-8 character
    /// - `BatchEditError::EmptyEdits` if no edits are queued
    pub fn apply(mut self) -> BatchEditResult<String> {
        if self.edits.is_empty() {
            return Err(BatchEditError::EmptyEdits);
        }

        self.check_bounds()?;

        // Descending by position; at equal positions deletions and
        // replacements run before insertions so the inserted text lands at
        // the original offset.
        self.edits.sort_by(compare_edits);

        if let Some((first, second)) = first_overlap(&self.edits) {
            return Err(BatchEditError::OverlappingEdits {
                edit1_span: first,
                edit2_span: second,
            });
        }

        let mut result = self.source.to_string();
        for edit in &self.edits {
            match edit {
                EditPrimitive::Replace { span, new_text } => {
                    result.replace_range(span.start..span.end, new_text);
                }
                EditPrimitive::Delete { span } => {
                    result.replace_range(span.start..span.end, "");
                }
                EditPrimitive::InsertAt { position, text } => {
                    result.insert_str(*position, text);
                }
            }
        }

        Ok(result)
    }

    fn check_bounds(&self) -> BatchEditResult<()> {
        let source_len = self.source.len();
        for edit in &self.edits {
            let span = edit.effective_span();
            if span.end > source_len {
                return Err(BatchEditError::SpanOutOfBounds { span, source_len });
            }
            if !self.source.is_char_boundary(span.start) || !self.source.is_char_boundary(span.end)
            {
                return Err(BatchEditError::NotCharBoundary { span });
            }
        }
        Ok(())
    }
}

fn compare_edits(a: &EditPrimitive, b: &EditPrimitive) -> Ordering {
    match b.insertion_point().cmp(&a.insertion_point()) {
        Ordering::Equal => match (a.is_insertion(), b.is_insertion()) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => Ordering::Equal,
        },
        other => other,
    }
}

/// Scan edits already sorted in descending order for the first overlapping
/// pair. Adjacent edits do not overlap.
fn first_overlap(sorted: &[EditPrimitive]) -> Option<(Span, Span)> {
    sorted.windows(2).find_map(|pair| {
        let prev = pair[0].effective_span();
        let curr = pair[1].effective_span();
        if prev.overlaps(&curr) {
            Some((curr, prev))
        } else {
            None
        }
    })
}
