//! Source spans.
//!
//! A [`Span`] is a half-open `[start, end)` byte range over one shared source
//! string. Every token, operand and error produced by a parse carries one, so
//! that diagnostics can point at the exact substring that caused them.
//!
//! Spans produced by the tokenizer always fall on `char` boundaries. Spans
//! built by callers go through [`Span::new`], which refuses inverted or
//! out-of-range bounds instead of silently repairing them.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

/// Contract violations when building or merging spans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("span start {start} is after its end {end}")]
    Inverted { start: usize, end: usize },
    #[error("span {start}..{end} does not fit a source of {len} bytes on char boundaries")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("cannot encompass an empty set of spans")]
    EmptyInput,
    #[error("spans refer to different source strings")]
    SourceMismatch,
}

/// An immutable range over a specific source string.
#[derive(Clone)]
pub struct Span {
    source: Arc<str>,
    start: usize,
    end: usize,
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl Span {
    /// Creates a span, rejecting `start > end` and bounds outside `source`.
    pub fn new(source: Arc<str>, start: usize, end: usize) -> Result<Self, SpanError> {
        if start > end {
            return Err(SpanError::Inverted { start, end });
        }
        if end > source.len() || !source.is_char_boundary(start) || !source.is_char_boundary(end)
        {
            return Err(SpanError::OutOfBounds {
                start,
                end,
                len: source.len(),
            });
        }
        Ok(Self { source, start, end })
    }

    /// A span covering the whole of `source`.
    pub fn whole(source: Arc<str>) -> Self {
        let end = source.len();
        Self {
            source,
            start: 0,
            end,
        }
    }

    /// Engine-internal constructor for bounds already known to be valid.
    pub(crate) fn from_match(source: &Arc<str>, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= source.len());
        Self {
            source: Arc::clone(source),
            start,
            end,
        }
    }

    /// A zero-width span at `at` over the same source.
    pub fn point(&self, at: usize) -> Span {
        debug_assert!(at <= self.source.len());
        Span::from_match(&self.source, at, at)
    }

    /// The smallest span covering every input span.
    pub fn encompass<'a, I>(spans: I) -> Result<Span, SpanError>
    where
        I: IntoIterator<Item = &'a Span>,
    {
        let mut iter = spans.into_iter();
        let first = iter.next().ok_or(SpanError::EmptyInput)?;
        let mut start = first.start;
        let mut end = first.end;
        for span in iter {
            if !first.same_source(span) {
                return Err(SpanError::SourceMismatch);
            }
            start = start.min(span.start);
            end = end.max(span.end);
        }
        Ok(Span::from_match(&first.source, start, end))
    }

    /// The (possibly empty) gap after `a` and before `b`.
    pub fn between(a: &Span, b: &Span) -> Result<Span, SpanError> {
        if !a.same_source(b) {
            return Err(SpanError::SourceMismatch);
        }
        if a.end > b.start {
            return Err(SpanError::Inverted {
                start: a.end,
                end: b.start,
            });
        }
        Ok(Span::from_match(&a.source, a.end, b.start))
    }

    /// Infallible merge used by the parser, where both spans come from one parse.
    pub(crate) fn cover(&self, other: &Span) -> Span {
        self.assert_same_source(other);
        Span::from_match(
            &self.source,
            self.start.min(other.start),
            self.end.max(other.end),
        )
    }

    /// Infallible gap used by the parser; collapses to a point when `a` overlaps `b`.
    pub(crate) fn gap(a: &Span, b: &Span) -> Span {
        a.assert_same_source(b);
        Span::from_match(&a.source, a.end, b.start.max(a.end))
    }
}

// =============================================================================
// ACCESSORS AND COMPARISONS
// =============================================================================

impl Span {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The full source string this span refers to.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_arc(&self) -> &Arc<str> {
        &self.source
    }

    /// The covered substring.
    pub fn text(&self) -> &str {
        &self.source[self.start..self.end]
    }

    pub fn same_source(&self, other: &Span) -> bool {
        Arc::ptr_eq(&self.source, &other.source) || self.source == other.source
    }

    fn assert_same_source(&self, other: &Span) {
        assert!(
            self.same_source(other),
            "spans from different sources cannot be compared"
        );
    }

    /// True when this span starts at or after the end of `other`.
    pub fn is_right_of(&self, other: &Span) -> bool {
        self.assert_same_source(other);
        other.end <= self.start
    }

    pub fn is_right_of_index(&self, index: usize) -> bool {
        self.start >= index
    }

    /// True when this span ends at or before the start of `other`.
    pub fn is_left_of(&self, other: &Span) -> bool {
        self.assert_same_source(other);
        other.start >= self.end
    }

    /// True when this span lies inside the gap between `a` and `b`.
    pub fn is_between(&self, a: &Span, b: &Span) -> bool {
        self.assert_same_source(a);
        self.assert_same_source(b);
        a.end <= self.start && b.start >= self.end
    }

    /// Renders the source with the span wrapped in `open` and `close`.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use strexpr::Span;
    /// let span = Span::new(Arc::from("1 + 2 * 3"), 6, 7).unwrap();
    /// assert_eq!(span.highlight("[", "]"), "1 + 2 [*] 3");
    /// ```
    pub fn highlight(&self, open: &str, close: &str) -> String {
        format!(
            "{}{}{}{}{}",
            &self.source[..self.start],
            open,
            self.text(),
            close,
            &self.source[self.end..]
        )
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.same_source(other)
    }
}

impl Eq for Span {}

impl PartialOrd for Span {
    /// Spans over different sources are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.same_source(other) {
            return None;
        }
        Some((self.start, self.end).cmp(&(other.start, other.end)))
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{} {:?})", self.start, self.end, self.text())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl Serialize for Span {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Span", 3)?;
        state.serialize_field("start", &self.start)?;
        state.serialize_field("end", &self.end)?;
        state.serialize_field("text", self.text())?;
        state.end()
    }
}

impl From<&Span> for miette::SourceSpan {
    fn from(span: &Span) -> Self {
        (span.start, span.len()).into()
    }
}
