use serde::Serialize;

/// A byte offset within a tag body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ByteOffset(pub u32);

impl ByteOffset {
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A 1-based line and column position.
///
/// Columns count Unicode scalar values, not bytes. Lines are terminated by
/// `\n`; a `\r\n` pair counts as a single break, at the `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A half-open byte range into the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn from_bounds(start: u32, end: u32) -> Self {
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    #[must_use]
    pub fn saturating_from_bounds_usize(start: usize, end: usize) -> Self {
        let start = u32::try_from(start).unwrap_or(u32::MAX);
        let end = u32::try_from(end).unwrap_or(u32::MAX);
        Self::from_bounds(start, end)
    }

    #[must_use]
    pub fn start_usize(&self) -> usize {
        self.start as usize
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }

    #[must_use]
    pub fn end_usize(&self) -> usize {
        self.end() as usize
    }

    #[must_use]
    pub fn length_usize(&self) -> usize {
        self.length as usize
    }

    #[must_use]
    pub fn start_offset(&self) -> ByteOffset {
        ByteOffset(self.start)
    }

    #[must_use]
    pub fn end_offset(&self) -> ByteOffset {
        ByteOffset(self.end())
    }

    /// The slice of `source` this span covers.
    ///
    /// Panics if the span is out of bounds or does not lie on character
    /// boundaries of `source`.
    #[must_use]
    pub fn slice<'t>(&self, source: &'t str) -> &'t str {
        &source[self.start_usize()..self.end_usize()]
    }
}

/// Byte offsets of line starts, for offset to line/column conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex(Vec<u32>);

impl LineIndex {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut starts = Vec::with_capacity(16);
        starts.push(0);
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(u32::try_from(i).unwrap_or(u32::MAX - 1) + 1);
            }
        }
        LineIndex(starts)
    }

    /// Convert a byte offset into a 1-based line/column position.
    ///
    /// `text` must be the same string the index was built from; the column is
    /// the code-point count from the line start, plus one.
    #[must_use]
    pub fn to_line_col(&self, text: &str, offset: ByteOffset) -> LineCol {
        let line = match self.0.binary_search(&offset.0) {
            Ok(exact) => exact,
            Err(0) => 0,
            Err(next) => next - 1,
        };

        let line_start = self.0[line] as usize;
        let upto = offset.as_usize().min(text.len());
        let column = text[line_start..upto].chars().count();

        LineCol::new(
            u32::try_from(line).unwrap_or(u32::MAX - 1) + 1,
            u32::try_from(column).unwrap_or(u32::MAX - 1) + 1,
        )
    }

    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.0.get(line as usize).copied()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_bounds() {
        let span = Span::from_bounds(3, 9);
        assert_eq!(span.start, 3);
        assert_eq!(span.length, 6);
        assert_eq!(span.end(), 9);
        assert_eq!(span.slice("0123456789"), "345678");
    }

    #[test]
    fn span_empty() {
        let span = Span::from_bounds(4, 4);
        assert_eq!(span.length, 0);
        assert_eq!(span.slice("0123456789"), "");
    }

    #[test]
    fn line_index_single_line() {
        let text = "hello world";
        let index = LineIndex::from_text(text);
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.to_line_col(text, ByteOffset(0)), LineCol::new(1, 1));
        assert_eq!(index.to_line_col(text, ByteOffset(6)), LineCol::new(1, 7));
    }

    #[test]
    fn line_index_multi_line() {
        let text = "ab\ncd\nef";
        let index = LineIndex::from_text(text);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.to_line_col(text, ByteOffset(0)), LineCol::new(1, 1));
        assert_eq!(index.to_line_col(text, ByteOffset(3)), LineCol::new(2, 1));
        assert_eq!(index.to_line_col(text, ByteOffset(4)), LineCol::new(2, 2));
        assert_eq!(index.to_line_col(text, ByteOffset(7)), LineCol::new(3, 2));
    }

    #[test]
    fn line_index_crlf_breaks_at_newline() {
        let text = "ab\r\ncd";
        let index = LineIndex::from_text(text);
        assert_eq!(index.line_count(), 2);
        // The \r belongs to line 1; line 2 starts after the \n.
        assert_eq!(index.to_line_col(text, ByteOffset(2)), LineCol::new(1, 3));
        assert_eq!(index.to_line_col(text, ByteOffset(4)), LineCol::new(2, 1));
    }

    #[test]
    fn line_index_counts_code_points() {
        let text = "é=\u{1F600}x";
        let index = LineIndex::from_text(text);
        // 'é' is 2 bytes, the emoji 4 bytes; columns count characters.
        assert_eq!(index.to_line_col(text, ByteOffset(2)), LineCol::new(1, 2));
        assert_eq!(index.to_line_col(text, ByteOffset(3)), LineCol::new(1, 3));
        assert_eq!(index.to_line_col(text, ByteOffset(7)), LineCol::new(1, 4));
    }
}
