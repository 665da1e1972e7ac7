use std::borrow::Cow;

use djc_source::LineCol;
use djc_source::Span;
use memchr::memmem;

use crate::ast::TagToken;
use crate::error::LexError;

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

pub(crate) fn decode_escape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

/// A point in the input: byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pos {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub(crate) fn line_col(self) -> LineCol {
        LineCol::new(self.line, self.column)
    }
}

/// Character-level cursor over a tag body.
///
/// Tracks the byte offset and the 1-based line/column (columns count code
/// points) in a single forward pass. Copy, so callers can checkpoint a
/// position and restore it after lookahead.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'t> {
    source: &'t str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'t> Cursor<'t> {
    pub(crate) fn new(source: &'t str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    pub(crate) fn source(&self) -> &'t str {
        self.source
    }

    pub(crate) fn rest(&self) -> &'t str {
        &self.source[self.offset..]
    }

    pub(crate) fn pos(&self) -> Pos {
        Pos {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.offset >= self.source.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    pub(crate) fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub(crate) fn bump_n(&mut self, count: usize) {
        for _ in 0..count {
            if self.bump().is_none() {
                break;
            }
        }
    }

    fn bump_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    pub(crate) fn slice_from(&self, start: Pos) -> &'t str {
        &self.source[start.offset..self.offset]
    }

    pub(crate) fn span_from(&self, start: Pos) -> Span {
        Span::saturating_from_bounds_usize(start.offset, self.offset)
    }

    pub(crate) fn span_to_end(&self, start: Pos) -> Span {
        Span::saturating_from_bounds_usize(start.offset, self.source.len())
    }

    pub(crate) fn token_from(&self, start: Pos) -> TagToken<'t> {
        TagToken {
            token: Cow::Borrowed(self.slice_from(start)),
            span: self.span_from(start),
            line_col: start.line_col(),
        }
    }

    /// Skip whitespace and `{# … #}` comments.
    ///
    /// Comments do not nest; the scanner seeks the next `#}`. Their bytes
    /// still count toward the offsets of surrounding tokens.
    pub(crate) fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('{') if self.starts_with("{#") => {
                    let start = self.pos();
                    let Some(rel) = memmem::find(&self.rest().as_bytes()[2..], b"#}") else {
                        return Err(LexError::UnterminatedComment {
                            span: self.span_to_end(start),
                            line_col: start.line_col(),
                        });
                    };
                    let end = self.offset + 2 + rel + 2;
                    while self.offset < end {
                        self.bump();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Scan `[A-Za-z_][A-Za-z0-9_-]*`, or None if the cursor is not at one.
    pub(crate) fn scan_identifier(&mut self) -> Option<TagToken<'t>> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let start = self.pos();
        self.bump();
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Some(self.token_from(start))
    }

    /// Scan a quoted string. The cursor must sit on the opening quote.
    ///
    /// The returned token's text is the unquoted payload with escapes
    /// decoded; the span covers the quotes.
    pub(crate) fn scan_string(&mut self) -> Result<TagToken<'t>, LexError> {
        let start = self.pos();
        let Some(quote) = self.bump() else {
            return Err(LexError::UnterminatedString {
                span: self.span_to_end(start),
                line_col: start.line_col(),
            });
        };
        let content_start = self.offset;
        let mut decoded: Option<String> = None;
        loop {
            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedString {
                        span: self.span_to_end(start),
                        line_col: start.line_col(),
                    });
                }
                Some(c) if c == quote => {
                    let content_end = self.offset;
                    self.bump();
                    let token = match decoded {
                        Some(owned) => Cow::Owned(owned),
                        None => Cow::Borrowed(&self.source[content_start..content_end]),
                    };
                    return Ok(TagToken {
                        token,
                        span: self.span_from(start),
                        line_col: start.line_col(),
                    });
                }
                Some('\\') => {
                    if decoded.is_none() {
                        decoded = Some(self.source[content_start..self.offset].to_string());
                    }
                    self.bump();
                    let Some(escaped) = self.bump() else {
                        return Err(LexError::UnterminatedString {
                            span: self.span_to_end(start),
                            line_col: start.line_col(),
                        });
                    };
                    if let Some(buf) = decoded.as_mut() {
                        buf.push(decode_escape(escaped));
                    }
                }
                Some(c) => {
                    self.bump();
                    if let Some(buf) = decoded.as_mut() {
                        buf.push(c);
                    }
                }
            }
        }
    }

    /// Scan a numeric literal. The cursor must sit on a digit, or on a `-`
    /// followed by a digit. Returns the token and whether it is a float.
    pub(crate) fn scan_number(&mut self) -> Result<(TagToken<'t>, bool), LexError> {
        let start = self.pos();
        if self.peek() == Some('-') {
            self.bump();
        }
        self.bump_digits();
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.bump_digits();
            is_float = true;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut probe = *self;
            probe.bump();
            if matches!(probe.peek(), Some('+' | '-')) {
                probe.bump();
            }
            if probe.peek().is_some_and(|c| c.is_ascii_digit()) {
                probe.bump_digits();
                *self = probe;
                is_float = true;
            }
        }
        if self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            // Pull the offending run into the reported literal.
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            {
                self.bump();
            }
            return Err(LexError::InvalidNumber {
                literal: self.slice_from(start).to_string(),
                span: self.span_from(start),
                line_col: start.line_col(),
            });
        }
        let token = self.token_from(start);
        if !is_float && token.text().parse::<i64>().is_err() {
            return Err(LexError::IntegerOverflow {
                literal: token.text().to_string(),
                span: token.span,
                line_col: token.line_col,
            });
        }
        Ok((token, is_float))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncé");
        cursor.bump_n(3);
        let pos = cursor.pos();
        assert_eq!((pos.line, pos.column), (2, 1));
        cursor.bump_n(2);
        let pos = cursor.pos();
        assert_eq!((pos.line, pos.column), (2, 3));
        // 'é' is two bytes but one column.
        assert_eq!(cursor.offset(), 6);
    }

    #[test]
    fn skips_whitespace_and_comments() {
        let mut cursor = Cursor::new("  {# note #}\t{# more #} x");
        cursor.skip_trivia().unwrap();
        assert_eq!(cursor.peek(), Some('x'));
        assert_eq!(cursor.offset(), 24);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let mut cursor = Cursor::new("  {# never closed");
        let err = cursor.skip_trivia().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedComment { .. }));
        assert_eq!(err.span(), Span::new(2, 15));
        assert_eq!(err.line_col(), LineCol::new(1, 3));
    }

    #[test]
    fn scans_identifiers_with_hyphens() {
        let mut cursor = Cursor::new("data-foo=1");
        let token = cursor.scan_identifier().unwrap();
        assert_eq!(token.text(), "data-foo");
        assert_eq!(token.span, Span::new(0, 8));
        assert_eq!(cursor.peek(), Some('='));
    }

    #[test]
    fn identifiers_cannot_start_with_digits() {
        let mut cursor = Cursor::new("1abc");
        assert!(cursor.scan_identifier().is_none());
    }

    #[test]
    fn scans_plain_strings_zero_copy() {
        let mut cursor = Cursor::new("'hello' rest");
        let token = cursor.scan_string().unwrap();
        assert_eq!(token.text(), "hello");
        assert!(matches!(token.token, Cow::Borrowed(_)));
        assert_eq!(token.span, Span::new(0, 7));
    }

    #[test]
    fn decodes_string_escapes() {
        let mut cursor = Cursor::new(r#""a\"b\n\\c\q""#);
        let token = cursor.scan_string().unwrap();
        assert_eq!(token.text(), "a\"b\n\\cq");
        assert!(matches!(token.token, Cow::Owned(_)));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut cursor = Cursor::new("\"open");
        let err = cursor.scan_string().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn trailing_backslash_is_unterminated() {
        let mut cursor = Cursor::new("\"open\\");
        let err = cursor.scan_string().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[rstest]
    #[case("0", false)]
    #[case("42", false)]
    #[case("-7", false)]
    #[case("1.5", true)]
    #[case("-0.25", true)]
    #[case("1e-10", true)]
    #[case("2E+3", true)]
    #[case("9e4", true)]
    fn scans_numbers(#[case] input: &str, #[case] float: bool) {
        let mut cursor = Cursor::new(input);
        let (token, is_float) = cursor.scan_number().unwrap();
        assert_eq!(token.text(), input);
        assert_eq!(is_float, float);
        assert!(cursor.is_at_end());
    }

    #[rstest]
    #[case("1px")]
    #[case("1e")]
    #[case("12.5.6")]
    #[case("3_000")]
    fn rejects_malformed_numbers(#[case] input: &str) {
        let mut cursor = Cursor::new(input);
        let err = cursor.scan_number().unwrap_err();
        assert!(matches!(err, LexError::InvalidNumber { .. }));
    }

    #[test]
    fn stops_before_separators() {
        let mut cursor = Cursor::new("1, 2");
        let (token, is_float) = cursor.scan_number().unwrap();
        assert_eq!(token.text(), "1");
        assert!(!is_float);
        assert_eq!(cursor.peek(), Some(','));
    }

    #[test]
    fn trailing_dot_is_rejected() {
        let mut cursor = Cursor::new("1.");
        let err = cursor.scan_number().unwrap_err();
        assert!(matches!(err, LexError::InvalidNumber { .. }));
    }

    #[test]
    fn integer_overflow_is_reported() {
        let mut cursor = Cursor::new("99999999999999999999");
        let err = cursor.scan_number().unwrap_err();
        assert!(matches!(err, LexError::IntegerOverflow { .. }));
    }
}
