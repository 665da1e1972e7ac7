use djc_source::ByteOffset;
use djc_source::Diagnostic;
use djc_source::DiagnosticRenderer;
use djc_source::LineCol;
use djc_source::Span;
use serde::Serialize;
use thiserror::Error;

use crate::ast::SpreadKind;

/// A lexical failure while scanning a tag body.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString { span: Span, line_col: LineCol },

    #[error("unterminated template string")]
    UnterminatedTemplateString { span: Span, line_col: LineCol },

    #[error("unterminated comment")]
    UnterminatedComment { span: Span, line_col: LineCol },

    #[error("invalid numeric literal `{literal}`")]
    InvalidNumber {
        literal: String,
        span: Span,
        line_col: LineCol,
    },

    #[error("integer literal `{literal}` does not fit a 64-bit integer")]
    IntegerOverflow {
        literal: String,
        span: Span,
        line_col: LineCol,
    },
}

impl LexError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            LexError::UnterminatedString { span, .. }
            | LexError::UnterminatedTemplateString { span, .. }
            | LexError::UnterminatedComment { span, .. }
            | LexError::InvalidNumber { span, .. }
            | LexError::IntegerOverflow { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn line_col(&self) -> LineCol {
        match self {
            LexError::UnterminatedString { line_col, .. }
            | LexError::UnterminatedTemplateString { line_col, .. }
            | LexError::UnterminatedComment { line_col, .. }
            | LexError::InvalidNumber { line_col, .. }
            | LexError::IntegerOverflow { line_col, .. } => *line_col,
        }
    }

    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            LexError::UnterminatedString { .. } => "TAG-101",
            LexError::UnterminatedTemplateString { .. } => "TAG-102",
            LexError::UnterminatedComment { .. } => "TAG-103",
            LexError::InvalidNumber { .. } => "TAG-104",
            LexError::IntegerOverflow { .. } => "TAG-105",
        }
    }
}

/// A grammar violation in an otherwise well-lexed tag body.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum GrammarError {
    #[error("expected a tag name")]
    MissingTagName { span: Span, line_col: LineCol },

    #[error("unexpected `{found}`, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: char,
        span: Span,
        line_col: LineCol,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd {
        expected: &'static str,
        span: Span,
        line_col: LineCol,
    },

    #[error("`/` must be the last token of a self-closing tag")]
    TrailingAfterSelfClosing { span: Span, line_col: LineCol },

    #[error("spread `{marker}` is not allowed here")]
    ForbiddenSpread {
        marker: SpreadKind,
        span: Span,
        line_col: LineCol,
    },

    #[error("duplicate spread marker")]
    DuplicateSpread { span: Span, line_col: LineCol },

    #[error("expected a filter name after `|`")]
    ExpectedFilterName { span: Span, line_col: LineCol },

    #[error("translation argument must be a single string literal")]
    TranslationNotLiteral { span: Span, line_col: LineCol },

    #[error("unclosed `{delimiter}`")]
    UnclosedDelimiter {
        delimiter: &'static str,
        span: Span,
        line_col: LineCol,
    },

    #[error("empty template string interpolation")]
    EmptyInterpolation { span: Span, line_col: LineCol },
}

impl GrammarError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            GrammarError::MissingTagName { span, .. }
            | GrammarError::UnexpectedToken { span, .. }
            | GrammarError::UnexpectedEnd { span, .. }
            | GrammarError::TrailingAfterSelfClosing { span, .. }
            | GrammarError::ForbiddenSpread { span, .. }
            | GrammarError::DuplicateSpread { span, .. }
            | GrammarError::ExpectedFilterName { span, .. }
            | GrammarError::TranslationNotLiteral { span, .. }
            | GrammarError::UnclosedDelimiter { span, .. }
            | GrammarError::EmptyInterpolation { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn line_col(&self) -> LineCol {
        match self {
            GrammarError::MissingTagName { line_col, .. }
            | GrammarError::UnexpectedToken { line_col, .. }
            | GrammarError::UnexpectedEnd { line_col, .. }
            | GrammarError::TrailingAfterSelfClosing { line_col, .. }
            | GrammarError::ForbiddenSpread { line_col, .. }
            | GrammarError::DuplicateSpread { line_col, .. }
            | GrammarError::ExpectedFilterName { line_col, .. }
            | GrammarError::TranslationNotLiteral { line_col, .. }
            | GrammarError::UnclosedDelimiter { line_col, .. }
            | GrammarError::EmptyInterpolation { line_col, .. } => *line_col,
        }
    }

    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            GrammarError::MissingTagName { .. } => "TAG-201",
            GrammarError::UnexpectedToken { .. } => "TAG-202",
            GrammarError::UnexpectedEnd { .. } => "TAG-203",
            GrammarError::TrailingAfterSelfClosing { .. } => "TAG-204",
            GrammarError::ForbiddenSpread { .. } => "TAG-205",
            GrammarError::DuplicateSpread { .. } => "TAG-206",
            GrammarError::ExpectedFilterName { .. } => "TAG-207",
            GrammarError::TranslationNotLiteral { .. } => "TAG-208",
            GrammarError::UnclosedDelimiter { .. } => "TAG-209",
            GrammarError::EmptyInterpolation { .. } => "TAG-210",
        }
    }
}

/// Any failure from [`parse_tag`](crate::parse_tag).
///
/// The parser stops at the first error; every error points at the offending
/// byte offset and 1-based line/column.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

impl ParseError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(err) => err.span(),
            ParseError::Grammar(err) => err.span(),
        }
    }

    #[must_use]
    pub fn byte_offset(&self) -> ByteOffset {
        self.span().start_offset()
    }

    #[must_use]
    pub fn line_col(&self) -> LineCol {
        match self {
            ParseError::Lex(err) => err.line_col(),
            ParseError::Grammar(err) => err.line_col(),
        }
    }

    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            ParseError::Lex(err) => err.diagnostic_code(),
            ParseError::Grammar(err) => err.diagnostic_code(),
        }
    }

    /// Build a diagnostic pointing at the offending span of the tag body.
    ///
    /// `path` is whatever the caller wants printed as the origin. The result
    /// can be annotated further before handing it to a renderer.
    #[must_use]
    pub fn to_diagnostic<'a>(&self, source: &'a str, path: &'a str) -> Diagnostic<'a> {
        Diagnostic::error(
            source,
            path,
            self.diagnostic_code(),
            self.to_string(),
            self.span(),
            "here",
        )
    }

    /// Render this error as an annotated snippet over the tag body it came
    /// from.
    #[must_use]
    pub fn render(&self, source: &str, path: &str, renderer: &DiagnosticRenderer) -> String {
        renderer.render(&self.to_diagnostic(source, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_lex_errors() {
        let err: ParseError = LexError::UnterminatedComment {
            span: Span::new(4, 2),
            line_col: LineCol::new(1, 5),
        }
        .into();
        assert_eq!(err.diagnostic_code(), "TAG-103");
        assert_eq!(err.span(), Span::new(4, 2));
        assert_eq!(err.byte_offset(), ByteOffset(4));
        assert_eq!(err.line_col(), LineCol::new(1, 5));
        assert_eq!(err.to_string(), "unterminated comment");
    }

    #[test]
    fn converts_to_a_diagnostic() {
        let source = "my_tag a=**x";
        let err: ParseError = GrammarError::ForbiddenSpread {
            marker: SpreadKind::DoubleStar,
            span: Span::new(9, 2),
            line_col: LineCol::new(1, 10),
        }
        .into();
        let diagnostic = err.to_diagnostic(source, "<tag>");
        assert_eq!(diagnostic.code, "TAG-205");
        assert_eq!(diagnostic.message, "spread `**` is not allowed here");
        assert_eq!(diagnostic.annotations.len(), 1);
        assert_eq!(diagnostic.annotations[0].span, Span::new(9, 2));
        assert!(diagnostic.annotations[0].primary);
    }

    #[test]
    fn renders_a_snippet() {
        let source = "my_tag **[1]";
        let err: ParseError = GrammarError::ForbiddenSpread {
            marker: SpreadKind::DoubleStar,
            span: Span::new(7, 2),
            line_col: LineCol::new(1, 8),
        }
        .into();
        let output = err.render(source, "<tag>", &DiagnosticRenderer::plain());
        assert!(output.contains("TAG-205"));
        assert!(output.contains("spread `**` is not allowed here"));
    }
}
