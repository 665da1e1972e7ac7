use std::borrow::Cow;

use djc_source::Span;
use rustc_hash::FxHashSet;

use crate::ast::SpreadKind;
use crate::ast::Tag;
use crate::ast::TagAttr;
use crate::ast::TagSyntax;
use crate::ast::TagToken;
use crate::ast::TagValue;
use crate::ast::TagValueFilter;
use crate::ast::ValueKind;
use crate::error::GrammarError;
use crate::error::LexError;
use crate::error::ParseError;
use crate::lexer::decode_escape;
use crate::lexer::is_ident_start;
use crate::lexer::Cursor;
use crate::lexer::Pos;

/// Options controlling how a tag body is parsed.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Identifiers that parse as boolean flag attributes when they appear
    /// bare (no key, path, filters, or spread).
    pub flags: FxHashSet<String>,
    /// The delimiter family the body came from. Under [`TagSyntax::Html`],
    /// every bare identifier attribute is a flag, not just the listed ones.
    pub syntax: TagSyntax,
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn syntax(mut self, syntax: TagSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    #[must_use]
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.flags.insert(name.into());
        self
    }
}

/// Where a value appears, which decides the spread markers it may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueCtx {
    /// Top-level positional: `...`, `*`, and `**` are all legal.
    Positional,
    /// The right-hand side of `key=`: no spread.
    Keyword,
    /// A list element: only `...`.
    ListElement,
    /// The first value of a dict entry: only `**` (a standalone splat).
    DictEntry,
    /// The value of a dict pair: no spread.
    DictValue,
    /// A `${…}` interpolation: no spread.
    Interpolation,
}

impl ValueCtx {
    fn allows(self, marker: SpreadKind) -> bool {
        match self {
            ValueCtx::Positional => true,
            ValueCtx::ListElement => marker == SpreadKind::Dots,
            ValueCtx::DictEntry => marker == SpreadKind::DoubleStar,
            ValueCtx::Keyword | ValueCtx::DictValue | ValueCtx::Interpolation => false,
        }
    }
}

pub(crate) struct Parser<'t, 'o> {
    cursor: Cursor<'t>,
    options: &'o ParseOptions,
}

impl<'t, 'o> Parser<'t, 'o> {
    pub(crate) fn new(input: &'t str, options: &'o ParseOptions) -> Self {
        Self {
            cursor: Cursor::new(input),
            options,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Tag<'t>, ParseError> {
        self.cursor.skip_trivia()?;
        let name_start = self.cursor.pos();
        let Some(name) = self.cursor.scan_identifier() else {
            return Err(GrammarError::MissingTagName {
                span: self.here_span(),
                line_col: name_start.line_col(),
            }
            .into());
        };

        let mut attrs = Vec::new();
        let mut is_self_closing = false;
        let mut end = self.cursor.offset();

        loop {
            self.cursor.skip_trivia()?;
            if self.cursor.is_at_end() {
                break;
            }
            if self.cursor.peek() == Some('/') {
                self.cursor.bump();
                end = self.cursor.offset();
                self.cursor.skip_trivia()?;
                if !self.cursor.is_at_end() {
                    let here = self.cursor.pos();
                    return Err(GrammarError::TrailingAfterSelfClosing {
                        span: self.here_span(),
                        line_col: here.line_col(),
                    }
                    .into());
                }
                is_self_closing = true;
                break;
            }
            attrs.push(self.parse_attr()?);
            end = self.cursor.offset();
        }

        Ok(Tag {
            name,
            attrs,
            is_self_closing,
            syntax: self.options.syntax,
            span: Span::saturating_from_bounds_usize(name_start.offset, end),
            line_col: name_start.line_col(),
        })
    }

    fn parse_attr(&mut self) -> Result<TagAttr<'t>, ParseError> {
        let start = self.cursor.pos();

        if self.cursor.peek().is_some_and(is_ident_start) {
            let checkpoint = self.cursor;
            let key = self.cursor.scan_identifier();
            if self.cursor.peek() == Some('=') {
                self.cursor.bump();
                self.cursor.skip_trivia()?;
                let value = self.parse_value(ValueCtx::Keyword)?;
                return Ok(TagAttr {
                    key,
                    value,
                    is_flag: false,
                    span: self.cursor.span_from(start),
                    line_col: start.line_col(),
                });
            }
            self.cursor = checkpoint;
        }

        let value = self.parse_value(ValueCtx::Positional)?;
        let is_flag = self.is_flag_value(&value);
        Ok(TagAttr {
            key: None,
            span: value.span,
            line_col: value.line_col,
            value,
            is_flag,
        })
    }

    /// A bare identifier is a flag when it has no key, path, filters, or
    /// spread — and either the syntax is HTML (boolean-attribute behavior)
    /// or the name is in the caller's flag set.
    fn is_flag_value(&self, value: &TagValue<'t>) -> bool {
        if value.kind != ValueKind::Variable || value.spread.is_some() || !value.filters.is_empty()
        {
            return false;
        }
        let name = value.token.text();
        if name.contains(|c| c == '.' || c == '[') {
            return false;
        }
        self.options.syntax == TagSyntax::Html || self.options.flags.contains(name)
    }

    fn parse_value(&mut self, ctx: ValueCtx) -> Result<TagValue<'t>, ParseError> {
        let start = self.cursor.pos();
        let spread = self.scan_spread();
        if let Some(marker) = spread {
            if !ctx.allows(marker) {
                return Err(GrammarError::ForbiddenSpread {
                    marker,
                    span: self.cursor.span_from(start),
                    line_col: start.line_col(),
                }
                .into());
            }
            self.cursor.skip_trivia()?;
            if self.at_spread_marker() {
                let here = self.cursor.pos();
                return Err(GrammarError::DuplicateSpread {
                    span: self.here_span(),
                    line_col: here.line_col(),
                }
                .into());
            }
        }

        let mut value = self.parse_primary()?;
        value.filters = self.parse_filters()?;
        value.spread = spread;
        value.span = self.cursor.span_from(start);
        value.source = self.cursor.slice_from(start);
        value.line_col = start.line_col();
        Ok(value)
    }

    fn scan_spread(&mut self) -> Option<SpreadKind> {
        if self.cursor.starts_with("...") {
            self.cursor.bump_n(3);
            Some(SpreadKind::Dots)
        } else if self.cursor.starts_with("**") {
            self.cursor.bump_n(2);
            Some(SpreadKind::DoubleStar)
        } else if self.cursor.starts_with("*") {
            self.cursor.bump();
            Some(SpreadKind::Star)
        } else {
            None
        }
    }

    fn at_spread_marker(&self) -> bool {
        self.cursor.starts_with("...") || self.cursor.starts_with("*")
    }

    fn parse_primary(&mut self) -> Result<TagValue<'t>, ParseError> {
        let start = self.cursor.pos();
        match self.cursor.peek() {
            None => Err(self.unexpected("a value")),
            Some(c) if c.is_ascii_digit() => self.parse_number(start),
            Some('-') if self.cursor.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                self.parse_number(start)
            }
            Some('"' | '\'') => {
                let token = self.cursor.scan_string()?;
                Ok(self.value_from(ValueKind::String, token, Vec::new(), start))
            }
            Some('`') => self.parse_template_string(start),
            Some('[') => self.parse_list(start),
            Some('{') => self.parse_dict(start),
            Some(c) if is_ident_start(c) => {
                let Some(ident) = self.cursor.scan_identifier() else {
                    return Err(self.unexpected("a value"));
                };
                if ident.text() == "_" && self.cursor.peek() == Some('(') {
                    self.parse_translation(start)
                } else {
                    self.parse_variable_rest(start)
                }
            }
            Some(_) => Err(self.unexpected("a value")),
        }
    }

    fn parse_number(&mut self, start: Pos) -> Result<TagValue<'t>, ParseError> {
        let (token, is_float) = self.cursor.scan_number()?;
        let kind = if is_float {
            ValueKind::Float
        } else {
            ValueKind::Int
        };
        Ok(self.value_from(kind, token, Vec::new(), start))
    }

    /// Continue a variable lexeme after its leading identifier: dotted
    /// segments and `[…]` accessors, all part of a single lexeme.
    fn parse_variable_rest(&mut self, start: Pos) -> Result<TagValue<'t>, ParseError> {
        loop {
            match self.cursor.peek() {
                Some('.') => {
                    self.cursor.bump();
                    if self.cursor.scan_identifier().is_none() {
                        return Err(self.unexpected("an identifier after `.`"));
                    }
                }
                Some('[') => {
                    self.cursor.bump();
                    self.cursor.skip_trivia()?;
                    // The accessor expression is validated but stays part of
                    // the variable lexeme; it gets no node of its own.
                    self.parse_primary()?;
                    self.cursor.skip_trivia()?;
                    if self.cursor.peek() == Some(']') {
                        self.cursor.bump();
                    } else {
                        return Err(self.unexpected("`]`"));
                    }
                }
                _ => break,
            }
        }
        let token = self.cursor.token_from(start);
        Ok(self.value_from(ValueKind::Variable, token, Vec::new(), start))
    }

    fn parse_translation(&mut self, start: Pos) -> Result<TagValue<'t>, ParseError> {
        self.cursor.bump(); // (
        self.cursor.skip_trivia()?;
        let token = match self.cursor.peek() {
            Some('"' | '\'') => self.cursor.scan_string()?,
            _ => {
                let here = self.cursor.pos();
                return Err(GrammarError::TranslationNotLiteral {
                    span: self.here_span(),
                    line_col: here.line_col(),
                }
                .into());
            }
        };
        self.cursor.skip_trivia()?;
        if self.cursor.peek() == Some(')') {
            self.cursor.bump();
        } else {
            return Err(self.unexpected("`)`"));
        }
        Ok(self.value_from(ValueKind::Translation, token, Vec::new(), start))
    }

    fn parse_list(&mut self, start: Pos) -> Result<TagValue<'t>, ParseError> {
        let open = self.single_char_token();
        let mut children = Vec::new();
        loop {
            self.cursor.skip_trivia()?;
            match self.cursor.peek() {
                Some(']') => {
                    self.cursor.bump();
                    break;
                }
                None => {
                    return Err(GrammarError::UnclosedDelimiter {
                        delimiter: "[",
                        span: self.cursor.span_to_end(start),
                        line_col: start.line_col(),
                    }
                    .into());
                }
                Some(_) => {
                    children.push(self.parse_value(ValueCtx::ListElement)?);
                    self.cursor.skip_trivia()?;
                    match self.cursor.peek() {
                        Some(',') => {
                            self.cursor.bump();
                        }
                        Some(']') => {
                            self.cursor.bump();
                            break;
                        }
                        _ => return Err(self.unexpected("`,` or `]`")),
                    }
                }
            }
        }
        Ok(self.value_from(ValueKind::List, open, children, start))
    }

    fn parse_dict(&mut self, start: Pos) -> Result<TagValue<'t>, ParseError> {
        let open = self.single_char_token();
        let mut children = Vec::new();
        loop {
            self.cursor.skip_trivia()?;
            match self.cursor.peek() {
                Some('}') => {
                    self.cursor.bump();
                    break;
                }
                None => {
                    return Err(GrammarError::UnclosedDelimiter {
                        delimiter: "{",
                        span: self.cursor.span_to_end(start),
                        line_col: start.line_col(),
                    }
                    .into());
                }
                Some(_) => {
                    let first = self.parse_value(ValueCtx::DictEntry)?;
                    if first.spread == Some(SpreadKind::DoubleStar) {
                        children.push(first);
                    } else {
                        self.cursor.skip_trivia()?;
                        if self.cursor.peek() == Some(':') {
                            self.cursor.bump();
                        } else {
                            return Err(self.unexpected("`:`"));
                        }
                        self.cursor.skip_trivia()?;
                        let value = self.parse_value(ValueCtx::DictValue)?;
                        children.push(first);
                        children.push(value);
                    }
                    self.cursor.skip_trivia()?;
                    match self.cursor.peek() {
                        Some(',') => {
                            self.cursor.bump();
                        }
                        Some('}') => {
                            self.cursor.bump();
                            break;
                        }
                        _ => return Err(self.unexpected("`,` or `}`")),
                    }
                }
            }
        }
        Ok(self.value_from(ValueKind::Dict, open, children, start))
    }

    fn parse_template_string(&mut self, start: Pos) -> Result<TagValue<'t>, ParseError> {
        let open = self.single_char_token();
        let mut children = Vec::new();
        let mut seg_start = self.cursor.pos();
        let mut decoded: Option<String> = None;
        loop {
            match self.cursor.peek() {
                None => {
                    return Err(LexError::UnterminatedTemplateString {
                        span: self.cursor.span_to_end(start),
                        line_col: start.line_col(),
                    }
                    .into());
                }
                Some('`') => {
                    self.flush_literal(&mut children, seg_start, decoded.take());
                    self.cursor.bump();
                    break;
                }
                Some('\\') => {
                    if decoded.is_none() {
                        decoded =
                            Some(self.cursor.source()[seg_start.offset..self.cursor.offset()].to_string());
                    }
                    self.cursor.bump();
                    let Some(escaped) = self.cursor.bump() else {
                        return Err(LexError::UnterminatedTemplateString {
                            span: self.cursor.span_to_end(start),
                            line_col: start.line_col(),
                        }
                        .into());
                    };
                    if let Some(buf) = decoded.as_mut() {
                        buf.push(decode_escape(escaped));
                    }
                }
                Some('$') if self.cursor.peek_second() == Some('{') => {
                    self.flush_literal(&mut children, seg_start, decoded.take());
                    self.cursor.bump_n(2);
                    self.cursor.skip_trivia()?;
                    if self.cursor.peek() == Some('}') {
                        let here = self.cursor.pos();
                        return Err(GrammarError::EmptyInterpolation {
                            span: self.here_span(),
                            line_col: here.line_col(),
                        }
                        .into());
                    }
                    let value = self.parse_value(ValueCtx::Interpolation)?;
                    self.cursor.skip_trivia()?;
                    if self.cursor.peek() == Some('}') {
                        self.cursor.bump();
                    } else {
                        return Err(GrammarError::UnclosedDelimiter {
                            delimiter: "${",
                            span: self.here_span(),
                            line_col: self.cursor.pos().line_col(),
                        }
                        .into());
                    }
                    children.push(value);
                    seg_start = self.cursor.pos();
                }
                Some(c) => {
                    self.cursor.bump();
                    if let Some(buf) = decoded.as_mut() {
                        buf.push(c);
                    }
                }
            }
        }
        Ok(self.value_from(ValueKind::TemplateString, open, children, start))
    }

    fn flush_literal(
        &self,
        children: &mut Vec<TagValue<'t>>,
        seg_start: Pos,
        decoded: Option<String>,
    ) {
        let raw = &self.cursor.source()[seg_start.offset..self.cursor.offset()];
        if raw.is_empty() {
            return;
        }
        let text = match decoded {
            Some(owned) => Cow::Owned(owned),
            None => Cow::Borrowed(raw),
        };
        let span = self.cursor.span_from(seg_start);
        children.push(TagValue {
            token: TagToken {
                token: text,
                span,
                line_col: seg_start.line_col(),
            },
            children: Vec::new(),
            kind: ValueKind::String,
            spread: None,
            filters: Vec::new(),
            source: raw,
            span,
            line_col: seg_start.line_col(),
        });
    }

    fn parse_filters(&mut self) -> Result<Vec<TagValueFilter<'t>>, ParseError> {
        let mut filters = Vec::new();
        loop {
            let checkpoint = self.cursor;
            self.cursor.skip_trivia()?;
            if self.cursor.peek() != Some('|') {
                self.cursor = checkpoint;
                break;
            }
            self.cursor.bump();
            self.cursor.skip_trivia()?;
            let name_start = self.cursor.pos();
            let Some(name) = self.cursor.scan_identifier() else {
                return Err(GrammarError::ExpectedFilterName {
                    span: self.here_span(),
                    line_col: name_start.line_col(),
                }
                .into());
            };
            // The argument colon binds tightly: `default:5` takes an
            // argument, `default : 5` does not.
            let arg = if self.cursor.peek() == Some(':') {
                self.cursor.bump();
                self.cursor.skip_trivia()?;
                Some(self.parse_primary()?)
            } else {
                None
            };
            filters.push(TagValueFilter {
                token: name,
                arg,
                span: self.cursor.span_from(name_start),
                line_col: name_start.line_col(),
            });
        }
        Ok(filters)
    }

    fn value_from(
        &self,
        kind: ValueKind,
        token: TagToken<'t>,
        children: Vec<TagValue<'t>>,
        start: Pos,
    ) -> TagValue<'t> {
        TagValue {
            token,
            children,
            kind,
            spread: None,
            filters: Vec::new(),
            source: self.cursor.slice_from(start),
            span: self.cursor.span_from(start),
            line_col: start.line_col(),
        }
    }

    fn single_char_token(&mut self) -> TagToken<'t> {
        let start = self.cursor.pos();
        self.cursor.bump();
        self.cursor.token_from(start)
    }

    fn here_span(&self) -> Span {
        match self.cursor.peek() {
            Some(c) => Span::saturating_from_bounds_usize(
                self.cursor.offset(),
                self.cursor.offset() + c.len_utf8(),
            ),
            None => Span::saturating_from_bounds_usize(self.cursor.offset(), self.cursor.offset()),
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let here = self.cursor.pos();
        match self.cursor.peek() {
            Some(c) => GrammarError::UnexpectedToken {
                expected,
                found: c,
                span: self.here_span(),
                line_col: here.line_col(),
            }
            .into(),
            None => GrammarError::UnexpectedEnd {
                expected,
                span: self.here_span(),
                line_col: here.line_col(),
            }
            .into(),
        }
    }
}
