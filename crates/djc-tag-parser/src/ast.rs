use std::borrow::Cow;
use std::fmt;
use std::fmt::Write as _;

use djc_source::LineCol;
use djc_source::Span;
use serde::Serialize;

/// Which outer delimiter family a tag body came from.
///
/// The parser never sees the delimiters themselves; the syntax only decides
/// whether bare identifier attributes default to boolean flags (HTML
/// boolean-attribute behavior) and is carried through on the parsed [`Tag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSyntax {
    #[default]
    Django,
    Html,
}

/// A single lexeme with its source position.
///
/// `token` equals the covered input slice, except for quoted strings where it
/// is the unquoted payload with escapes decoded (the span still covers the
/// quotes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagToken<'t> {
    pub token: Cow<'t, str>,
    pub span: Span,
    pub line_col: LineCol,
}

impl TagToken<'_> {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn start_index(&self) -> usize {
        self.span.start_usize()
    }

    #[must_use]
    pub fn end_index(&self) -> usize {
        self.span.end_usize()
    }
}

/// Discriminates the shape of a [`TagValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    List,
    Dict,
    Int,
    Float,
    Variable,
    TemplateString,
    Translation,
    String,
}

/// A spread marker prefixing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadKind {
    /// `...` — splat into positional args or into a list.
    Dots,
    /// `*` — iterable-splat into positional args.
    Star,
    /// `**` — mapping-splat into keyword args or into a dict.
    DoubleStar,
}

impl SpreadKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpreadKind::Dots => "...",
            SpreadKind::Star => "*",
            SpreadKind::DoubleStar => "**",
        }
    }
}

impl fmt::Display for SpreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter application chained onto a value with `|`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagValueFilter<'t> {
    /// The filter name lexeme.
    pub token: TagToken<'t>,
    /// The optional `:argument`, a primary with no filters of its own.
    pub arg: Option<TagValue<'t>>,
    pub span: Span,
    pub line_col: LineCol,
}

/// An expression node inside a tag body.
///
/// `token` is the primary lexeme; for composites (lists, dicts, template
/// strings) it is the opening bracket, brace, or backtick. Structure by
/// [`ValueKind`]:
///
/// - `String`, `Int`, `Float`, `Variable`, `Translation`: no children.
/// - `TemplateString`: children are the interpolation fragments in order —
///   literal segments as `String` values, embedded expressions as arbitrary
///   values.
/// - `List`: children are the elements in source order; an element may carry
///   a `...` spread.
/// - `Dict`: children alternate key, value, key, value; a child with a `**`
///   spread stands alone, without a key partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagValue<'t> {
    pub token: TagToken<'t>,
    pub children: Vec<TagValue<'t>>,
    pub kind: ValueKind,
    pub spread: Option<SpreadKind>,
    pub filters: Vec<TagValueFilter<'t>>,
    /// The exact input slice this node covers, spread marker through the last
    /// filter.
    pub source: &'t str,
    pub span: Span,
    pub line_col: LineCol,
}

/// One tag argument: positional, `key=value`, or a boolean flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagAttr<'t> {
    pub key: Option<TagToken<'t>>,
    pub value: TagValue<'t>,
    pub is_flag: bool,
    pub span: Span,
    pub line_col: LineCol,
}

impl TagAttr<'_> {
    /// The key for keyword attributes, or the flag name for flags.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        if self.is_flag {
            return Some(self.value.token.text());
        }
        self.key.as_ref().map(TagToken::text)
    }
}

/// A parsed tag body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag<'t> {
    pub name: TagToken<'t>,
    pub attrs: Vec<TagAttr<'t>>,
    pub is_self_closing: bool,
    pub syntax: TagSyntax,
    pub span: Span,
    pub line_col: LineCol,
}

impl<'t> Tag<'t> {
    /// The first attribute whose key or flag name matches `name`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&TagAttr<'t>> {
        self.attrs.iter().find(|attr| attr.name() == Some(name))
    }

    /// Positional (keyless, non-flag) attributes in source order.
    pub fn positional(&self) -> impl Iterator<Item = &TagAttr<'t>> {
        self.attrs.iter().filter(|attr| attr.key.is_none() && !attr.is_flag)
    }

    /// A canonical source rendering of this tag.
    ///
    /// Reparsing the result yields a structurally identical tag, modulo
    /// spans: strings come back double-quoted, separators normalized, and
    /// comments dropped.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.text())?;
        for attr in &self.attrs {
            write!(f, " {attr}")?;
        }
        if self.is_self_closing {
            f.write_str(" /")?;
        }
        Ok(())
    }
}

impl fmt::Display for TagAttr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(key) = &self.key {
            write!(f, "{}={}", key.text(), self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl fmt::Display for TagValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(marker) = self.spread {
            f.write_str(marker.as_str())?;
        }
        match self.kind {
            ValueKind::Int | ValueKind::Float | ValueKind::Variable => {
                f.write_str(self.token.text())?;
            }
            ValueKind::String => write_quoted(f, self.token.text())?,
            ValueKind::Translation => {
                f.write_str("_(")?;
                write_quoted(f, self.token.text())?;
                f.write_str(")")?;
            }
            ValueKind::TemplateString => {
                f.write_str("`")?;
                for child in &self.children {
                    if child.kind == ValueKind::String && child.filters.is_empty() {
                        write_template_literal(f, child.token.text())?;
                    } else {
                        write!(f, "${{{child}}}")?;
                    }
                }
                f.write_str("`")?;
            }
            ValueKind::List => {
                f.write_str("[")?;
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("]")?;
            }
            ValueKind::Dict => {
                f.write_str("{")?;
                let mut first = true;
                let mut children = self.children.iter();
                while let Some(child) = children.next() {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    if child.spread == Some(SpreadKind::DoubleStar) {
                        write!(f, "{child}")?;
                    } else {
                        write!(f, "{child}: ")?;
                        if let Some(value) = children.next() {
                            write!(f, "{value}")?;
                        }
                    }
                }
                f.write_str("}")?;
            }
        }
        for filter in &self.filters {
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TagValueFilter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}", self.token.text())?;
        if let Some(arg) = &self.arg {
            write!(f, ":{arg}")?;
        }
        Ok(())
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            _ => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn write_template_literal(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' => f.write_str("\\`")?,
            '\\' => f.write_str("\\\\")?,
            '$' if chars.peek() == Some(&'{') => f.write_str("\\$")?,
            _ => f.write_char(c)?,
        }
    }
    Ok(())
}
