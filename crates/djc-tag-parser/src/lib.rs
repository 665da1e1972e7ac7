//! Parser for the body of a component template tag.
//!
//! Given the text between the outer delimiters of a tag (the inside of
//! `{% … %}` or `<… />`), [`parse_tag`] produces a [`Tag`]: the tag name plus
//! its attributes — positional values, `key=value` pairs, and boolean flags —
//! where every node carries its byte span and 1-based line/column.
//!
//! The expression language covers literals (`42`, `1.5e3`, `"text"`),
//! variables with dotted paths and `[…]` accessors, lists, dicts, translation
//! calls (`_("msg")`), backtick template strings with `${…}` interpolations,
//! spread markers (`...`, `*`, `**`), and `|filter:arg` chains. `{# … #}`
//! comments are skipped wherever whitespace is allowed.
//!
//! Parsing never evaluates anything; pair the AST with `djc-tag-compiler` to
//! turn it into callable argument lists.
//!
//! ## Example
//!
//! ```
//! use djc_tag_parser::{parse_tag, ValueKind};
//!
//! let tag = parse_tag("card title=\"Hi\" items=[1, 2] /").unwrap();
//! assert_eq!(tag.name.text(), "card");
//! assert!(tag.is_self_closing);
//! assert_eq!(tag.attrs.len(), 2);
//! assert_eq!(tag.attrs[1].value.kind, ValueKind::List);
//! ```

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::SpreadKind;
pub use ast::Tag;
pub use ast::TagAttr;
pub use ast::TagSyntax;
pub use ast::TagToken;
pub use ast::TagValue;
pub use ast::TagValueFilter;
pub use ast::ValueKind;
pub use error::GrammarError;
pub use error::LexError;
pub use error::ParseError;
pub use parser::ParseOptions;

/// Parse a tag body with default options: no flags, Django syntax.
pub fn parse_tag(input: &str) -> Result<Tag<'_>, ParseError> {
    parse_tag_with(input, &ParseOptions::default())
}

/// Parse a tag body with explicit flag names and syntax.
pub fn parse_tag_with<'t>(input: &'t str, options: &ParseOptions) -> Result<Tag<'t>, ParseError> {
    tracing::trace!(bytes = input.len(), syntax = ?options.syntax, "parsing tag body");
    parser::Parser::new(input, options).parse()
}
