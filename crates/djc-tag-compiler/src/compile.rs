use djc_source::Span;
use djc_tag_parser::SpreadKind;
use djc_tag_parser::Tag;
use djc_tag_parser::TagAttr;
use djc_tag_parser::TagValue;
use djc_tag_parser::TagValueFilter;
use djc_tag_parser::ValueKind;
use serde::Serialize;
use thiserror::Error;

use crate::plan::AttrOp;
use crate::plan::DictEntry;
use crate::plan::FilterOp;
use crate::plan::ListItem;
use crate::plan::TemplatePart;
use crate::plan::ValueOp;
use crate::plan::ValuePlan;
use crate::value::Value;

/// A structural violation found while lowering an AST.
///
/// The parser never produces these shapes, but attribute lists can also be
/// built by hand; lowering re-checks the structure and reports the first
/// violation it finds.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum CompileError {
    #[error("flag attributes cannot carry a key")]
    FlagWithKey { span: Span },

    #[error("flag attributes must be a bare variable")]
    FlagNotVariable { span: Span },

    #[error("spread marker is not allowed in this position")]
    SpreadNotAllowed { span: Span },

    #[error("dict children must come in key/value pairs")]
    OddDictChildren { span: Span },

    #[error("translation values cannot have children")]
    TranslationWithChildren { span: Span },

    #[error("filter arguments cannot carry their own filters")]
    FilterArgHasFilters { span: Span },

    #[error("invalid numeric literal `{literal}`")]
    BadNumericLiteral { literal: String, span: Span },
}

impl CompileError {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            CompileError::FlagWithKey { span }
            | CompileError::FlagNotVariable { span }
            | CompileError::SpreadNotAllowed { span }
            | CompileError::OddDictChildren { span }
            | CompileError::TranslationWithChildren { span }
            | CompileError::FilterArgHasFilters { span }
            | CompileError::BadNumericLiteral { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            CompileError::FlagWithKey { .. } => "TAG-301",
            CompileError::FlagNotVariable { .. } => "TAG-302",
            CompileError::SpreadNotAllowed { .. } => "TAG-303",
            CompileError::OddDictChildren { .. } => "TAG-304",
            CompileError::TranslationWithChildren { .. } => "TAG-305",
            CompileError::FilterArgHasFilters { .. } => "TAG-306",
            CompileError::BadNumericLiteral { .. } => "TAG-307",
        }
    }
}

/// A tag lowered into an evaluation plan.
///
/// Owns everything it needs (constants decoded, paths and expression sources
/// copied out), so it can outlive the AST and the input buffer. Invoking it
/// walks the plan once; the AST is never revisited.
#[derive(Debug, Clone)]
pub struct CompiledTag {
    pub(crate) ops: Vec<AttrOp>,
}

/// Lower a parsed tag into a [`CompiledTag`].
pub fn compile_tag(tag: &Tag<'_>) -> Result<CompiledTag, CompileError> {
    compile_attrs(&tag.attrs)
}

/// Lower a bare attribute list into a [`CompiledTag`].
pub fn compile_attrs(attrs: &[TagAttr<'_>]) -> Result<CompiledTag, CompileError> {
    tracing::debug!(attrs = attrs.len(), "lowering tag attributes");
    let ops = attrs.iter().map(lower_attr).collect::<Result<_, _>>()?;
    Ok(CompiledTag { ops })
}

fn lower_attr(attr: &TagAttr<'_>) -> Result<AttrOp, CompileError> {
    if attr.is_flag {
        if attr.key.is_some() {
            return Err(CompileError::FlagWithKey { span: attr.span });
        }
        let value = &attr.value;
        if value.kind != ValueKind::Variable
            || !value.children.is_empty()
            || value.spread.is_some()
            || !value.filters.is_empty()
        {
            return Err(CompileError::FlagNotVariable { span: value.span });
        }
        return Ok(AttrOp::Flag {
            name: value.token.text().to_string(),
        });
    }

    match (&attr.key, attr.value.spread) {
        (Some(key), None) => Ok(AttrOp::Keyword {
            name: key.text().to_string(),
            value: lower_value(&attr.value)?,
        }),
        (Some(_), Some(_)) => Err(CompileError::SpreadNotAllowed {
            span: attr.value.span,
        }),
        (None, None) => Ok(AttrOp::Positional(lower_value(&attr.value)?)),
        (None, Some(SpreadKind::Dots | SpreadKind::Star)) => {
            Ok(AttrOp::SpreadArgs(lower_value(&attr.value)?))
        }
        (None, Some(SpreadKind::DoubleStar)) => {
            Ok(AttrOp::SpreadKwargs(lower_value(&attr.value)?))
        }
    }
}

fn lower_value(value: &TagValue<'_>) -> Result<ValuePlan, CompileError> {
    let op = match value.kind {
        ValueKind::Int => ValueOp::Const(Value::Int(parse_literal(value)?)),
        ValueKind::Float => ValueOp::Const(Value::Float(parse_literal(value)?)),
        ValueKind::String => ValueOp::Const(Value::String(value.token.text().to_string())),
        ValueKind::Variable => ValueOp::Variable {
            path: value.token.text().to_string(),
        },
        ValueKind::Translation => {
            if !value.children.is_empty() {
                return Err(CompileError::TranslationWithChildren { span: value.span });
            }
            ValueOp::Translation {
                text: value.token.text().to_string(),
            }
        }
        ValueKind::TemplateString => {
            let mut parts = Vec::with_capacity(value.children.len());
            for child in &value.children {
                if child.spread.is_some() {
                    return Err(CompileError::SpreadNotAllowed { span: child.span });
                }
                if child.kind == ValueKind::String && child.filters.is_empty() {
                    parts.push(TemplatePart::Literal(child.token.text().to_string()));
                } else {
                    parts.push(TemplatePart::Expr(child.source.to_string()));
                }
            }
            ValueOp::TemplateString { parts }
        }
        ValueKind::List => {
            let mut items = Vec::with_capacity(value.children.len());
            for child in &value.children {
                let splat = match child.spread {
                    None => false,
                    Some(SpreadKind::Dots) => true,
                    Some(_) => {
                        return Err(CompileError::SpreadNotAllowed { span: child.span });
                    }
                };
                items.push(ListItem {
                    plan: lower_value(child)?,
                    splat,
                });
            }
            ValueOp::List { items }
        }
        ValueKind::Dict => {
            let mut entries = Vec::new();
            let mut children = value.children.iter();
            while let Some(first) = children.next() {
                match first.spread {
                    Some(SpreadKind::DoubleStar) => {
                        entries.push(DictEntry::Splat(lower_value(first)?));
                    }
                    Some(_) => {
                        return Err(CompileError::SpreadNotAllowed { span: first.span });
                    }
                    None => {
                        let Some(pair_value) = children.next() else {
                            return Err(CompileError::OddDictChildren { span: value.span });
                        };
                        if pair_value.spread.is_some() {
                            return Err(CompileError::SpreadNotAllowed {
                                span: pair_value.span,
                            });
                        }
                        entries.push(DictEntry::Pair {
                            key: lower_value(first)?,
                            value: lower_value(pair_value)?,
                        });
                    }
                }
            }
            ValueOp::Dict { entries }
        }
    };

    let filters = value
        .filters
        .iter()
        .map(lower_filter)
        .collect::<Result<_, _>>()?;
    Ok(ValuePlan {
        op,
        filters,
        span: value.span,
    })
}

fn lower_filter(filter: &TagValueFilter<'_>) -> Result<FilterOp, CompileError> {
    let arg = match &filter.arg {
        Some(arg) => {
            if !arg.filters.is_empty() {
                return Err(CompileError::FilterArgHasFilters { span: arg.span });
            }
            if arg.spread.is_some() {
                return Err(CompileError::SpreadNotAllowed { span: arg.span });
            }
            Some(lower_value(arg)?)
        }
        None => None,
    };
    Ok(FilterOp {
        name: filter.token.text().to_string(),
        arg,
    })
}

fn parse_literal<T: std::str::FromStr>(value: &TagValue<'_>) -> Result<T, CompileError> {
    value
        .token
        .text()
        .parse()
        .map_err(|_| CompileError::BadNumericLiteral {
            literal: value.token.text().to_string(),
            span: value.span,
        })
}
