use djc_source::Span;
use indexmap::IndexMap;
use thiserror::Error;

use crate::compile::CompiledTag;
use crate::plan::AttrOp;
use crate::plan::DictEntry;
use crate::plan::TemplatePart;
use crate::plan::ValueOp;
use crate::plan::ValuePlan;
use crate::resolver::Resolver;
use crate::value::Value;

/// The argument lists a tag handler receives: positional args in source
/// order, keyword pairs in source order (duplicates preserved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCallArgs {
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

impl TagCallArgs {
    /// The keyword pairs as an ordered mapping. Duplicate names keep their
    /// first position and their last value.
    #[must_use]
    pub fn kwargs_map(&self) -> IndexMap<String, Value> {
        let mut map = IndexMap::with_capacity(self.kwargs.len());
        for (name, value) in &self.kwargs {
            map.insert(name.clone(), value.clone());
        }
        map
    }
}

/// A failure while evaluating a compiled tag.
///
/// Resolver errors pass through unwrapped aside from the enum variant; the
/// other variants are spread-expansion shape mismatches, with the span of the
/// offending value.
#[derive(Debug, PartialEq, Error)]
pub enum EvalError<E> {
    #[error("{0}")]
    Resolver(E),

    #[error("spread value is not a list")]
    NotIterable { span: Span },

    #[error("spread value is not a dict")]
    NotAMapping { span: Span },

    #[error("keyword spread requires string keys")]
    NonStringKey { span: Span },
}

impl<E> EvalError<E> {
    /// The source span of the failing value, for everything but resolver
    /// errors.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            EvalError::Resolver(_) => None,
            EvalError::NotIterable { span }
            | EvalError::NotAMapping { span }
            | EvalError::NonStringKey { span } => Some(*span),
        }
    }
}

impl CompiledTag {
    /// Evaluate the plan against a context, producing the positional and
    /// keyword arguments for the tag handler.
    ///
    /// Attributes are processed in source order; spreads splice their
    /// elements in place. Invoking the same plan twice with resolvers that
    /// behave the same produces equal results.
    pub fn invoke<R: Resolver>(
        &self,
        ctx: &R::Context,
        resolver: &R,
    ) -> Result<TagCallArgs, EvalError<R::Error>> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();

        for op in &self.ops {
            match op {
                AttrOp::Positional(plan) => args.push(eval_value(plan, ctx, resolver)?),
                AttrOp::SpreadArgs(plan) => match eval_value(plan, ctx, resolver)? {
                    Value::List(items) => args.extend(items),
                    _ => return Err(EvalError::NotIterable { span: plan.span }),
                },
                AttrOp::Keyword { name, value } => {
                    let value = eval_value(value, ctx, resolver)?;
                    kwargs.push((name.clone(), value));
                }
                AttrOp::SpreadKwargs(plan) => match eval_value(plan, ctx, resolver)? {
                    Value::Dict(map) => {
                        for (key, value) in map {
                            match key {
                                Value::String(name) => kwargs.push((name, value)),
                                _ => return Err(EvalError::NonStringKey { span: plan.span }),
                            }
                        }
                    }
                    _ => return Err(EvalError::NotAMapping { span: plan.span }),
                },
                AttrOp::Flag { name } => kwargs.push((name.clone(), Value::Bool(true))),
            }
        }

        Ok(TagCallArgs { args, kwargs })
    }
}

fn eval_value<R: Resolver>(
    plan: &ValuePlan,
    ctx: &R::Context,
    resolver: &R,
) -> Result<Value, EvalError<R::Error>> {
    let mut acc = eval_op(&plan.op, ctx, resolver)?;
    for filter in &plan.filters {
        let arg = match &filter.arg {
            Some(arg_plan) => Some(eval_value(arg_plan, ctx, resolver)?),
            None => None,
        };
        acc = resolver
            .filter(ctx, &filter.name, acc, arg)
            .map_err(EvalError::Resolver)?;
    }
    Ok(acc)
}

fn eval_op<R: Resolver>(
    op: &ValueOp,
    ctx: &R::Context,
    resolver: &R,
) -> Result<Value, EvalError<R::Error>> {
    match op {
        ValueOp::Const(value) => Ok(value.clone()),
        ValueOp::Variable { path } => resolver.variable(ctx, path).map_err(EvalError::Resolver),
        ValueOp::Translation { text } => {
            resolver.translation(ctx, text).map_err(EvalError::Resolver)
        }
        ValueOp::TemplateString { parts } => {
            let mut out = String::new();
            for part in parts {
                match part {
                    TemplatePart::Literal(text) => out.push_str(text),
                    TemplatePart::Expr(source) => {
                        let value = resolver
                            .template_string(ctx, source)
                            .map_err(EvalError::Resolver)?;
                        out.push_str(&value.to_string());
                    }
                }
            }
            Ok(Value::String(out))
        }
        ValueOp::List { items } => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let value = eval_value(&item.plan, ctx, resolver)?;
                if item.splat {
                    match value {
                        Value::List(nested) => out.extend(nested),
                        _ => return Err(EvalError::NotIterable { span: item.plan.span }),
                    }
                } else {
                    out.push(value);
                }
            }
            Ok(Value::List(out))
        }
        ValueOp::Dict { entries } => {
            let mut out = IndexMap::new();
            for entry in entries {
                match entry {
                    DictEntry::Pair { key, value } => {
                        let key = eval_value(key, ctx, resolver)?;
                        let value = eval_value(value, ctx, resolver)?;
                        out.insert(key, value);
                    }
                    DictEntry::Splat(plan) => match eval_value(plan, ctx, resolver)? {
                        Value::Dict(nested) => {
                            for (key, value) in nested {
                                out.insert(key, value);
                            }
                        }
                        _ => return Err(EvalError::NotAMapping { span: plan.span }),
                    },
                }
            }
            Ok(Value::Dict(out))
        }
    }
}
