use djc_source::Span;

use crate::value::Value;

/// A lowered value expression: the operation plus its filter chain. The span
/// points back at the source for runtime error reporting.
#[derive(Debug, Clone)]
pub(crate) struct ValuePlan {
    pub op: ValueOp,
    pub filters: Vec<FilterOp>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub(crate) enum ValueOp {
    /// Literals decoded at compile time.
    Const(Value),
    Variable {
        path: String,
    },
    Translation {
        text: String,
    },
    TemplateString {
        parts: Vec<TemplatePart>,
    },
    List {
        items: Vec<ListItem>,
    },
    Dict {
        entries: Vec<DictEntry>,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum TemplatePart {
    Literal(String),
    /// An embedded expression, kept as its source text for the
    /// `template_string` resolver.
    Expr(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ListItem {
    pub plan: ValuePlan,
    /// `...element` — the evaluated list is spliced in element-wise.
    pub splat: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum DictEntry {
    Pair { key: ValuePlan, value: ValuePlan },
    /// `**mapping` — entries merge in, later keys overwriting earlier.
    Splat(ValuePlan),
}

#[derive(Debug, Clone)]
pub(crate) struct FilterOp {
    pub name: String,
    pub arg: Option<ValuePlan>,
}

/// One step per tag attribute, in source order.
#[derive(Debug, Clone)]
pub(crate) enum AttrOp {
    Positional(ValuePlan),
    /// `...value` / `*value` — splice an iterable into the positional args.
    SpreadArgs(ValuePlan),
    Keyword {
        name: String,
        value: ValuePlan,
    },
    /// `**value` — splice a mapping into the keyword pairs.
    SpreadKwargs(ValuePlan),
    Flag {
        name: String,
    },
}
