use std::marker::PhantomData;

use crate::value::Value;

/// The capability set a compiled tag calls back into at invocation time.
///
/// The compiler never evaluates variables, translations, template-string
/// expressions, or filters itself; it invokes these four hooks and assembles
/// the results. Errors returned by a resolver propagate out of
/// [`CompiledTag::invoke`](crate::CompiledTag::invoke) unchanged.
pub trait Resolver {
    type Context;
    type Error;

    /// Resolve a variable reference. `path` is the source lexeme, dots and
    /// bracket accessors included.
    fn variable(&self, ctx: &Self::Context, path: &str) -> Result<Value, Self::Error>;

    /// Evaluate a template-string interpolation. `expr` is the source text of
    /// the embedded expression.
    fn template_string(&self, ctx: &Self::Context, expr: &str) -> Result<Value, Self::Error>;

    /// Translate a literal string.
    fn translation(&self, ctx: &Self::Context, text: &str) -> Result<Value, Self::Error>;

    /// Apply a named filter. `arg` is `None` when the filter had no
    /// `:argument`.
    fn filter(
        &self,
        ctx: &Self::Context,
        name: &str,
        value: Value,
        arg: Option<Value>,
    ) -> Result<Value, Self::Error>;
}

/// Bundles four closures into a [`Resolver`], for callers that do not want to
/// name a type.
pub struct FnResolver<C, E, V, S, T, F> {
    variable: V,
    template_string: S,
    translation: T,
    filter: F,
    _marker: PhantomData<fn(&C) -> E>,
}

impl<C, E, V, S, T, F> FnResolver<C, E, V, S, T, F>
where
    V: Fn(&C, &str) -> Result<Value, E>,
    S: Fn(&C, &str) -> Result<Value, E>,
    T: Fn(&C, &str) -> Result<Value, E>,
    F: Fn(&C, &str, Value, Option<Value>) -> Result<Value, E>,
{
    pub fn new(variable: V, template_string: S, translation: T, filter: F) -> Self {
        Self {
            variable,
            template_string,
            translation,
            filter,
            _marker: PhantomData,
        }
    }
}

impl<C, E, V, S, T, F> Resolver for FnResolver<C, E, V, S, T, F>
where
    V: Fn(&C, &str) -> Result<Value, E>,
    S: Fn(&C, &str) -> Result<Value, E>,
    T: Fn(&C, &str) -> Result<Value, E>,
    F: Fn(&C, &str, Value, Option<Value>) -> Result<Value, E>,
{
    type Context = C;
    type Error = E;

    fn variable(&self, ctx: &C, path: &str) -> Result<Value, E> {
        (self.variable)(ctx, path)
    }

    fn template_string(&self, ctx: &C, expr: &str) -> Result<Value, E> {
        (self.template_string)(ctx, expr)
    }

    fn translation(&self, ctx: &C, text: &str) -> Result<Value, E> {
        (self.translation)(ctx, text)
    }

    fn filter(&self, ctx: &C, name: &str, value: Value, arg: Option<Value>) -> Result<Value, E> {
        (self.filter)(ctx, name, value, arg)
    }
}
