//! Compiler for parsed component template tags.
//!
//! [`compile_tag`] lowers a [`Tag`](djc_tag_parser::Tag) (or a bare attribute
//! list, via [`compile_attrs`]) into a [`CompiledTag`]: an owned evaluation
//! plan with literals decoded up front. Invoking the plan with a context and
//! a [`Resolver`] produces [`TagCallArgs`] — the positional and keyword
//! arguments for the tag handler, in source order, with `...`/`*`/`**`
//! spreads spliced in place.
//!
//! Compile once, invoke many times: per-invocation cost is resolver calls and
//! container construction, never an AST walk.
//!
//! ## Example
//!
//! ```
//! use std::convert::Infallible;
//!
//! use djc_tag_compiler::{compile_tag, FnResolver, Value};
//! use djc_tag_parser::parse_tag;
//!
//! let tag = parse_tag("greet name=\"world\"").unwrap();
//! let compiled = compile_tag(&tag).unwrap();
//!
//! let resolver = FnResolver::new(
//!     |_: &(), path: &str| Ok::<_, Infallible>(Value::from(path)),
//!     |_, expr| Ok(Value::from(expr)),
//!     |_, text| Ok(Value::from(text)),
//!     |_, _, value, _| Ok(value),
//! );
//! let out = compiled.invoke(&(), &resolver).unwrap();
//! assert_eq!(out.kwargs, vec![("name".to_string(), Value::from("world"))]);
//! ```

mod compile;
mod eval;
mod plan;
mod resolver;
mod value;

pub use compile::compile_attrs;
pub use compile::compile_tag;
pub use compile::CompileError;
pub use compile::CompiledTag;
pub use eval::EvalError;
pub use eval::TagCallArgs;
pub use resolver::FnResolver;
pub use resolver::Resolver;
pub use value::Value;
