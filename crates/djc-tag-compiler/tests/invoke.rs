//! End-to-end tests: parse a tag body, lower it, and invoke the plan with
//! map-backed resolvers.

use std::fmt;

use djc_tag_compiler::compile_tag;
use djc_tag_compiler::EvalError;
use djc_tag_compiler::Resolver;
use djc_tag_compiler::Value;
use djc_tag_parser::parse_tag;
use djc_tag_parser::parse_tag_with;
use djc_tag_parser::ParseOptions;
use indexmap::IndexMap;
use rstest::rstest;

#[derive(Clone, Debug, PartialEq, Eq)]
struct ResolveError(String);

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ResolveError {}

/// Resolves variables and translations from maps; template-string
/// expressions fall back to a `«source»` marker so tests can observe the
/// exact text handed over.
#[derive(Default)]
struct TestResolver {
    variables: IndexMap<String, Value>,
    translations: IndexMap<String, String>,
}

impl TestResolver {
    fn new() -> Self {
        Self::default()
    }

    fn var(mut self, name: &str, value: Value) -> Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    fn translate(mut self, from: &str, to: &str) -> Self {
        self.translations.insert(from.to_string(), to.to_string());
        self
    }
}

impl Resolver for TestResolver {
    type Context = ();
    type Error = ResolveError;

    fn variable(&self, _: &(), path: &str) -> Result<Value, ResolveError> {
        self.variables
            .get(path)
            .cloned()
            .ok_or_else(|| ResolveError(format!("unknown variable `{path}`")))
    }

    fn template_string(&self, _: &(), expr: &str) -> Result<Value, ResolveError> {
        Ok(self
            .variables
            .get(expr)
            .cloned()
            .unwrap_or_else(|| Value::from(format!("\u{ab}{expr}\u{bb}"))))
    }

    fn translation(&self, _: &(), text: &str) -> Result<Value, ResolveError> {
        self.translations
            .get(text)
            .cloned()
            .map(Value::from)
            .ok_or_else(|| ResolveError(format!("no translation for `{text}`")))
    }

    fn filter(
        &self,
        _: &(),
        name: &str,
        value: Value,
        arg: Option<Value>,
    ) -> Result<Value, ResolveError> {
        match name {
            "add" => match (value, arg) {
                (Value::Int(a), Some(Value::Int(b))) => Ok(Value::Int(a + b)),
                _ => Err(ResolveError("add requires integers".to_string())),
            },
            "upper" => match value {
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                _ => Err(ResolveError("upper requires a string".to_string())),
            },
            "default" => match value {
                Value::None => Ok(arg.unwrap_or(Value::None)),
                other => Ok(other),
            },
            _ => Err(ResolveError(format!("unknown filter `{name}`"))),
        }
    }
}

fn kw(name: &str, value: Value) -> (String, Value) {
    (name.to_string(), value)
}

fn invoke(input: &str, resolver: &TestResolver) -> djc_tag_compiler::TagCallArgs {
    let tag = parse_tag(input).unwrap();
    let compiled = compile_tag(&tag).unwrap();
    compiled.invoke(&(), resolver).unwrap()
}

#[test]
fn name_only_yields_nothing() {
    let out = invoke("my_tag", &TestResolver::new());
    assert!(out.args.is_empty());
    assert!(out.kwargs.is_empty());
}

#[test]
fn self_closing_changes_nothing_for_args() {
    let tag = parse_tag("my_tag /").unwrap();
    assert!(tag.is_self_closing);
    let out = compile_tag(&tag)
        .unwrap()
        .invoke(&(), &TestResolver::new())
        .unwrap();
    assert!(out.args.is_empty());
    assert!(out.kwargs.is_empty());
}

#[test]
fn mixed_args_kwargs_and_spreads() {
    let resolver = TestResolver::new()
        .var("val1", Value::List(vec![Value::from("x"), Value::from("y")]))
        .var("b", Value::from("bar"));
    let input = "my_tag ...[val1] a=b [1, 2, 3] data={\"key\": \"value\"} /";
    let tag = parse_tag(input).unwrap();
    assert!(tag.is_self_closing);
    let out = compile_tag(&tag).unwrap().invoke(&(), &resolver).unwrap();

    // The literal list has one element (the resolved `val1`), so the splat
    // contributes that single element.
    assert_eq!(
        out.args,
        vec![
            Value::List(vec![Value::from("x"), Value::from("y")]),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        ]
    );
    assert_eq!(
        out.kwargs,
        vec![
            kw("a", Value::from("bar")),
            kw("data", Value::dict([("key", "value")])),
        ]
    );
}

#[test]
fn filters_apply_with_arguments() {
    let out = invoke("t x=1|add:2", &TestResolver::new());
    assert_eq!(out.kwargs, vec![kw("x", Value::Int(3))]);
}

#[test]
fn filters_chain_left_to_right() {
    let resolver = TestResolver::new().var("name", Value::None);
    let out = invoke("t name|default:'guest'|upper", &resolver);
    assert_eq!(out.args, vec![Value::from("GUEST")]);
}

#[test]
fn translations_resolve() {
    let resolver = TestResolver::new().translate("hello", "HOLA");
    let out = invoke("t _(\"hello\") name=\"world\"", &resolver);
    assert_eq!(out.args, vec![Value::from("HOLA")]);
    assert_eq!(out.kwargs, vec![kw("name", Value::from("world"))]);
}

#[test]
fn kwarg_spread_preserves_source_order() {
    let resolver =
        TestResolver::new().var("cfg", Value::dict([("a", Value::Int(1)), ("b", Value::Int(2))]));
    let out = invoke("t **cfg x=1", &resolver);
    assert_eq!(
        out.kwargs,
        vec![
            kw("a", Value::Int(1)),
            kw("b", Value::Int(2)),
            kw("x", Value::Int(1)),
        ]
    );
}

#[test]
fn iterable_spread_flattens_into_args() {
    let resolver = TestResolver::new()
        .var("items", Value::List(vec![Value::Int(1), Value::Int(2)]))
        .var("x", Value::from("last"));
    let out = invoke("t ...items x", &resolver);
    assert_eq!(
        out.args,
        vec![Value::Int(1), Value::Int(2), Value::from("last")]
    );
}

#[rstest]
#[case("t ...items")]
#[case("t *items")]
fn iterable_spread_markers_are_synonyms(#[case] input: &str) {
    let resolver =
        TestResolver::new().var("items", Value::List(vec![Value::Int(1), Value::Int(2)]));
    let out = invoke(input, &resolver);
    assert_eq!(out.args, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn list_splat_inlines_elements() {
    let resolver =
        TestResolver::new().var("rest", Value::List(vec![Value::Int(2), Value::Int(3)]));
    let out = invoke("t [1, ...rest, 4]", &resolver);
    assert_eq!(
        out.args,
        vec![Value::List(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
        ])]
    );
}

#[test]
fn dict_splat_merges_with_later_keys_winning() {
    let resolver = TestResolver::new().var(
        "m",
        Value::dict([("a", Value::Int(10)), ("b", Value::Int(2))]),
    );
    let out = invoke("t d={\"a\": 1, **m, \"z\": 9}", &resolver);
    let expected = Value::dict([
        ("a", Value::Int(10)),
        ("b", Value::Int(2)),
        ("z", Value::Int(9)),
    ]);
    assert_eq!(out.kwargs, vec![kw("d", expected)]);
}

#[test]
fn template_strings_concatenate() {
    let resolver = TestResolver::new().var("name", Value::from("World"));
    let out = invoke("t msg=`Hello ${name}!`", &resolver);
    assert_eq!(out.kwargs, vec![kw("msg", Value::from("Hello World!"))]);
}

#[test]
fn template_string_expressions_pass_their_source() {
    let out = invoke("t `${count|default:0}`", &TestResolver::new());
    assert_eq!(out.args, vec![Value::from("\u{ab}count|default:0\u{bb}")]);
}

#[test]
fn template_string_stringifies_values() {
    let resolver = TestResolver::new()
        .var("n", Value::Int(3))
        .var("ok", Value::Bool(true));
    let out = invoke("t `${n} of ${ok}`", &resolver);
    assert_eq!(out.args, vec![Value::from("3 of True")]);
}

#[test]
fn flags_become_true_kwargs() {
    let options = ParseOptions::new().flag("only");
    let tag = parse_tag_with("comp a=1 only", &options).unwrap();
    let out = compile_tag(&tag)
        .unwrap()
        .invoke(&(), &TestResolver::new())
        .unwrap();
    assert_eq!(
        out.kwargs,
        vec![kw("a", Value::Int(1)), kw("only", Value::Bool(true))]
    );
}

#[test]
fn repeated_invocations_are_equal() {
    let resolver = TestResolver::new()
        .var("user", Value::from("ada"))
        .var("cfg", Value::dict([("a", Value::Int(1))]));
    let tag = parse_tag("t user **cfg x=1|add:2").unwrap();
    let compiled = compile_tag(&tag).unwrap();
    let first = compiled.invoke(&(), &resolver).unwrap();
    let second = compiled.invoke(&(), &resolver).unwrap();
    assert_eq!(first, second);
}

#[test]
fn kwargs_map_collapses_duplicates() {
    let out = invoke("t x=1 x=2", &TestResolver::new());
    assert_eq!(out.kwargs, vec![kw("x", Value::Int(1)), kw("x", Value::Int(2))]);
    let map = out.kwargs_map();
    assert_eq!(map.len(), 1);
    assert_eq!(map["x"], Value::Int(2));
}

#[test]
fn compiled_plans_outlive_the_input() {
    let compiled = {
        let input = String::from("t x=1");
        let tag = parse_tag(&input).unwrap();
        compile_tag(&tag).unwrap()
    };
    let out = compiled.invoke(&(), &TestResolver::new()).unwrap();
    assert_eq!(out.kwargs, vec![kw("x", Value::Int(1))]);
}

mod failures {
    use super::*;

    #[test]
    fn spreading_a_non_list_fails() {
        let resolver = TestResolver::new().var("num", Value::Int(5));
        let tag = parse_tag("t ...num").unwrap();
        let err = compile_tag(&tag).unwrap().invoke(&(), &resolver).unwrap_err();
        assert!(matches!(err, EvalError::NotIterable { .. }));
        assert!(err.span().is_some());
    }

    #[test]
    fn kwarg_spreading_a_non_dict_fails() {
        let resolver = TestResolver::new().var("lst", Value::List(vec![]));
        let tag = parse_tag("t **lst").unwrap();
        let err = compile_tag(&tag).unwrap().invoke(&(), &resolver).unwrap_err();
        assert!(matches!(err, EvalError::NotAMapping { .. }));
    }

    #[test]
    fn kwarg_spread_requires_string_keys() {
        let resolver = TestResolver::new().var(
            "m",
            Value::dict([(Value::Int(1), Value::from("x"))]),
        );
        let tag = parse_tag("t **m").unwrap();
        let err = compile_tag(&tag).unwrap().invoke(&(), &resolver).unwrap_err();
        assert!(matches!(err, EvalError::NonStringKey { .. }));
    }

    #[test]
    fn resolver_errors_pass_through() {
        let tag = parse_tag("t missing").unwrap();
        let err = compile_tag(&tag)
            .unwrap()
            .invoke(&(), &TestResolver::new())
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::Resolver(ResolveError("unknown variable `missing`".to_string()))
        );
        assert_eq!(err.to_string(), "unknown variable `missing`");
    }

    #[test]
    fn filter_errors_pass_through() {
        let err = compile_tag(&parse_tag("t 'x'|add:2").unwrap())
            .unwrap()
            .invoke(&(), &TestResolver::new())
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::Resolver(ResolveError("add requires integers".to_string()))
        );
    }
}
