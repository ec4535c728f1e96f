//! End-to-end tests for the function catalog: source text through the parser,
//! the evaluation scope and the stdlib registry

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use rhcl_parser::parse_expression;
use rhcl_runtime::{
    DataProvider, DiagnosticKind, Diagnostics, FunctionRegistry, NoData, Scope, ScopeOptions,
    StaticData, Type, Value,
};
use rhcl_stdlib::stdlib_registry;

fn fixture_dir() -> PathBuf {
    PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/functions-test"
    ))
}

fn registry() -> FunctionRegistry {
    stdlib_registry().expect("stdlib registers without duplicates")
}

fn eval_with(
    provider: &dyn DataProvider,
    options: ScopeOptions,
    source: &str,
) -> (Value, Diagnostics) {
    let registry = registry();
    Scope::new(&registry, provider)
        .with_options(options)
        .eval_source(source, &Type::Dynamic)
}

fn eval(source: &str) -> (Value, Diagnostics) {
    eval_with(&NoData, ScopeOptions::new().base_dir(fixture_dir()), source)
}

fn eval_ok(source: &str) -> Value {
    let (value, diags) = eval(source);
    assert!(diags.is_empty(), "{}: {:?}", source, diags);
    value
}

fn kinds(diags: &Diagnostics) -> Vec<DiagnosticKind> {
    diags.iter().map(|d| d.kind).collect()
}

fn s(v: &str) -> Value {
    Value::from(v)
}

fn strings(items: &[&str]) -> Vec<Value> {
    items.iter().map(|v| s(v)).collect()
}

fn string_list(items: &[&str]) -> Value {
    Value::list_of(Type::String, strings(items))
}

fn entries<const N: usize>(pairs: [(&str, Value); N]) -> BTreeMap<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// One representative call per catalog function
fn catalog_cases() -> Vec<(&'static str, Value)> {
    vec![
        ("abs(-1)", Value::int(1)),
        ("ceil(1.2)", Value::int(2)),
        ("floor(1.8)", Value::int(1)),
        ("max(1, 5, 3)", Value::int(5)),
        ("min(1, 5, 3)", Value::int(1)),
        ("signum(-4)", Value::int(-1)),
        (r#"cidrhost("192.168.1.0/24", 5)"#, s("192.168.1.5")),
        (r#"cidrnetmask("192.168.1.0/24")"#, s("255.255.255.0")),
        (r#"cidrsubnet("192.168.2.0/20", 4, 6)"#, s("192.168.6.0/24")),
        (
            r#"chunklist(["a", "b", "c"], 1)"#,
            Value::list(vec![
                string_list(&["a"]),
                string_list(&["b"]),
                string_list(&["c"]),
            ]),
        ),
        (r#"coalesce("first", "second", "third")"#, s("first")),
        (
            r#"coalescelist(["first", "second"], ["third", "fourth"])"#,
            string_list(&["first", "second"]),
        ),
        (r#"compact(["test", "", "test"])"#, string_list(&["test", "test"])),
        (r#"concat(["a"], ["b", "c"])"#, string_list(&["a", "b", "c"])),
        (r#"contains(["a", "b"], "a")"#, Value::from(true)),
        (r#"distinct(["a", "b", "a", "b"])"#, string_list(&["a", "b"])),
        (r#"element(["hello"], 0)"#, s("hello")),
        (r#"file("hello.txt")"#, s("hello!")),
        (r#"fileexists("hello.txt")"#, Value::from(true)),
        (
            r#"flatten([tolist(["a", "b"]), tolist(["c", "d"])])"#,
            string_list(&["a", "b", "c", "d"]),
        ),
        (r#"index(["a", "b", "c"], "a")"#, Value::int(0)),
        (
            r#"keys({"hello" = 1, "goodbye" = 42})"#,
            Value::tuple(strings(&["goodbye", "hello"])),
        ),
        (r#"length(["the", "quick", "brown", "bear"])"#, Value::int(4)),
        (r#"list("hello")"#, string_list(&["hello"])),
        (r#"lookup({hello = 1, goodbye = 42}, "goodbye")"#, Value::int(42)),
        (
            r#"map("hello", "world")"#,
            Value::map_of(Type::String, entries([("hello", s("world"))])),
        ),
        (
            r#"matchkeys(["a", "b", "c"], ["ref1", "ref2", "ref3"], ["ref1"])"#,
            string_list(&["a"]),
        ),
        (
            r#"merge({"a" = "b"}, {"c" = "d"})"#,
            Value::object(entries([("a", s("b")), ("c", s("d"))])),
        ),
        (r#"pathexpand("/etc/hosts")"#, s("/etc/hosts")),
        (
            r#"reverse(["a", true, 0])"#,
            Value::tuple(vec![Value::int(0), Value::from(true), s("a")]),
        ),
        (
            r#"setproduct(["development", "staging", "production"], ["app1", "app2"])"#,
            Value::list(vec![
                Value::tuple(strings(&["development", "app1"])),
                Value::tuple(strings(&["development", "app2"])),
                Value::tuple(strings(&["staging", "app1"])),
                Value::tuple(strings(&["staging", "app2"])),
                Value::tuple(strings(&["production", "app1"])),
                Value::tuple(strings(&["production", "app2"])),
            ]),
        ),
        (r#"slice(["a", "b", "c", "d"], 1, 3)"#, string_list(&["b", "c"])),
        (
            r#"transpose({"a" = ["1", "2"], "b" = ["2", "3"]})"#,
            Value::map(entries([
                ("1", string_list(&["a"])),
                ("2", string_list(&["a", "b"])),
                ("3", string_list(&["b"])),
            ])),
        ),
        (
            r#"values({"hello" = "world", "what's" = "up"})"#,
            Value::tuple(strings(&["world", "up"])),
        ),
        (
            r#"zipmap(["hello", "bar"], ["world", "baz"])"#,
            Value::object(entries([("bar", s("baz")), ("hello", s("world"))])),
        ),
        (r#"tolist(["a"])"#, string_list(&["a"])),
        (
            r#"toset(["b", "a", "b"])"#,
            Value::set_of(Type::String, strings(&["a", "b"])),
        ),
        (
            "tomap({a = 1})",
            Value::map_of(Type::Number, entries([("a", Value::int(1))])),
        ),
        ("tostring(5)", s("5")),
        (r#"tonumber("5")"#, Value::int(5)),
        (r#"tobool("true")"#, Value::from(true)),
        (r#"join(", ", ["a", "b"], ["c"])"#, s("a, b, c")),
        (r#"split(",", "a,b")"#, string_list(&["a", "b"])),
        (r#"upper("hello")"#, s("HELLO")),
        (r#"lower("HELLO")"#, s("hello")),
    ]
}

#[test]
fn catalog_examples() {
    for (source, expected) in catalog_cases() {
        assert_eq!(eval_ok(source), expected, "{}", source);
    }
}

#[test]
fn every_registered_function_has_a_working_example() {
    let covered: BTreeSet<&str> = catalog_cases()
        .into_iter()
        .filter_map(|(source, _)| source.split_once('(').map(|(name, _)| name))
        .collect();
    let registry = registry();
    for name in registry.names() {
        assert!(covered.contains(name), "no example for {}", name);
    }
    assert_eq!(covered.len(), registry.len());
}

#[test]
fn zero_arguments_never_panic() {
    let registry = registry();
    for function in registry.iter() {
        let source = format!("{}()", function.name);
        let (_, diags) = eval(&source);
        if function.required_args() > 0 {
            assert_eq!(kinds(&diags), vec![DiagnosticKind::Arity], "{}", source);
            assert_eq!(
                diags.first().map(|d| d.summary.as_str()),
                Some("Not enough function arguments")
            );
        }
    }

    for source in ["max()", "min()", "setproduct()", "join()", "concat()", "coalescelist()"] {
        let (_, diags) = eval(source);
        assert_eq!(kinds(&diags), vec![DiagnosticKind::Arity], "{}", source);
    }
    // No minimum, but nothing to pick from either
    let (_, diags) = eval("coalesce()");
    assert_eq!(kinds(&diags), vec![DiagnosticKind::FunctionExecution]);
}

#[test]
fn variadic_minimums_are_arity_errors() {
    let (_, diags) = eval(r#"setproduct(["a"])"#);
    let rendered: Vec<String> = diags.iter().map(|d| d.detail.clone()).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r#"Function "setproduct" expects at least 2 argument(s). Missing value for "sets"."#);

    let (_, diags) = eval(r#"join(",")"#);
    assert_eq!(kinds(&diags), vec![DiagnosticKind::Arity]);

    // Expansion counts toward the minimum
    let (_, diags) = eval("max([]...)");
    assert_eq!(kinds(&diags), vec![DiagnosticKind::Arity]);
    assert_eq!(eval_ok("max([4, 9]...)"), Value::int(9));
}

#[test]
fn oversized_numbers_are_rejected() {
    let (value, diags) = eval("ceil(1.5e300000000)");
    assert_eq!(value, Value::dynamic());
    assert_eq!(kinds(&diags), vec![DiagnosticKind::Parse]);

    let (_, diags) = eval(r#"tonumber("1e-999999999")"#);
    assert_eq!(kinds(&diags), vec![DiagnosticKind::TypeConversion]);

    // Large but bounded exponents are already whole numbers
    assert_eq!(eval_ok("ceil(1.5e300)"), eval_ok("1.5e300"));
    assert_eq!(eval_ok("floor(-2e40)"), eval_ok("-2e40"));
}

#[test]
fn contains_treats_lists_and_sets_alike() {
    assert_eq!(eval_ok(r#"contains(["a", "b"], "a")"#), Value::from(true));
    assert_eq!(eval_ok(r#"contains(toset(["a", "b"]), "a")"#), Value::from(true));
    assert_eq!(eval_ok(r#"contains(toset(["a", "b"]), "c")"#), Value::from(false));
    assert_eq!(eval_ok(r#"contains([1, 2], "2")"#), Value::from(true));
}

#[test]
fn set_round_trip_is_deterministic() {
    let source = r#"tolist(toset(["c", "a", "b", "a"]))"#;
    let first = eval_ok(source);
    let second = eval_ok(source);
    assert_eq!(first, second);
    assert_eq!(first, string_list(&["a", "b", "c"]));

    let mixed = eval_ok(r#"tolist(toset([true, 1, "x"]))"#);
    insta::assert_snapshot!(mixed.to_string(), @r#"tolist(["1", "true", "x"])"#);
}

#[test]
fn unknown_arguments_propagate() {
    let mut data = StaticData::new();
    data.mark_pending("x");
    data.mark_pending("y");
    let cases = [
        (r#"upper(x)"#, Value::unknown(Type::String)),
        (r#"cidrhost(x, 1)"#, Value::unknown(Type::String)),
        (r#"contains(["a"], x)"#, Value::unknown(Type::Bool)),
        (r#"element(x, 0)"#, Value::dynamic()),
        (r#"length(x)"#, Value::unknown(Type::Number)),
        (r#"length([x, x])"#, Value::int(2)),
        // Unknown members may or may not collapse once known
        (r#"toset([x, y])"#, Value::unknown(Type::set(Type::Dynamic))),
        (r#"toset(["a", x])"#, Value::unknown(Type::set(Type::String))),
        (r#"length(toset([x, y]))"#, Value::unknown(Type::Number)),
        (r#"length(tolist(toset([x, y])))"#, Value::unknown(Type::Number)),
        (r#"file(x)"#, Value::unknown(Type::String)),
        (r#"keys({a = x})"#, Value::unknown(Type::Tuple(vec![Type::String]))),
        (r#"join(",", [x])"#, Value::unknown(Type::String)),
    ];
    for (source, expected) in cases {
        let (value, diags) = eval_with(&data, ScopeOptions::new(), source);
        assert!(diags.is_empty(), "{}: {:?}", source, diags);
        assert_eq!(value, expected, "{}", source);
    }
}

#[test]
fn file_resolves_against_base_dir() {
    let (value, diags) = eval(r#"file("missing.txt")"#);
    assert_eq!(value, Value::unknown(Type::String));
    assert_eq!(kinds(&diags), vec![DiagnosticKind::ResourceNotFound]);
    assert_eq!(eval_ok(r#"fileexists("missing.txt")"#), Value::from(false));

    // Without the base directory the relative path does not resolve
    let (_, diags) = eval_with(&NoData, ScopeOptions::new(), r#"file("hello.txt")"#);
    assert_eq!(kinds(&diags), vec![DiagnosticKind::ResourceNotFound]);

    let absolute = fixture_dir().join("hello.txt");
    let source = format!("file({:?})", absolute.display().to_string());
    assert_eq!(eval_ok(&source), s("hello!"));
}

#[test]
fn pure_scopes_skip_file_reads() {
    let options = ScopeOptions::new().base_dir(fixture_dir()).pure_only(true);
    let (value, diags) = eval_with(&NoData, options, r#"upper(file("hello.txt"))"#);
    assert!(diags.is_empty());
    assert_eq!(value, Value::unknown(Type::String));
}

#[test]
fn function_errors_are_reported_in_order() {
    let source = r#"[zipmap(["a"], ["b", "c"]), element([], 0), nope()]"#;
    let (value, diags) = eval(source);
    assert_eq!(value.length(), Some(3));
    let rendered: Vec<String> = diags.iter().map(|d| d.render(source)).collect();
    insta::assert_snapshot!(rendered.join("\n"), @r#"
    Error: Error in function call
      on line 1, column 2:
      Call to function "zipmap" failed: number of keys (1) does not match number of values (2).
    Error: Error in function call
      on line 1, column 29:
      Call to function "element" failed: cannot use element function with an empty list.
    Error: Call to unknown function
      on line 1, column 45:
      There is no function named "nope".
    "#);
}

#[test]
fn argument_errors_name_the_parameter() {
    let source = r#"cidrsubnet("192.168.2.0/20", 4, 16)"#;
    let (_, diags) = eval(source);
    insta::assert_snapshot!(diags.iter().map(|d| d.render(source)).collect::<String>(), @r#"
    Error: Invalid function argument
      on line 1, column 33:
      Invalid value for "netnum" parameter of function "cidrsubnet": prefix extension of 4 does not accommodate a subnet numbered 16.
    "#);

    let (_, diags) = eval(r#"slice(["a"], "x", 1)"#);
    assert_eq!(kinds(&diags), vec![DiagnosticKind::TypeConversion]);
}

#[test]
fn results_serialize_to_json() {
    let registry = registry();
    let data = StaticData::new().with("env", s("prod"));
    let scope = Scope::new(&registry, &data);
    let expr = parse_expression(r#"merge({name = "api", env = env}, {replicas = max(2, 3)})"#)
        .expect("expression parses");
    let (value, diags) = scope.eval_expr(&expr, &Type::Dynamic);
    assert!(diags.is_empty());
    assert_eq!(
        serde_json::to_string(&value).expect("value serializes"),
        r#"{"env":"prod","name":"api","replicas":3}"#
    );
}

#[test]
fn expected_type_applies_to_the_result() {
    let registry = registry();
    let scope = Scope::new(&registry, &NoData);
    let (value, diags) = scope.eval_source(r#"concat(["1"], ["2"])"#, &Type::list(Type::Number));
    assert!(diags.is_empty());
    assert_eq!(value, Value::list_of(Type::Number, vec![Value::int(1), Value::int(2)]));

    let (_, diags) = scope.eval_source(r#"keys({a = 1})"#, &Type::Number);
    assert_eq!(kinds(&diags), vec![DiagnosticKind::ResultTypeMismatch]);
}
