//! Evaluation scope: walks an expression tree and dispatches function calls

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rhcl_parser::{
    parse_expression, Call, Expr, ExprKind, Literal, ObjectItem, ObjectKey, Reference, Span,
    UnaryOp,
};
use tracing::{debug, trace};

use crate::convert::convert;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::EvalError;
use crate::function::{Function, ReturnType};
use crate::provider::{DataProvider, Resolution};
use crate::registry::FunctionRegistry;
use crate::types::Type;
use crate::value::Value;

/// Default limit on expression nesting
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Per-scope settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeOptions {
    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
    /// Impure functions yield unknown results instead of running
    pub pure_only: bool,
    pub max_depth: usize,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            pure_only: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ScopeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn pure_only(mut self, pure_only: bool) -> Self {
        self.pure_only = pure_only;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Everything one evaluation needs
///
/// The scope borrows its registry and provider, so several scopes (on
/// several threads) can share them.
pub struct Scope<'a> {
    registry: &'a FunctionRegistry,
    provider: &'a dyn DataProvider,
    options: ScopeOptions,
}

/// Result of spreading a `...` argument
enum Expanded {
    Values(Vec<Value>),
    Unknown,
    Invalid,
}

impl<'a> Scope<'a> {
    pub fn new(registry: &'a FunctionRegistry, provider: &'a dyn DataProvider) -> Self {
        Self {
            registry,
            provider,
            options: ScopeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScopeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ScopeOptions {
        &self.options
    }

    pub fn base_dir(&self) -> &Path {
        &self.options.base_dir
    }

    pub fn registry(&self) -> &FunctionRegistry {
        self.registry
    }

    /// Evaluate `expr`, converting the result to `want` unless it is dynamic
    pub fn eval_expr(&self, expr: &Expr, want: &Type) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();
        let value = self.eval(expr, 0, &mut diags);

        let value = if want.is_dynamic() {
            value
        } else {
            match convert(&value, want) {
                Ok(converted) => converted,
                Err(err) => {
                    diags.push(
                        Diagnostic::error(
                            DiagnosticKind::ResultTypeMismatch,
                            "Incorrect value type",
                            format!("Invalid expression value: {}.", err),
                        )
                        .with_span(expr.span),
                    );
                    Value::Unknown(want.clone())
                }
            }
        };

        debug!(
            errors = diags.errors().count(),
            warnings = diags.warnings().count(),
            "evaluated expression"
        );
        (value, diags)
    }

    /// Parse and evaluate source text
    pub fn eval_source(&self, source: &str, want: &Type) -> (Value, Diagnostics) {
        match parse_expression(source) {
            Ok(expr) => self.eval_expr(&expr, want),
            Err(err) => (Value::Unknown(want.clone()), Diagnostic::from(err).into()),
        }
    }

    fn eval(&self, expr: &Expr, depth: usize, diags: &mut Diagnostics) -> Value {
        if depth > self.options.max_depth {
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::InvalidExpression,
                    "Expression too deeply nested",
                    format!(
                        "Expressions may be nested at most {} levels deep.",
                        self.options.max_depth
                    ),
                )
                .with_span(expr.span),
            );
            return Value::dynamic();
        }

        match &expr.kind {
            ExprKind::Literal(lit) => literal_value(lit),
            ExprKind::Reference(reference) => self.eval_reference(reference, diags),
            ExprKind::Call(call) => self.eval_call(call, expr.span, depth, diags),
            ExprKind::Tuple(items) => Value::tuple(
                items
                    .iter()
                    .map(|item| self.eval(item, depth + 1, diags))
                    .collect(),
            ),
            ExprKind::Object(items) => self.eval_object(items, depth, diags),
            ExprKind::Index { collection, key } => {
                let collection = self.eval(collection, depth + 1, diags);
                let key_span = key.span;
                let key = self.eval(key, depth + 1, diags);
                collection.index(&key).unwrap_or_else(|err| {
                    diags.push(
                        Diagnostic::error(
                            DiagnosticKind::InvalidExpression,
                            "Invalid index",
                            format!("This value cannot be indexed with the given key: {}.", err),
                        )
                        .with_span(key_span),
                    );
                    Value::dynamic()
                })
            }
            ExprKind::GetAttr { object, name } => {
                let object = self.eval(object, depth + 1, diags);
                object.get_attr(&name.node).unwrap_or_else(|err| {
                    diags.push(
                        Diagnostic::error(
                            DiagnosticKind::InvalidExpression,
                            "Unsupported attribute",
                            format!("{}.", err),
                        )
                        .with_span(name.span),
                    );
                    Value::dynamic()
                })
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, depth + 1, diags);
                self.eval_unary(*op, value, expr.span, diags)
            }
            ExprKind::Parens(inner) => self.eval(inner, depth + 1, diags),
        }
    }

    fn eval_reference(&self, reference: &Reference, diags: &mut Diagnostics) -> Value {
        trace!(reference = %reference, "resolving reference");
        match self.provider.resolve(reference) {
            Resolution::Known(value) => value,
            Resolution::Pending => Value::dynamic(),
            Resolution::Undefined => {
                diags.push(
                    Diagnostic::error(
                        DiagnosticKind::UndefinedReference,
                        "Reference to undeclared value",
                        format!(
                            "A value named \"{}\" has not been declared.",
                            reference.root_name()
                        ),
                    )
                    .with_span(reference.span),
                );
                Value::dynamic()
            }
            Resolution::Failed(failed) => {
                diags.extend(failed);
                Value::dynamic()
            }
        }
    }

    fn eval_object(&self, items: &[ObjectItem], depth: usize, diags: &mut Diagnostics) -> Value {
        let mut attrs = BTreeMap::new();
        let mut unknown_key = false;

        for item in items {
            let key = match &item.key {
                ObjectKey::Name(name) => Some(name.node.clone()),
                ObjectKey::Expr(expr) => {
                    let key = self.eval(expr, depth + 1, diags);
                    if !key.is_known() {
                        unknown_key = true;
                        None
                    } else {
                        object_key(&key, expr.span, diags)
                    }
                }
            };
            let value = self.eval(&item.value, depth + 1, diags);

            if let Some(key) = key {
                if attrs.contains_key(&key) {
                    diags.push(
                        Diagnostic::warning(
                            DiagnosticKind::DuplicateKey,
                            "Duplicate object key",
                            format!("The key \"{}\" is defined more than once; the last definition is used.", key),
                        )
                        .with_span(item.key.span()),
                    );
                }
                attrs.insert(key, value);
            }
        }

        if unknown_key {
            Value::dynamic()
        } else {
            Value::object(attrs)
        }
    }

    fn eval_unary(&self, op: UnaryOp, value: Value, span: Span, diags: &mut Diagnostics) -> Value {
        let want = match op {
            UnaryOp::Negate => Type::Number,
            UnaryOp::Not => Type::Bool,
        };
        let failure = |diags: &mut Diagnostics, message: String| {
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::InvalidExpression,
                    "Invalid operand",
                    format!("Unsuitable value for unary operand \"{}\": {}.", op, message),
                )
                .with_span(span),
            );
            Value::Unknown(want.clone())
        };

        if value.is_null() {
            return failure(diags, format!("a {} is required, but have null", want));
        }
        match convert(&value, &want) {
            Ok(Value::Number(n)) => Value::Number(-n),
            Ok(Value::Bool(b)) => Value::Bool(!b),
            Ok(_) => Value::Unknown(want.clone()),
            Err(err) => failure(diags, err.to_string()),
        }
    }

    fn eval_call(&self, call: &Call, span: Span, depth: usize, diags: &mut Diagnostics) -> Value {
        let name = call.name.node.as_str();
        let function = self.registry.get(name);
        if function.is_none() {
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::UnknownFunction,
                    "Call to unknown function",
                    format!("There is no function named \"{}\".", name),
                )
                .with_span(call.name.span),
            );
        }

        // Every argument is evaluated so that all of their errors surface
        let mut args: Vec<(Value, Span)> = Vec::with_capacity(call.args.len());
        let mut args_failed = false;
        for arg in &call.args {
            let mut arg_diags = Diagnostics::new();
            let value = self.eval(arg, depth + 1, &mut arg_diags);
            args_failed |= arg_diags.has_errors();
            diags.extend(arg_diags);
            args.push((value, arg.span));
        }

        let Some(function) = function else {
            return Value::dynamic();
        };

        if call.expand_final {
            if let Some((last, last_span)) = args.pop() {
                match expand(last, last_span, diags) {
                    Expanded::Values(values) => {
                        args.extend(values.into_iter().map(|v| (v, last_span)));
                    }
                    Expanded::Unknown => return Value::Unknown(declared_return(function)),
                    Expanded::Invalid => return Value::dynamic(),
                }
            }
        }

        if !check_arity(function, &args, span, diags) {
            return Value::dynamic();
        }

        let mut converted = Vec::with_capacity(args.len());
        let mut invalid = false;
        for (index, (value, arg_span)) in args.iter().enumerate() {
            let Some(param) = function.param_for(index) else {
                break;
            };
            if value.is_null() && !param.allow_null {
                diags.push(
                    Diagnostic::error(
                        DiagnosticKind::TypeConversion,
                        "Invalid function argument",
                        format!(
                            "Invalid value for \"{}\" parameter of function \"{}\": argument must not be null.",
                            param.name, function.name
                        ),
                    )
                    .with_span(*arg_span),
                );
                invalid = true;
                continue;
            }
            match convert(value, &param.ty) {
                Ok(v) => converted.push(v),
                Err(err) => {
                    diags.push(
                        Diagnostic::error(
                            DiagnosticKind::TypeConversion,
                            "Invalid function argument",
                            format!(
                                "Invalid value for \"{}\" parameter of function \"{}\": {}.",
                                param.name, function.name, err
                            ),
                        )
                        .with_span(*arg_span),
                    );
                    invalid = true;
                }
            }
        }

        if args_failed || invalid {
            return Value::Unknown(declared_return(function));
        }

        let arg_types: Vec<Type> = converted.iter().map(Value::ty).collect();
        let unknown_arg = converted.iter().enumerate().any(|(index, value)| {
            !value.is_wholly_known()
                && !function.param_for(index).is_some_and(|p| p.allow_unknown)
        });
        if unknown_arg {
            trace!(function = name, "unknown argument, result is unknown");
            return Value::Unknown(function.return_type.resolve(&arg_types));
        }

        if function.impure && self.options.pure_only {
            debug!(function = name, "skipping impure function in pure-only scope");
            return Value::Unknown(function.return_type.resolve(&arg_types));
        }

        trace!(function = name, args = converted.len(), "calling function");
        match function.call(&converted, self) {
            Ok(value) => value,
            Err(err) => {
                diags.push(call_failure(function, err, span, &args));
                Value::Unknown(declared_return(function))
            }
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::null(),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(n.clone()),
        Literal::String(s) => Value::string(s.as_str()),
    }
}

fn object_key(key: &Value, span: Span, diags: &mut Diagnostics) -> Option<String> {
    if key.is_null() {
        diags.push(
            Diagnostic::error(
                DiagnosticKind::InvalidExpression,
                "Null value as key",
                "Can't use a null value as a key.",
            )
            .with_span(span),
        );
        return None;
    }
    match convert(key, &Type::String) {
        Ok(Value::String(s)) => Some(s.to_string()),
        Ok(_) => None,
        Err(err) => {
            diags.push(
                Diagnostic::error(
                    DiagnosticKind::InvalidExpression,
                    "Incorrect key type",
                    format!("Can't use this value as a key: {}.", err),
                )
                .with_span(span),
            );
            None
        }
    }
}

fn expand(value: Value, span: Span, diags: &mut Diagnostics) -> Expanded {
    if !value.is_known() {
        return Expanded::Unknown;
    }
    let problem = if value.is_null() {
        "must not be null"
    } else if let Some(values) = value.elements() {
        return Expanded::Values(values);
    } else {
        "must be of a tuple, list, or set type"
    };
    diags.push(
        Diagnostic::error(
            DiagnosticKind::InvalidExpression,
            "Invalid expanding argument value",
            format!("The expanding argument (indicated by ...) {}.", problem),
        )
        .with_span(span),
    );
    Expanded::Invalid
}

fn check_arity(function: &Function, args: &[(Value, Span)], span: Span, diags: &mut Diagnostics) -> bool {
    let required = function.params.len();
    let missing = function.params.get(args.len()).or_else(|| {
        (args.len() < function.required_args())
            .then_some(function.variadic.as_ref())
            .flatten()
    });
    if let Some(missing) = missing {
        let qualifier = if function.variadic.is_some() { " at least" } else { "" };
        diags.push(
            Diagnostic::error(
                DiagnosticKind::Arity,
                "Not enough function arguments",
                format!(
                    "Function \"{}\" expects{} {} argument(s). Missing value for \"{}\".",
                    function.name,
                    qualifier,
                    function.required_args(),
                    missing.name
                ),
            )
            .with_span(span),
        );
        return false;
    }
    if function.variadic.is_none() && args.len() > required {
        let extra_span = args.get(required).map_or(span, |(_, s)| *s);
        diags.push(
            Diagnostic::error(
                DiagnosticKind::Arity,
                "Too many function arguments",
                format!(
                    "Function \"{}\" expects only {} argument(s).",
                    function.name, required
                ),
            )
            .with_span(extra_span),
        );
        return false;
    }
    true
}

/// Result type when no argument types are available
fn declared_return(function: &Function) -> Type {
    match &function.return_type {
        ReturnType::Static(ty) => ty.clone(),
        ReturnType::FromArgs(_) => Type::Dynamic,
    }
}

fn call_failure(function: &Function, err: EvalError, span: Span, args: &[(Value, Span)]) -> Diagnostic {
    match err {
        EvalError::InvalidArgument { index, message } => {
            let param = function
                .param_for(index)
                .map_or("?", |p| p.name.as_str());
            let arg_span = args.get(index).map_or(span, |(_, s)| *s);
            Diagnostic::error(
                DiagnosticKind::FunctionExecution,
                "Invalid function argument",
                format!(
                    "Invalid value for \"{}\" parameter of function \"{}\": {}.",
                    param, function.name, message
                ),
            )
            .with_span(arg_span)
        }
        err @ EvalError::ResourceNotFound(_) => Diagnostic::error(
            DiagnosticKind::ResourceNotFound,
            "Error in function call",
            format!("Call to function \"{}\" failed: {}.", function.name, err),
        )
        .with_span(span),
        err => Diagnostic::error(
            DiagnosticKind::FunctionExecution,
            "Error in function call",
            format!("Call to function \"{}\" failed: {}.", function.name, err),
        )
        .with_span(span),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Parameter;
    use crate::provider::{NoData, StaticData};

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        let functions = vec![
            Function::new("echo", |args, _| Ok(args[0].clone()))
                .param(Parameter::new("value", Type::Dynamic))
                .returns_with(|types| types.first().cloned().unwrap_or(Type::Dynamic)),
            Function::new("upper", |args, _| {
                Ok(Value::string(args[0].as_str().unwrap_or_default().to_uppercase()))
            })
            .param(Parameter::new("str", Type::String))
            .returns(Type::String),
            Function::new("sum", |args, _| {
                let total = args.iter().filter_map(Value::as_number).sum();
                Ok(Value::Number(total))
            })
            .variadic(Parameter::new("nums", Type::Number))
            .returns(Type::Number),
            Function::new("len", |args, _| match args[0].length() {
                Some(n) => Ok(Value::int(n as i64)),
                None => Ok(Value::unknown(Type::Number)),
            })
            .param(Parameter::new("value", Type::Dynamic).allow_unknown())
            .returns(Type::Number),
            Function::new("fail", |_, _| Err(EvalError::invalid("boom")))
                .variadic(Parameter::new("args", Type::Dynamic).allow_unknown()),
            Function::new("pick", |args, _| {
                let index = args[1].as_i64().unwrap_or(-1);
                args[0].index(&Value::int(index)).map_err(|_| {
                    EvalError::argument(1, format!("no element at index {}", index))
                })
            })
            .param(Parameter::new("list", Type::list(Type::String)))
            .param(Parameter::new("idx", Type::Number))
            .returns(Type::String),
            Function::new("read", |args, scope| {
                Err(EvalError::ResourceNotFound(
                    scope.base_dir().join(args[0].as_str().unwrap_or_default()),
                ))
            })
            .param(Parameter::new("path", Type::String))
            .returns(Type::String)
            .impure(),
        ];
        for function in functions {
            registry.register(function).unwrap();
        }
        registry
    }

    fn eval_with(provider: &dyn DataProvider, src: &str) -> (Value, Diagnostics) {
        let registry = registry();
        Scope::new(&registry, provider).eval_source(src, &Type::Dynamic)
    }

    fn eval(src: &str) -> (Value, Diagnostics) {
        eval_with(&NoData, src)
    }

    fn render(src: &str, diags: &Diagnostics) -> String {
        diags
            .iter()
            .map(|d| d.render(src))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn kinds(diags: &Diagnostics) -> Vec<DiagnosticKind> {
        diags.iter().map(|d| d.kind).collect()
    }

    fn pending_x() -> StaticData {
        let mut data = StaticData::new();
        data.mark_pending("x");
        data
    }

    #[test]
    fn literals_and_constructors() {
        let (value, diags) = eval(r#"["a", 1.50, true, null, { k = "v", "quoted": 2 }]"#);
        assert!(diags.is_empty());
        insta::assert_snapshot!(value.to_string(), @r#"["a", 1.5, true, null, {"k" = "v", "quoted" = 2}]"#);
    }

    #[test]
    fn unknown_function_still_evaluates_arguments() {
        let src = "nope(missing)";
        let (value, diags) = eval(src);
        assert_eq!(value, Value::dynamic());
        insta::assert_snapshot!(render(src, &diags), @r#"
        Error: Call to unknown function
          on line 1, column 1:
          There is no function named "nope".
        Error: Reference to undeclared value
          on line 1, column 6:
          A value named "missing" has not been declared.
        "#);
    }

    #[test]
    fn arity_errors() {
        let src = "upper()";
        let (value, diags) = eval(src);
        assert_eq!(value, Value::dynamic());
        insta::assert_snapshot!(render(src, &diags), @r#"
        Error: Not enough function arguments
          on line 1, column 1:
          Function "upper" expects 1 argument(s). Missing value for "str".
        "#);

        let src = r#"upper("a", "b")"#;
        let (_, diags) = eval(src);
        insta::assert_snapshot!(render(src, &diags), @r#"
        Error: Too many function arguments
          on line 1, column 12:
          Function "upper" expects only 1 argument(s).
        "#);

        let (value, diags) = eval("sum()");
        assert!(diags.is_empty());
        assert_eq!(value, Value::int(0));
    }

    #[test]
    fn arguments_are_converted_to_parameter_types() {
        let (value, diags) = eval("upper(true)");
        assert!(diags.is_empty());
        assert_eq!(value, Value::from("TRUE"));

        let (value, diags) = eval(r#"sum(1, "2", 3)"#);
        assert!(diags.is_empty());
        assert_eq!(value, Value::int(6));
    }

    #[test]
    fn conversion_failure_names_parameter_and_types() {
        let src = "upper([1])";
        let (value, diags) = eval(src);
        assert_eq!(value, Value::unknown(Type::String));
        assert_eq!(kinds(&diags), vec![DiagnosticKind::TypeConversion]);
        insta::assert_snapshot!(render(src, &diags), @r#"
        Error: Invalid function argument
          on line 1, column 7:
          Invalid value for "str" parameter of function "upper": string required, but have tuple.
        "#);
    }

    #[test]
    fn null_arguments_are_rejected() {
        let src = "upper(null)";
        let (_, diags) = eval(src);
        insta::assert_snapshot!(render(src, &diags), @r#"
        Error: Invalid function argument
          on line 1, column 7:
          Invalid value for "str" parameter of function "upper": argument must not be null.
        "#);
    }

    #[test]
    fn unknown_arguments_propagate_without_diagnostics() {
        let data = pending_x();
        let (value, diags) = eval_with(&data, "upper(x)");
        assert!(diags.is_empty());
        assert_eq!(value, Value::unknown(Type::String));

        let (value, diags) = eval_with(&data, "echo([1, x])");
        assert!(diags.is_empty());
        assert_eq!(
            value,
            Value::unknown(Type::Tuple(vec![Type::Number, Type::Dynamic]))
        );

        // `len` opts in to unknown arguments
        let (value, diags) = eval_with(&data, "len([x, x, 1])");
        assert!(diags.is_empty());
        assert_eq!(value, Value::int(3));
        let (value, _) = eval_with(&data, "len(x)");
        assert_eq!(value, Value::unknown(Type::Number));
    }

    #[test]
    fn sibling_errors_are_all_reported_and_function_not_called() {
        let src = r#"pick(missing, upper([]))"#;
        let (value, diags) = eval(src);
        assert_eq!(value, Value::unknown(Type::String));
        assert_eq!(
            kinds(&diags),
            vec![DiagnosticKind::UndefinedReference, DiagnosticKind::TypeConversion]
        );

        // `fail` accepts unknowns, so a call would add a second diagnostic
        let (_, diags) = eval("fail(missing)");
        assert_eq!(kinds(&diags), vec![DiagnosticKind::UndefinedReference]);
        let (_, diags) = eval("fail(1)");
        assert_eq!(kinds(&diags), vec![DiagnosticKind::FunctionExecution]);
    }

    #[test]
    fn implementation_errors_are_wrapped() {
        let src = "fail()";
        let (value, diags) = eval(src);
        assert_eq!(value, Value::dynamic());
        insta::assert_snapshot!(render(src, &diags), @r#"
        Error: Error in function call
          on line 1, column 1:
          Call to function "fail" failed: boom.
        "#);

        let src = r#"pick(["a"], 3)"#;
        let (_, diags) = eval(src);
        insta::assert_snapshot!(render(src, &diags), @r#"
        Error: Invalid function argument
          on line 1, column 13:
          Invalid value for "idx" parameter of function "pick": no element at index 3.
        "#);
    }

    #[test]
    fn resource_errors_and_pure_mode() {
        let registry = registry();
        let scope = Scope::new(&registry, &NoData)
            .with_options(ScopeOptions::new().base_dir("/srv/config"));
        let (value, diags) = scope.eval_source(r#"read("hello.txt")"#, &Type::Dynamic);
        assert_eq!(value, Value::unknown(Type::String));
        assert_eq!(kinds(&diags), vec![DiagnosticKind::ResourceNotFound]);
        assert!(diags.iter().all(|d| d.detail.contains("/srv/config/hello.txt")));

        let pure = Scope::new(&registry, &NoData).with_options(ScopeOptions::new().pure_only(true));
        let (value, diags) = pure.eval_source(r#"read("hello.txt")"#, &Type::Dynamic);
        assert!(diags.is_empty());
        assert_eq!(value, Value::unknown(Type::String));
    }

    #[test]
    fn expected_type_conversion() {
        let registry = registry();
        let scope = Scope::new(&registry, &NoData);
        let (value, diags) = scope.eval_source(r#""12""#, &Type::Number);
        assert!(diags.is_empty());
        assert_eq!(value, Value::int(12));

        let src = "[1, 2]";
        let (value, diags) = scope.eval_source(src, &Type::String);
        assert_eq!(value, Value::unknown(Type::String));
        insta::assert_snapshot!(render(src, &diags), @r"
        Error: Incorrect value type
          on line 1, column 1:
          Invalid expression value: string required, but have tuple.
        ");
    }

    #[test]
    fn argument_expansion() {
        let (value, diags) = eval("sum([1, 2, 3]...)");
        assert!(diags.is_empty());
        assert_eq!(value, Value::int(6));

        let (value, diags) = eval("sum(1, [2, 3]...)");
        assert!(diags.is_empty());
        assert_eq!(value, Value::int(6));

        let (_, diags) = eval("sum(5...)");
        assert_eq!(kinds(&diags), vec![DiagnosticKind::InvalidExpression]);

        let (value, diags) = eval_with(&pending_x(), "sum(x...)");
        assert!(diags.is_empty());
        assert_eq!(value, Value::unknown(Type::Number));
    }

    #[test]
    fn object_keys() {
        let (value, diags) = eval("{a = 1, a = 2}");
        assert!(!diags.has_errors());
        assert_eq!(kinds(&diags), vec![DiagnosticKind::DuplicateKey]);
        assert_eq!(value, Value::object_from([("a", Value::int(2))]));

        let (value, diags) = eval("{upper(\"k\") = 1, 2 = true}");
        assert!(diags.is_empty());
        assert_eq!(
            value,
            Value::object_from([("2", Value::from(true)), ("K", Value::int(1))])
        );

        let (value, diags) = eval_with(&pending_x(), "{upper(x) = 1}");
        assert!(diags.is_empty());
        assert_eq!(value, Value::dynamic());

        let (_, diags) = eval("{echo(null) = 1}");
        assert_eq!(kinds(&diags), vec![DiagnosticKind::TypeConversion]);
    }

    #[test]
    fn index_attribute_and_unary() {
        assert_eq!(eval("[1, 2][1]").0, Value::int(2));
        assert_eq!(eval("{a = \"x\"}.a").0, Value::from("x"));
        assert_eq!(eval("-sum(2)").0, Value::int(-2));
        assert_eq!(eval("!true").0, Value::from(false));

        let (value, diags) = eval("[1][3]");
        assert_eq!(value, Value::dynamic());
        assert_eq!(kinds(&diags), vec![DiagnosticKind::InvalidExpression]);

        let (_, diags) = eval("-\"x\"");
        assert_eq!(kinds(&diags), vec![DiagnosticKind::InvalidExpression]);
        let (_, diags) = eval("{a = 1}.b");
        assert_eq!(kinds(&diags), vec![DiagnosticKind::InvalidExpression]);
    }

    #[test]
    fn references_resolve_through_the_provider() {
        let data = StaticData::new().with(
            "var",
            Value::object_from([("region", Value::from("eu-west-1"))]),
        );
        let (value, diags) = eval_with(&data, "upper(var.region)");
        assert!(diags.is_empty());
        assert_eq!(value, Value::from("EU-WEST-1"));
    }

    #[test]
    fn nesting_limit() {
        let registry = registry();
        let scope = Scope::new(&registry, &NoData).with_options(ScopeOptions::new().max_depth(3));
        let (value, diags) = scope.eval_source("echo(echo(echo(echo(1))))", &Type::Dynamic);
        assert_eq!(kinds(&diags), vec![DiagnosticKind::InvalidExpression]);
        assert!(!value.is_known());
    }

    #[test]
    fn parse_errors_become_diagnostics() {
        let (value, diags) = eval("upper(");
        assert_eq!(value, Value::dynamic());
        assert_eq!(kinds(&diags), vec![DiagnosticKind::Parse]);
    }

    #[test]
    fn scopes_share_a_registry_across_threads() {
        let registry = registry();
        let data = StaticData::new().with("n", Value::int(4));
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let registry = &registry;
                    let data = &data;
                    s.spawn(move || {
                        Scope::new(registry, data)
                            .eval_source(&format!("sum(n, {})", i), &Type::Dynamic)
                            .0
                    })
                })
                .collect();
            let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(
                results,
                vec![Value::int(4), Value::int(5), Value::int(6), Value::int(7)]
            );
        });
    }
}
