//! Callable function definitions

use std::fmt;
use std::sync::Arc;

use crate::error::EvalResult;
use crate::scope::Scope;
use crate::types::Type;
use crate::value::Value;

/// Function implementation type
///
/// Receives arguments already converted to the declared parameter types,
/// variadic arguments appended after the fixed ones.
pub type FunctionImpl = Arc<dyn Fn(&[Value], &Scope<'_>) -> EvalResult<Value> + Send + Sync>;

/// A declared function parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    /// Null arguments reach the implementation instead of being rejected
    pub allow_null: bool,
    /// Unknown arguments reach the implementation instead of short-circuiting
    pub allow_unknown: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            allow_null: false,
            allow_unknown: false,
        }
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }
}

/// How a function's result type is determined
#[derive(Clone)]
pub enum ReturnType {
    Static(Type),
    /// Computed from the (converted) argument types
    FromArgs(fn(&[Type]) -> Type),
}

impl ReturnType {
    pub fn resolve(&self, args: &[Type]) -> Type {
        match self {
            ReturnType::Static(ty) => ty.clone(),
            ReturnType::FromArgs(f) => f(args),
        }
    }
}

impl fmt::Debug for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Static(ty) => write!(f, "Static({:?})", ty),
            ReturnType::FromArgs(_) => write!(f, "FromArgs(..)"),
        }
    }
}

/// A named callable
#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Parameter>,
    pub variadic: Option<Parameter>,
    /// Fewest arguments accepted, variadic ones included
    pub min_args: usize,
    pub return_type: ReturnType,
    /// Reads external state; skipped when the scope is pure-only
    pub impure: bool,
    implementation: FunctionImpl,
}

impl Function {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value], &Scope<'_>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            variadic: None,
            min_args: 0,
            return_type: ReturnType::Static(Type::Dynamic),
            impure: false,
            implementation: Arc::new(f),
        }
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn variadic(mut self, param: Parameter) -> Self {
        self.variadic = Some(param);
        self
    }

    pub fn min_args(mut self, count: usize) -> Self {
        self.min_args = count;
        self
    }

    /// Fewest arguments a call must supply
    pub fn required_args(&self) -> usize {
        self.params.len().max(self.min_args)
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.return_type = ReturnType::Static(ty);
        self
    }

    pub fn returns_with(mut self, f: fn(&[Type]) -> Type) -> Self {
        self.return_type = ReturnType::FromArgs(f);
        self
    }

    pub fn impure(mut self) -> Self {
        self.impure = true;
        self
    }

    /// The parameter that receives the argument at `index`, if any
    pub fn param_for(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index).or(self.variadic.as_ref())
    }

    pub fn call(&self, args: &[Value], scope: &Scope<'_>) -> EvalResult<Value> {
        (self.implementation)(args, scope)
    }

    /// `name(a string, b number, rest... dynamic)`
    pub fn signature(&self) -> String {
        let mut parts: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{} {}", p.name, p.ty))
            .collect();
        if let Some(v) = &self.variadic {
            parts.push(format!("{}... {}", v.name, v.ty));
        }
        format!("{}({})", self.name, parts.join(", "))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .field("min_args", &self.min_args)
            .field("return_type", &self.return_type)
            .field("impure", &self.impure)
            .finish_non_exhaustive()
    }
}
