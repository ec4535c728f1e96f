//! rhcl Runtime
//!
//! This crate provides the value model, type conversion, function registry
//! and the evaluation scope that walks parsed expressions.

pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod function;
pub mod provider;
pub mod registry;
pub mod scope;
pub mod types;
pub mod value;

pub use convert::{can_convert, convert, unify};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{ConversionError, EvalError, EvalResult, RegistryError};
pub use function::{Function, FunctionImpl, Parameter, ReturnType};
pub use provider::{DataProvider, NoData, Resolution, StaticData};
pub use registry::FunctionRegistry;
pub use scope::{Scope, ScopeOptions, DEFAULT_MAX_DEPTH};
pub use types::Type;
pub use value::{format_number, Value};
