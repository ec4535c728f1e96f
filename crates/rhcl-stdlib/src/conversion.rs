//! Explicit type conversion functions
//!
//! Dispatch performs the conversion itself when it coerces the argument to
//! the parameter type; the implementations only hand the result back.

use rhcl_runtime::{
    EvalResult, Function, FunctionRegistry, Parameter, RegistryError, Scope, Type, Value,
};

use crate::args::first_type;

pub fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    let targets = [
        ("tolist", Type::list(Type::Dynamic)),
        ("toset", Type::set(Type::Dynamic)),
        ("tomap", Type::map(Type::Dynamic)),
        ("tostring", Type::String),
        ("tonumber", Type::Number),
        ("tobool", Type::Bool),
    ];
    for (name, ty) in targets {
        registry.register(
            Function::new(name, identity)
                .param(Parameter::new("v", ty).allow_null().allow_unknown())
                .returns_with(first_type),
        )?;
    }
    Ok(())
}

fn identity(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    Ok(args[0].clone())
}
