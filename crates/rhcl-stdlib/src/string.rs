//! String functions

use rhcl_runtime::{
    EvalError, EvalResult, Function, FunctionRegistry, Parameter, RegistryError, Scope, Type,
    Value,
};

use crate::args::{get_elements_arg, get_string_arg};

pub fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    registry.register(
        Function::new("join", join)
            .param(Parameter::new("separator", Type::String))
            .variadic(Parameter::new("lists", Type::list(Type::String)))
            .min_args(2)
            .returns(Type::String),
    )?;
    registry.register(
        Function::new("split", split)
            .param(Parameter::new("separator", Type::String))
            .param(Parameter::new("str", Type::String))
            .returns(Type::list(Type::String)),
    )?;
    registry.register(
        Function::new("upper", upper)
            .param(Parameter::new("str", Type::String))
            .returns(Type::String),
    )?;
    registry.register(
        Function::new("lower", lower)
            .param(Parameter::new("str", Type::String))
            .returns(Type::String),
    )?;
    Ok(())
}

fn join(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let separator = get_string_arg(args, 0)?;
    if args.len() < 2 {
        return Err(EvalError::invalid("at least one list is required"));
    }

    let mut parts = Vec::new();
    for idx in 1..args.len() {
        for (i, item) in get_elements_arg(args, idx)?.iter().enumerate() {
            let s = item.as_str().ok_or_else(|| {
                EvalError::argument(idx, format!("element {} is null; cannot concatenate null values", i))
            })?;
            parts.push(s.to_string());
        }
    }
    Ok(Value::string(parts.join(separator)))
}

fn split(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let separator = get_string_arg(args, 0)?;
    let s = get_string_arg(args, 1)?;
    let parts: Vec<Value> = if separator.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(separator).map(Value::from).collect()
    };
    Ok(Value::list_of(Type::String, parts))
}

fn upper(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    Ok(Value::string(get_string_arg(args, 0)?.to_uppercase()))
}

fn lower(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    Ok(Value::string(get_string_arg(args, 0)?.to_lowercase()))
}
