//! Argument accessors shared by the function modules
//!
//! Dispatch has already converted every argument to its parameter type, so
//! these only fail when an implementation is registered with the wrong
//! signature.

use bigdecimal::{BigDecimal, ToPrimitive};
use rhcl_runtime::{unify, convert, EvalError, EvalResult, Type, Value};

fn mismatch(args: &[Value], idx: usize, want: &str) -> EvalError {
    let have = args
        .get(idx)
        .map_or_else(|| "nothing".to_string(), |v| v.ty().to_string());
    EvalError::argument(idx, format!("{} required, but have {}", want, have))
}

pub(crate) fn get_number_arg(args: &[Value], idx: usize) -> EvalResult<&BigDecimal> {
    args.get(idx)
        .and_then(Value::as_number)
        .ok_or_else(|| mismatch(args, idx, "number"))
}

/// A whole number that fits in an i64
pub(crate) fn get_int_arg(args: &[Value], idx: usize) -> EvalResult<i64> {
    let n = get_number_arg(args, idx)?;
    if !n.is_integer() {
        return Err(EvalError::argument(idx, "a whole number is required"));
    }
    n.to_i64()
        .ok_or_else(|| EvalError::argument(idx, "number is too large"))
}

pub(crate) fn get_string_arg(args: &[Value], idx: usize) -> EvalResult<&str> {
    args.get(idx)
        .and_then(Value::as_str)
        .ok_or_else(|| mismatch(args, idx, "string"))
}

/// Elements of a list, set or tuple argument
pub(crate) fn get_elements_arg(args: &[Value], idx: usize) -> EvalResult<Vec<Value>> {
    args.get(idx)
        .and_then(Value::elements)
        .ok_or_else(|| mismatch(args, idx, "list, set or tuple"))
}

/// Element type of a list argument
pub(crate) fn element_type(args: &[Value], idx: usize) -> Type {
    args.get(idx)
        .map(Value::ty)
        .and_then(|ty| ty.element_type().cloned())
        .unwrap_or(Type::Dynamic)
}

/// A list when the items share a type, a tuple otherwise
pub(crate) fn list_or_tuple(items: Vec<Value>) -> Value {
    let types: Vec<Type> = items.iter().map(Value::ty).collect();
    let Some(unified) = unify(&types) else {
        return Value::tuple(items);
    };
    match items
        .iter()
        .map(|item| convert(item, &unified))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(converted) => Value::list_of(unified, converted),
        Err(_) => Value::tuple(items),
    }
}

// Return type rules

pub(crate) fn first_type(types: &[Type]) -> Type {
    types.first().cloned().unwrap_or(Type::Dynamic)
}

pub(crate) fn element_of_first(types: &[Type]) -> Type {
    types
        .first()
        .and_then(Type::element_type)
        .cloned()
        .unwrap_or(Type::Dynamic)
}
