//! Collection functions (lists, sets, maps, tuples and objects)

use std::collections::BTreeMap;

use indexmap::IndexSet;
use rhcl_runtime::{
    convert, unify, EvalError, EvalResult, Function, FunctionRegistry, Parameter, RegistryError,
    Scope, Type, Value,
};

use crate::args::{
    element_of_first, element_type, first_type, get_elements_arg, get_int_arg, get_string_arg,
    list_or_tuple,
};

pub fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    let any_list = || Type::list(Type::Dynamic);

    // Queries
    registry.register(
        Function::new("contains", contains)
            .param(Parameter::new("list", any_list()))
            .param(Parameter::new("value", Type::Dynamic))
            .returns(Type::Bool),
    )?;
    registry.register(
        Function::new("index", index)
            .param(Parameter::new("list", any_list()))
            .param(Parameter::new("value", Type::Dynamic))
            .returns(Type::Number),
    )?;
    registry.register(
        Function::new("length", length)
            .param(Parameter::new("value", Type::Dynamic).allow_unknown())
            .returns(Type::Number),
    )?;
    registry.register(
        Function::new("element", element)
            .param(Parameter::new("list", any_list()))
            .param(Parameter::new("index", Type::Number))
            .returns_with(element_of_first),
    )?;
    registry.register(
        Function::new("lookup", lookup)
            .param(Parameter::new("inputMap", Type::Dynamic))
            .param(Parameter::new("key", Type::String))
            .variadic(Parameter::new("default", Type::Dynamic))
            .returns(Type::Dynamic),
    )?;
    registry.register(
        Function::new("keys", keys)
            .param(Parameter::new("inputMap", Type::Dynamic))
            .returns_with(keys_type),
    )?;
    registry.register(
        Function::new("values", values)
            .param(Parameter::new("values", Type::Dynamic))
            .returns_with(values_type),
    )?;

    // Transforms
    registry.register(
        Function::new("chunklist", chunklist)
            .param(Parameter::new("list", any_list()))
            .param(Parameter::new("size", Type::Number))
            .returns_with(|types| Type::list(first_type(types))),
    )?;
    registry.register(
        Function::new("coalesce", coalesce)
            .variadic(Parameter::new("vals", Type::Dynamic).allow_null())
            .returns_with(|types| unify(types).unwrap_or(Type::Dynamic)),
    )?;
    registry.register(
        Function::new("coalescelist", coalescelist)
            .variadic(Parameter::new("vals", Type::Dynamic))
            .min_args(1)
            .returns(Type::Dynamic),
    )?;
    registry.register(
        Function::new("compact", compact)
            .param(Parameter::new("list", Type::list(Type::String)))
            .returns(Type::list(Type::String)),
    )?;
    registry.register(
        Function::new("concat", concat)
            .variadic(Parameter::new("seqs", Type::Dynamic))
            .min_args(1)
            .returns(Type::Dynamic),
    )?;
    registry.register(
        Function::new("distinct", distinct)
            .param(Parameter::new("list", any_list()))
            .returns_with(first_type),
    )?;
    registry.register(
        Function::new("flatten", flatten)
            .param(Parameter::new("list", Type::Dynamic))
            .returns(Type::Dynamic),
    )?;
    registry.register(
        Function::new("list", list)
            .variadic(Parameter::new("vals", Type::Dynamic))
            .returns_with(|types| Type::list(unify(types).unwrap_or(Type::Dynamic))),
    )?;
    registry.register(
        Function::new("map", map)
            .variadic(Parameter::new("vals", Type::Dynamic))
            .returns(Type::map(Type::Dynamic)),
    )?;
    registry.register(
        Function::new("matchkeys", matchkeys)
            .param(Parameter::new("values", any_list()))
            .param(Parameter::new("keys", any_list()))
            .param(Parameter::new("searchset", any_list()))
            .returns_with(first_type),
    )?;
    registry.register(
        Function::new("merge", merge)
            .variadic(Parameter::new("maps", Type::Dynamic).allow_null())
            .returns(Type::Dynamic),
    )?;
    registry.register(
        Function::new("reverse", reverse)
            .param(Parameter::new("list", Type::Dynamic))
            .returns(Type::Dynamic),
    )?;
    registry.register(
        Function::new("setproduct", setproduct)
            .variadic(Parameter::new("sets", Type::Dynamic))
            .min_args(2)
            .returns(Type::Dynamic),
    )?;
    registry.register(
        Function::new("slice", slice)
            .param(Parameter::new("list", any_list()))
            .param(Parameter::new("start_index", Type::Number))
            .param(Parameter::new("end_index", Type::Number))
            .returns_with(first_type),
    )?;
    registry.register(
        Function::new("transpose", transpose)
            .param(Parameter::new("values", Type::map(Type::list(Type::String))))
            .returns(Type::map(Type::list(Type::String))),
    )?;
    registry.register(
        Function::new("zipmap", zipmap)
            .param(Parameter::new("keys", Type::list(Type::String)))
            .param(Parameter::new("values", Type::Dynamic))
            .returns(Type::Dynamic),
    )?;
    Ok(())
}

fn keys_type(types: &[Type]) -> Type {
    match types.first() {
        Some(Type::Object(attrs)) => Type::Tuple(vec![Type::String; attrs.len()]),
        Some(Type::Map(_)) => Type::list(Type::String),
        _ => Type::Dynamic,
    }
}

fn values_type(types: &[Type]) -> Type {
    match types.first() {
        Some(Type::Object(attrs)) => Type::Tuple(attrs.values().cloned().collect()),
        Some(Type::Map(element)) => Type::list(element.as_ref().clone()),
        _ => Type::Dynamic,
    }
}

/// Convert `value` towards a collection's element type so numerically or
/// textually equal values compare equal
fn as_element(value: &Value, element: &Type) -> Value {
    convert(value, element).unwrap_or_else(|_| value.clone())
}

fn contains(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = get_elements_arg(args, 0)?;
    let needle = as_element(&args[1], &element_type(args, 0));
    Ok(Value::Bool(items.contains(&needle)))
}

fn index(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = get_elements_arg(args, 0)?;
    let needle = as_element(&args[1], &element_type(args, 0));
    items
        .iter()
        .position(|item| *item == needle)
        .map(|i| Value::int(i as i64))
        .ok_or_else(|| EvalError::invalid("item not found"))
}

fn length(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let value = &args[0];
    if !value.is_known() {
        return Ok(Value::unknown(Type::Number));
    }
    if let Some(s) = value.as_str() {
        return Ok(Value::int(s.chars().count() as i64));
    }
    value
        .length()
        .map(|n| Value::int(n as i64))
        .ok_or_else(|| {
            EvalError::argument(
                0,
                format!("argument must be a string, a collection type, or a structural type, not {}", value.ty()),
            )
        })
}

fn element(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = get_elements_arg(args, 0)?;
    let idx = get_int_arg(args, 1)?;
    if items.is_empty() {
        return Err(EvalError::invalid("cannot use element function with an empty list"));
    }
    if idx < 0 {
        return Err(EvalError::argument(
            1,
            "cannot use element function with a negative index",
        ));
    }
    let wrapped = (idx as usize) % items.len();
    Ok(items[wrapped].clone())
}

fn lookup(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let key = get_string_arg(args, 1)?;
    let defaults = &args[2..];
    if defaults.len() > 1 {
        return Err(EvalError::argument(
            3,
            "lookup() takes no more than one default argument",
        ));
    }
    let entries = args[0].entries().ok_or_else(|| {
        EvalError::argument(
            0,
            format!("the first argument must be a map or object, not {}", args[0].ty()),
        )
    })?;

    if let Some(found) = entries.get(key) {
        return Ok(found.clone());
    }
    match defaults.first() {
        // A map keeps its element type for the fallback value too
        Some(default) => Ok(match &args[0] {
            Value::Map(element, _) => as_element(default, element),
            _ => default.clone(),
        }),
        None => Err(EvalError::invalid(format!(
            "lookup failed to find key \"{}\"",
            key
        ))),
    }
}

fn keys(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    match &args[0] {
        Value::Object(attrs) => Ok(Value::tuple(
            attrs.keys().map(|k| Value::string(k.as_str())).collect(),
        )),
        Value::Map(_, entries) => Ok(Value::list_of(
            Type::String,
            entries.keys().map(|k| Value::string(k.as_str())).collect(),
        )),
        other => Err(EvalError::argument(
            0,
            format!("must have map or object type, not {}", other.ty()),
        )),
    }
}

fn values(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    match &args[0] {
        Value::Object(attrs) => Ok(Value::tuple(attrs.values().cloned().collect())),
        Value::Map(element, entries) => Ok(Value::list_of(
            element.clone(),
            entries.values().cloned().collect(),
        )),
        other => Err(EvalError::argument(
            0,
            format!("must have map or object type, not {}", other.ty()),
        )),
    }
}

fn chunklist(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = get_elements_arg(args, 0)?;
    let size = get_int_arg(args, 1)?;
    let list_ty = args[0].ty();
    if size < 0 {
        return Err(EvalError::argument(1, "the size argument must be positive"));
    }
    if items.is_empty() {
        return Ok(Value::list_of(list_ty, Vec::new()));
    }

    let element = element_type(args, 0);
    // Size zero puts everything in one chunk
    let size = if size == 0 { items.len() } else { size as usize };
    let chunks = items
        .chunks(size)
        .map(|chunk| Value::list_of(element.clone(), chunk.to_vec()))
        .collect();
    Ok(Value::list_of(list_ty, chunks))
}

fn coalesce(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let types: Vec<Type> = args.iter().map(Value::ty).collect();
    let unified = unify(&types).ok_or_else(|| {
        EvalError::invalid("all arguments must have the same type")
    })?;

    let found = args.iter().find(|v| match v {
        Value::Null(_) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    });
    let found = found.ok_or_else(|| {
        EvalError::invalid("no non-null, non-empty-string arguments")
    })?;
    Ok(convert(found, &unified)?)
}

fn coalescelist(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let mut member_types = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        match arg {
            Value::List(element, _) => member_types.push(element.clone()),
            Value::Tuple(items) => member_types.extend(items.iter().map(Value::ty)),
            other => {
                return Err(EvalError::argument(
                    i,
                    format!(
                        "coalescelist arguments must be lists or tuples, got {}",
                        other.ty()
                    ),
                ))
            }
        }
    }

    let found = args
        .iter()
        .find(|arg| arg.length().is_some_and(|n| n > 0))
        .ok_or_else(|| EvalError::invalid("no non-null arguments"))?;
    match unify(&member_types) {
        Some(element) => Ok(convert(found, &Type::list(element))?),
        None => Ok(found.clone()),
    }
}

fn compact(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = get_elements_arg(args, 0)?;
    let kept = items
        .into_iter()
        .filter(|item| item.as_str().is_some_and(|s| !s.is_empty()))
        .collect();
    Ok(Value::list_of(Type::String, kept))
}

fn concat(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let mut items = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        match arg {
            Value::List(..) | Value::Tuple(_) => items.extend(arg.elements().unwrap_or_default()),
            other => {
                return Err(EvalError::argument(
                    i,
                    format!("all arguments must be lists or tuples; got {}", other.ty()),
                ))
            }
        }
    }
    Ok(list_or_tuple(items))
}

fn distinct(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = get_elements_arg(args, 0)?;
    let unique: IndexSet<Value> = items.into_iter().collect();
    Ok(Value::list_of(
        element_type(args, 0),
        unique.into_iter().collect(),
    ))
}

fn flatten(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = args[0].elements().ok_or_else(|| {
        EvalError::argument(
            0,
            format!("can only flatten lists, sets and tuples, not {}", args[0].ty()),
        )
    })?;
    let mut flat = Vec::new();
    flatten_into(items, &mut flat);
    Ok(list_or_tuple(flat))
}

fn flatten_into(items: Vec<Value>, out: &mut Vec<Value>) {
    for item in items {
        match item.elements() {
            Some(nested) => flatten_into(nested, out),
            None => out.push(item),
        }
    }
}

fn list(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let types: Vec<Type> = args.iter().map(Value::ty).collect();
    let element = unify(&types)
        .ok_or_else(|| EvalError::invalid("all arguments must have the same type"))?;
    let items = args
        .iter()
        .map(|v| convert(v, &element))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::list_of(element, items))
}

fn map(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    if args.len() % 2 != 0 {
        return Err(EvalError::invalid("map takes an even number of arguments"));
    }

    let mut entries = BTreeMap::new();
    for (pair, chunk) in args.chunks(2).enumerate() {
        let key_index = pair * 2;
        let key = convert(&chunk[0], &Type::String)
            .ok()
            .and_then(|k| k.as_str().map(str::to_string))
            .ok_or_else(|| {
                EvalError::argument(key_index, "keys must be strings")
            })?;
        if entries.insert(key.clone(), chunk[1].clone()).is_some() {
            return Err(EvalError::argument(
                key_index,
                format!("argument {} is a duplicate key: \"{}\"", key_index + 1, key),
            ));
        }
    }

    let types: Vec<Type> = entries.values().map(Value::ty).collect();
    let element = unify(&types).ok_or_else(|| {
        EvalError::invalid("all map values must have the same type")
    })?;
    let entries = entries
        .into_iter()
        .map(|(k, v)| convert(&v, &element).map(|v| (k, v)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(Value::map_of(element, entries))
}

fn matchkeys(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let values = get_elements_arg(args, 0)?;
    let keys = get_elements_arg(args, 1)?;
    let searchset = get_elements_arg(args, 2)?;
    if values.len() != keys.len() {
        return Err(EvalError::invalid("length of keys and values should be equal"));
    }

    let key_type = element_type(args, 1);
    let searchset: Vec<Value> = searchset
        .iter()
        .map(|s| as_element(s, &key_type))
        .collect();
    let matched = values
        .into_iter()
        .zip(keys)
        .filter(|(_, key)| searchset.contains(key))
        .map(|(value, _)| value)
        .collect();
    Ok(Value::list_of(element_type(args, 0), matched))
}

fn merge(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let mut merged = BTreeMap::new();
    let mut map_element: Option<Type> = None;
    let mut all_maps = true;

    for (i, arg) in args.iter().enumerate() {
        match arg {
            Value::Null(_) => continue,
            Value::Map(element, _) => match &map_element {
                Some(seen) if seen != element => all_maps = false,
                _ => map_element = Some(element.clone()),
            },
            Value::Object(_) => all_maps = false,
            other => {
                return Err(EvalError::argument(
                    i,
                    format!("arguments must be maps or objects, got {}", other.ty()),
                ))
            }
        }
        if let Some(entries) = arg.entries() {
            // Later arguments take precedence
            merged.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    match map_element {
        Some(element) if all_maps => Ok(Value::map_of(element, merged)),
        _ => Ok(Value::object(merged)),
    }
}

fn reverse(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    match &args[0] {
        Value::Tuple(items) => Ok(Value::tuple(items.iter().rev().cloned().collect())),
        Value::List(element, items) => Ok(Value::list_of(
            element.clone(),
            items.iter().rev().cloned().collect(),
        )),
        Value::Set(element, items) => Ok(Value::list_of(
            element.clone(),
            items.iter().rev().cloned().collect(),
        )),
        other => Err(EvalError::argument(
            0,
            format!("can only reverse list, set or tuple values, not {}", other.ty()),
        )),
    }
}

fn setproduct(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    if args.len() < 2 {
        return Err(EvalError::invalid("at least two arguments are required"));
    }
    let mut sequences = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let items = arg.elements().ok_or_else(|| {
            EvalError::argument(
                i,
                format!("a set, list or tuple is required, not {}", arg.ty()),
            )
        })?;
        sequences.push(items);
    }

    // Row-major: the last sequence varies fastest
    let mut rows: Vec<Vec<Value>> = vec![Vec::new()];
    for items in &sequences {
        rows = rows
            .into_iter()
            .flat_map(|row| {
                items.iter().map(move |item| {
                    let mut next = row.clone();
                    next.push(item.clone());
                    next
                })
            })
            .collect();
    }

    let rows: Vec<Value> = rows.into_iter().map(Value::tuple).collect();
    let row_types: Vec<Type> = rows.iter().map(Value::ty).collect();
    let row_type = unify(&row_types).unwrap_or(Type::Dynamic);
    if args.iter().all(|a| matches!(a, Value::Set(..))) {
        Ok(Value::set_of(row_type, rows))
    } else {
        Ok(Value::list_of(row_type, rows))
    }
}

fn slice(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let items = get_elements_arg(args, 0)?;
    let start = get_int_arg(args, 1)?;
    let end = get_int_arg(args, 2)?;

    if start < 0 {
        return Err(EvalError::argument(
            1,
            "from index must be greater than or equal to 0",
        ));
    }
    if end > items.len() as i64 {
        return Err(EvalError::argument(
            2,
            "to index must be less than or equal to the length of the input list",
        ));
    }
    if start > end {
        return Err(EvalError::argument(
            1,
            "from index must be less than or equal to index",
        ));
    }
    Ok(Value::list_of(
        element_type(args, 0),
        items[start as usize..end as usize].to_vec(),
    ))
}

fn transpose(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let entries = args[0]
        .entries()
        .ok_or_else(|| EvalError::argument(0, "a map of lists of strings is required"))?;

    let mut inverted: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (key, list) in entries {
        for item in list.elements().unwrap_or_default() {
            let Some(s) = item.as_str() else {
                return Err(EvalError::argument(
                    0,
                    format!("input must not contain null list elements (key \"{}\")", key),
                ));
            };
            inverted
                .entry(s.to_string())
                .or_default()
                .push(Value::string(key.as_str()));
        }
    }

    let string_list = Type::list(Type::String);
    Ok(Value::map_of(
        string_list,
        inverted
            .into_iter()
            .map(|(k, v)| (k, Value::list_of(Type::String, v)))
            .collect(),
    ))
}

fn zipmap(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let keys = get_elements_arg(args, 0)?;
    let values = args[1].elements().ok_or_else(|| {
        EvalError::argument(
            1,
            format!("values must be a list or tuple, not {}", args[1].ty()),
        )
    })?;
    if keys.len() != values.len() {
        return Err(EvalError::invalid(format!(
            "number of keys ({}) does not match number of values ({})",
            keys.len(),
            values.len()
        )));
    }

    let mut entries = BTreeMap::new();
    for (i, (key, value)) in keys.into_iter().zip(values).enumerate() {
        let key = key
            .as_str()
            .ok_or_else(|| EvalError::argument(0, format!("key {} must not be null", i)))?;
        entries.insert(key.to_string(), value);
    }

    match &args[1] {
        Value::Tuple(_) => Ok(Value::object(entries)),
        _ => Ok(Value::map_of(element_type(args, 1), entries)),
    }
}
