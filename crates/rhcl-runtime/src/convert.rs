//! Type conversion and unification
//!
//! These are the only places values change type. Function dispatch calls
//! [`convert`] once per argument; implementations never coerce on their own.

use std::collections::BTreeMap;
use std::fmt;
use rhcl_parser::{parse_number, ParseError};

use crate::error::ConversionError;
use crate::types::Type;
use crate::value::{format_number, Value};

/// Convert `value` to type `want`
pub fn convert(value: &Value, want: &Type) -> Result<Value, ConversionError> {
    if want.is_dynamic() {
        return Ok(value.clone());
    }

    match value {
        Value::Unknown(ty) => {
            return if can_convert(ty, want) {
                Ok(Value::Unknown(want.clone()))
            } else {
                Err(mismatch(want, ty))
            };
        }
        Value::Null(ty) => {
            return if can_convert(ty, want) {
                Ok(Value::Null(want.clone()))
            } else {
                Err(mismatch(want, ty))
            };
        }
        _ => {}
    }

    let have = value.ty();
    if have == *want {
        return Ok(value.clone());
    }

    match want {
        Type::Dynamic => Ok(value.clone()),
        Type::Bool => match value.as_str() {
            Some("true") => Ok(Value::Bool(true)),
            Some("false") => Ok(Value::Bool(false)),
            Some(s) => Err(ConversionError::new(format!(
                "a bool is required, but \"{}\" is not \"true\" or \"false\"",
                s
            ))),
            None => Err(mismatch(want, &have)),
        },
        Type::Number => match value.as_str() {
            Some(s) => match parse_number(s.trim()) {
                Ok(n) => Ok(Value::Number(n)),
                Err(ParseError::NumberOutOfRange(_)) => Err(ConversionError::new(format!(
                    "\"{}\" is out of the supported number range",
                    s
                ))),
                Err(_) => Err(ConversionError::new(format!(
                    "a number is required, but \"{}\" is not a valid number",
                    s
                ))),
            },
            None => Err(mismatch(want, &have)),
        },
        Type::String => match value {
            Value::Bool(b) => Ok(Value::string(b.to_string())),
            Value::Number(n) => Ok(Value::string(format_number(n))),
            _ => Err(mismatch(want, &have)),
        },
        Type::List(element) => {
            let items = value.elements().ok_or_else(|| mismatch(want, &have))?;
            let (ty, items) = convert_elements(items, element)?;
            Ok(Value::list_of(ty, items))
        }
        Type::Set(element) => {
            let items = value.elements().ok_or_else(|| mismatch(want, &have))?;
            let (ty, items) = convert_elements(items, element)?;
            Ok(Value::set_of(ty, items))
        }
        Type::Map(element) => {
            let entries = value.entries().ok_or_else(|| mismatch(want, &have))?;
            let (ty, entries) = convert_entries(entries, element)?;
            Ok(Value::map_of(ty, entries))
        }
        Type::Tuple(elements) => {
            let items = value.elements().ok_or_else(|| mismatch(want, &have))?;
            if items.len() != elements.len() {
                return Err(ConversionError::new(format!(
                    "tuple required with {} elements, but have {}",
                    elements.len(),
                    items.len()
                )));
            }
            let items = items
                .iter()
                .zip(elements)
                .enumerate()
                .map(|(i, (item, ty))| convert(item, ty).map_err(|e| e.at(Element(i))))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::tuple(items))
        }
        Type::Object(attrs) => {
            let entries = value.entries().ok_or_else(|| mismatch(want, &have))?;
            let mut converted = BTreeMap::new();
            // Attributes absent from the target type are dropped
            for (name, ty) in attrs {
                let v = entries.get(name).ok_or_else(|| {
                    ConversionError::new(format!("attribute \"{}\" is required", name))
                })?;
                converted.insert(
                    name.clone(),
                    convert(v, ty).map_err(|e| e.at(Attribute(name)))?,
                );
            }
            Ok(Value::object(converted))
        }
    }
}

/// Whether some value of type `from` may convert to `to`
pub fn can_convert(from: &Type, to: &Type) -> bool {
    if from.is_dynamic() || to.is_dynamic() || from == to {
        return true;
    }
    match (from, to) {
        (Type::Bool | Type::Number, Type::String) => true,
        (Type::String, Type::Bool | Type::Number) => true,
        (Type::List(f) | Type::Set(f), Type::List(t) | Type::Set(t)) => can_convert(f, t),
        (Type::Tuple(fs), Type::List(t) | Type::Set(t)) => {
            fs.iter().all(|f| can_convert(f, t)) && (!t.is_dynamic() || unify(fs).is_some())
        }
        (Type::Map(f), Type::Map(t)) => can_convert(f, t),
        (Type::Object(fs), Type::Map(t)) => {
            fs.values().all(|f| can_convert(f, t))
                && (!t.is_dynamic() || unify(&fs.values().cloned().collect::<Vec<_>>()).is_some())
        }
        (Type::Tuple(fs), Type::Tuple(ts)) => {
            fs.len() == ts.len() && fs.iter().zip(ts).all(|(f, t)| can_convert(f, t))
        }
        (Type::List(f) | Type::Set(f), Type::Tuple(ts)) => ts.iter().all(|t| can_convert(f, t)),
        (Type::Object(fs), Type::Object(ts)) => ts
            .iter()
            .all(|(name, t)| fs.get(name).is_some_and(|f| can_convert(f, t))),
        (Type::Map(f), Type::Object(ts)) => ts.values().all(|t| can_convert(f, t)),
        _ => false,
    }
}

/// Find a single type every input type converts to
///
/// Dynamic members (untyped nulls and unknowns) adopt whatever the others
/// unify to.
pub fn unify(types: &[Type]) -> Option<Type> {
    let concrete: Vec<&Type> = types.iter().filter(|t| !t.is_dynamic()).collect();
    let Some(first) = concrete.first().copied() else {
        return Some(Type::Dynamic);
    };
    if concrete.iter().all(|t| *t == first) {
        return Some(first.clone());
    }

    if concrete.iter().all(|t| t.is_primitive()) {
        // Everything primitive renders as a string, nothing else is common
        return concrete
            .iter()
            .any(|t| **t == Type::String)
            .then_some(Type::String);
    }

    if concrete.iter().all(|t| matches!(t, Type::List(_))) {
        return unify_elements(&concrete).map(Type::list);
    }
    if concrete.iter().all(|t| matches!(t, Type::Set(_))) {
        return unify_elements(&concrete).map(Type::set);
    }
    if concrete.iter().all(|t| matches!(t, Type::Map(_))) {
        return unify_elements(&concrete).map(Type::map);
    }

    if let Some(unified) = unify_tuples(&concrete) {
        return Some(unified);
    }
    if concrete
        .iter()
        .all(|t| matches!(t, Type::List(_) | Type::Set(_) | Type::Tuple(_)))
    {
        return unify(&member_types(&concrete)).map(Type::list);
    }

    if let Some(unified) = unify_objects(&concrete) {
        return Some(unified);
    }
    if concrete
        .iter()
        .all(|t| matches!(t, Type::Map(_) | Type::Object(_)))
    {
        return unify(&member_types(&concrete)).map(Type::map);
    }

    None
}

fn unify_elements(types: &[&Type]) -> Option<Type> {
    let elements: Vec<Type> = types
        .iter()
        .filter_map(|t| t.element_type().cloned())
        .collect();
    unify(&elements)
}

fn unify_tuples(types: &[&Type]) -> Option<Type> {
    let tuples: Vec<&Vec<Type>> = types
        .iter()
        .map(|t| match t {
            Type::Tuple(elems) => Some(elems),
            _ => None,
        })
        .collect::<Option<_>>()?;
    let len = tuples.first()?.len();
    if tuples.iter().any(|t| t.len() != len) {
        return None;
    }
    (0..len)
        .map(|i| unify(&tuples.iter().map(|t| t[i].clone()).collect::<Vec<_>>()))
        .collect::<Option<Vec<_>>>()
        .map(Type::Tuple)
}

fn unify_objects(types: &[&Type]) -> Option<Type> {
    let objects: Vec<&BTreeMap<String, Type>> = types
        .iter()
        .map(|t| match t {
            Type::Object(attrs) => Some(attrs),
            _ => None,
        })
        .collect::<Option<_>>()?;
    let first = objects.first()?;
    if objects
        .iter()
        .any(|attrs| !attrs.keys().eq(first.keys()))
    {
        return None;
    }
    first
        .keys()
        .map(|name| {
            let candidates: Vec<Type> = objects.iter().map(|attrs| attrs[name].clone()).collect();
            unify(&candidates).map(|t| (name.clone(), t))
        })
        .collect::<Option<BTreeMap<_, _>>>()
        .map(Type::Object)
}

/// Every element/attribute type of a group of collection and structural types
fn member_types(types: &[&Type]) -> Vec<Type> {
    let mut members = Vec::new();
    for ty in types {
        match ty {
            Type::List(t) | Type::Set(t) | Type::Map(t) => members.push(t.as_ref().clone()),
            Type::Tuple(elems) => members.extend(elems.iter().cloned()),
            Type::Object(attrs) => members.extend(attrs.values().cloned()),
            _ => {}
        }
    }
    members
}

/// Convert sequence elements to `element`, settling a dynamic element type
/// by unifying what the elements turned into
pub fn convert_elements(
    items: Vec<Value>,
    element: &Type,
) -> Result<(Type, Vec<Value>), ConversionError> {
    let converted = items
        .iter()
        .enumerate()
        .map(|(i, item)| convert(item, element).map_err(|e| e.at(Element(i))))
        .collect::<Result<Vec<_>, _>>()?;
    if !element.has_dynamic() {
        return Ok((element.clone(), converted));
    }

    let types: Vec<Type> = converted.iter().map(Value::ty).collect();
    let unified = unify(&types).ok_or_else(|| {
        ConversionError::new("all elements must have the same type".to_string())
    })?;
    if unified.is_dynamic() {
        return Ok((element.clone(), converted));
    }
    let converted = converted
        .iter()
        .enumerate()
        .map(|(i, item)| convert(item, &unified).map_err(|e| e.at(Element(i))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((unified, converted))
}

fn convert_entries(
    entries: &BTreeMap<String, Value>,
    element: &Type,
) -> Result<(Type, BTreeMap<String, Value>), ConversionError> {
    let convert_all = |entries: &BTreeMap<String, Value>, ty: &Type| {
        entries
            .iter()
            .map(|(k, v)| {
                convert(v, ty)
                    .map(|v| (k.clone(), v))
                    .map_err(|e| e.at(Key(k)))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
    };

    let converted = convert_all(entries, element)?;
    if !element.has_dynamic() {
        return Ok((element.clone(), converted));
    }

    let types: Vec<Type> = converted.values().map(Value::ty).collect();
    let unified = unify(&types).ok_or_else(|| {
        ConversionError::new("all map elements must have the same type".to_string())
    })?;
    if unified.is_dynamic() {
        return Ok((element.clone(), converted));
    }
    let converted = convert_all(&converted, &unified)?;
    Ok((unified, converted))
}

fn mismatch(want: &Type, have: &Type) -> ConversionError {
    ConversionError::new(format!("{} required, but have {}", want, have))
}

struct Element(usize);

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element {}", self.0)
    }
}

struct Key<'a>(&'a str);

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element \"{}\"", self.0)
    }
}

struct Attribute<'a>(&'a str);

impl fmt::Display for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attribute \"{}\"", self.0)
    }
}

impl ConversionError {
    /// Prefix the message with the location of the offending member
    fn at(self, path: impl fmt::Display) -> Self {
        ConversionError::new(format!("{}: {}", path, self.message))
    }
}
