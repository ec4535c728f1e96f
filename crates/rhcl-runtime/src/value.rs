//! Runtime value types for rhcl

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::convert::{convert, unify};
use crate::error::{EvalError, EvalResult};
use crate::types::Type;

/// The core runtime value type
///
/// The variant order doubles as the kind rank of the total order used for
/// sets: null < unknown < bool < number < string < list < set < map < tuple
/// < object. Within a kind, values compare by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Known to be absent, with the type it would have had
    Null(Type),

    /// Not yet known (e.g. during planning), with its type if known
    Unknown(Type),

    Bool(bool),

    /// Arbitrary precision number
    Number(BigDecimal),

    /// String (shared, immutable)
    String(Arc<str>),

    /// Homogeneous ordered sequence with its element type
    List(Type, Arc<Vec<Value>>),

    /// Deduplicated collection, iterated in value order
    Set(Type, Arc<BTreeSet<Value>>),

    /// String-keyed homogeneous collection
    Map(Type, Arc<BTreeMap<String, Value>>),

    /// Heterogeneous fixed-length sequence
    Tuple(Arc<Vec<Value>>),

    /// Heterogeneous fixed set of attributes
    Object(Arc<BTreeMap<String, Value>>),
}

impl Value {
    /// Untyped null
    pub fn null() -> Self {
        Value::Null(Type::Dynamic)
    }

    /// Unknown value of unknown type
    pub fn dynamic() -> Self {
        Value::Unknown(Type::Dynamic)
    }

    pub fn unknown(ty: Type) -> Self {
        Value::Unknown(ty)
    }

    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn number(n: impl Into<BigDecimal>) -> Self {
        Value::Number(n.into())
    }

    pub fn int(i: i64) -> Self {
        Value::Number(BigDecimal::from(i))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// List whose element type unifies the items' types
    pub fn list(items: Vec<Value>) -> Self {
        let (ty, items) = settle(items);
        Value::List(ty, Arc::new(items))
    }

    pub fn list_of(element: Type, items: Vec<Value>) -> Self {
        Value::List(element, Arc::new(items))
    }

    /// Set whose element type unifies the items' types
    pub fn set(items: Vec<Value>) -> Self {
        let (ty, items) = settle(items);
        Value::set_of(ty, items)
    }

    /// Set of `element` values
    ///
    /// Unknown members cannot be told apart, so a set holding any unknown is
    /// itself unknown: its size and contents are not settled yet.
    pub fn set_of(element: Type, items: impl IntoIterator<Item = Value>) -> Self {
        let items: Vec<Value> = items.into_iter().collect();
        if !items.iter().all(Value::is_wholly_known) {
            return Value::Unknown(Type::set(element));
        }
        Value::Set(element, Arc::new(items.into_iter().collect()))
    }

    /// Map whose element type unifies the entries' types
    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        let (keys, values): (Vec<String>, Vec<Value>) = entries.into_iter().unzip();
        let (ty, values) = settle(values);
        Value::Map(ty, Arc::new(keys.into_iter().zip(values).collect()))
    }

    pub fn map_of(element: Type, entries: BTreeMap<String, Value>) -> Self {
        Value::Map(element, Arc::new(entries))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Arc::new(items))
    }

    pub fn object(attrs: BTreeMap<String, Value>) -> Self {
        Value::Object(Arc::new(attrs))
    }

    /// Object from `(name, value)` pairs
    pub fn object_from<K: Into<String>>(attrs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::object(attrs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The static type of this value
    pub fn ty(&self) -> Type {
        match self {
            Value::Null(t) | Value::Unknown(t) => t.clone(),
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::List(t, _) => Type::list(t.clone()),
            Value::Set(t, _) => Type::set(t.clone()),
            Value::Map(t, _) => Type::map(t.clone()),
            Value::Tuple(items) => Type::Tuple(items.iter().map(Value::ty).collect()),
            Value::Object(attrs) => {
                Type::Object(attrs.iter().map(|(k, v)| (k.clone(), v.ty())).collect())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// False only for a top-level unknown
    pub fn is_known(&self) -> bool {
        !matches!(self, Value::Unknown(_))
    }

    /// True when no unknown appears anywhere inside this value
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown(_) => false,
            Value::List(_, items) | Value::Tuple(items) => items.iter().all(Value::is_wholly_known),
            Value::Set(_, items) => items.iter().all(Value::is_wholly_known),
            Value::Map(_, entries) | Value::Object(entries) => {
                entries.values().all(Value::is_wholly_known)
            }
            _ => true,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as number
    pub fn as_number(&self) -> Option<&BigDecimal> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Try to get as a whole number that fits in i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.is_integer() => n.to_i64(),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list, set or tuple, in iteration order
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(_, items) | Value::Tuple(items) => Some(items.as_ref().clone()),
            Value::Set(_, items) => Some(items.iter().cloned().collect()),
            _ => None,
        }
    }

    /// Entries of a map or object, in key order
    pub fn entries(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(_, entries) | Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Number of elements or entries
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::List(_, items) | Value::Tuple(items) => Some(items.len()),
            Value::Set(_, items) => Some(items.len()),
            Value::Map(_, entries) | Value::Object(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Index a list, tuple, map or object
    pub fn index(&self, key: &Value) -> EvalResult<Value> {
        if self.is_null() {
            return Err(EvalError::invalid("cannot index a null value"));
        }
        if !key.is_known() {
            return Ok(Value::Unknown(self.element_type_hint()));
        }
        if key.is_null() {
            return Err(EvalError::invalid("cannot index with a null key"));
        }

        match self {
            Value::Unknown(_) => Ok(Value::Unknown(self.element_type_hint())),
            Value::List(_, items) | Value::Tuple(items) => {
                let index = key_to_index(key)?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or(EvalError::IndexOutOfBounds {
                        index,
                        length: items.len(),
                    })
            }
            Value::Map(_, entries) | Value::Object(entries) => {
                let name = key_to_name(key)?;
                entries.get(&name).cloned().ok_or_else(|| {
                    EvalError::invalid(format!(
                        "the given key \"{}\" does not identify an element in this collection value",
                        name
                    ))
                })
            }
            Value::Set(..) => Err(EvalError::invalid(
                "elements of a set are identified only by their value and cannot be indexed",
            )),
            other => Err(EvalError::invalid(format!(
                "cannot index a value of type {}",
                other.ty()
            ))),
        }
    }

    /// Attribute access on an object (or an element of a map)
    pub fn get_attr(&self, name: &str) -> EvalResult<Value> {
        match self {
            Value::Unknown(Type::Object(attrs)) => Ok(Value::Unknown(
                attrs.get(name).cloned().unwrap_or(Type::Dynamic),
            )),
            Value::Unknown(_) => Ok(Value::Unknown(self.element_type_hint())),
            Value::Null(_) => Err(EvalError::invalid(format!(
                "cannot access attribute \"{}\" on a null value",
                name
            ))),
            Value::Object(attrs) | Value::Map(_, attrs) => {
                attrs.get(name).cloned().ok_or_else(|| {
                    EvalError::invalid(format!("this value does not have an attribute named \"{}\"", name))
                })
            }
            other => Err(EvalError::invalid(format!(
                "cannot access attribute \"{}\" on a value of type {}",
                name,
                other.ty()
            ))),
        }
    }

    fn element_type_hint(&self) -> Type {
        self.ty().element_type().cloned().unwrap_or(Type::Dynamic)
    }
}

/// Unify the items' types and convert every item to the result. Items with
/// no common type keep their own types under a dynamic element type.
fn settle(items: Vec<Value>) -> (Type, Vec<Value>) {
    let types: Vec<Type> = items.iter().map(Value::ty).collect();
    let Some(ty) = unify(&types).filter(|ty| !ty.is_dynamic()) else {
        return (Type::Dynamic, items);
    };
    match items
        .iter()
        .map(|item| convert(item, &ty))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(converted) => (ty, converted),
        Err(_) => (Type::Dynamic, items),
    }
}

fn key_to_index(key: &Value) -> EvalResult<i64> {
    match key {
        Value::Number(_) => key
            .as_i64()
            .ok_or_else(|| EvalError::invalid("index must be a whole number")),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| EvalError::invalid(format!("cannot use \"{}\" as a sequence index", s))),
        other => Err(EvalError::invalid(format!(
            "a number is required as an index, not {}",
            other.ty()
        ))),
    }
}

fn key_to_name(key: &Value) -> EvalResult<String> {
    match key {
        Value::String(s) => Ok(s.to_string()),
        Value::Number(n) => Ok(format_number(n)),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(EvalError::invalid(format!(
            "a string is required as a key, not {}",
            other.ty()
        ))),
    }
}

/// Render a number the way it appears in source: whole numbers without a
/// fractional part, others normalized
pub fn format_number(n: &BigDecimal) -> String {
    if n.is_integer() {
        n.with_scale(0).to_string()
    } else {
        n.normalized().to_string()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "null"),
            Value::Unknown(_) => write!(f, "(known after apply)"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(n)),
            Value::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::List(_, items) => {
                write!(f, "tolist(")?;
                write_seq(f, items.iter())?;
                write!(f, ")")
            }
            Value::Set(_, items) => {
                write!(f, "toset(")?;
                write_seq(f, items.iter())?;
                write!(f, ")")
            }
            Value::Map(_, entries) => {
                write!(f, "tomap(")?;
                write_entries(f, entries)?;
                write!(f, ")")
            }
            Value::Tuple(items) => write_seq(f, items.iter()),
            Value::Object(attrs) => write_entries(f, attrs),
        }
    }
}

fn write_seq<'a>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = &'a Value>) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

fn write_entries(f: &mut fmt::Formatter<'_>, entries: &BTreeMap<String, Value>) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (k, v)) in entries.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "\"{}\" = {}", escape_string(k), v)?;
    }
    write!(f, "}}")
}

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

// Serde serialization (unknown values serialize as null)
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null(_) | Value::Unknown(_) => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match (n.is_integer(), n.to_i64()) {
                (true, Some(i)) => serializer.serialize_i64(i),
                _ => serializer.serialize_f64(n.to_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::List(_, items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Set(_, items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(_, entries) | Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
