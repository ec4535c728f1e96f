//! Static types of runtime values

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConversionError;

/// The static shape of a value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    /// Type not known until runtime
    Dynamic,
    Bool,
    Number,
    String,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Tuple(Vec<Type>),
    Object(BTreeMap<String, Type>),
}

impl Type {
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    pub fn set(element: Type) -> Self {
        Type::Set(Box::new(element))
    }

    pub fn map(element: Type) -> Self {
        Type::Map(Box::new(element))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Bool | Type::Number | Type::String)
    }

    /// List, set or map
    pub fn is_collection(&self) -> bool {
        matches!(self, Type::List(_) | Type::Set(_) | Type::Map(_))
    }

    /// Element type of a list, set or map
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::List(t) | Type::Set(t) | Type::Map(t) => Some(t),
            _ => None,
        }
    }

    /// Whether the dynamic pseudo-type appears anywhere in this type
    pub fn has_dynamic(&self) -> bool {
        match self {
            Type::Dynamic => true,
            Type::Bool | Type::Number | Type::String => false,
            Type::List(t) | Type::Set(t) | Type::Map(t) => t.has_dynamic(),
            Type::Tuple(elems) => elems.iter().any(Type::has_dynamic),
            Type::Object(attrs) => attrs.values().any(Type::has_dynamic),
        }
    }
}

/// Friendly names used in diagnostics
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dynamic => write!(f, "dynamic"),
            Type::Bool => write!(f, "bool"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::List(t) => write!(f, "list of {}", t),
            Type::Set(t) => write!(f, "set of {}", t),
            Type::Map(t) => write!(f, "map of {}", t),
            Type::Tuple(_) => write!(f, "tuple"),
            Type::Object(_) => write!(f, "object"),
        }
    }
}

/// Parses type constraints such as `string`, `list(number)` or `map(any)`
impl FromStr for Type {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "any" | "dynamic" => return Ok(Type::Dynamic),
            "bool" => return Ok(Type::Bool),
            "number" => return Ok(Type::Number),
            "string" => return Ok(Type::String),
            _ => {}
        }

        let (kind, rest) = s
            .split_once('(')
            .ok_or_else(|| ConversionError::new(format!("unknown type \"{}\"", s)))?;
        let inner = rest
            .strip_suffix(')')
            .ok_or_else(|| ConversionError::new(format!("unbalanced parentheses in \"{}\"", s)))?;
        let element: Type = inner.parse()?;
        match kind.trim() {
            "list" => Ok(Type::list(element)),
            "set" => Ok(Type::set(element)),
            "map" => Ok(Type::map(element)),
            other => Err(ConversionError::new(format!(
                "unknown collection type \"{}\"",
                other
            ))),
        }
    }
}
