//! Variable loading for the `eval` command
//!
//! Variables come from `--var NAME=JSON` flags and `--vars-file` documents
//! (JSON or YAML). Arrays become tuples and mappings become objects, matching
//! what the same literal would produce in an expression.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use rhcl_parser::parse_number;
use rhcl_runtime::{StaticData, Value};

type VarResult<T> = Result<T, Box<dyn Error>>;

/// Build the data provider from a vars file and individual assignments.
/// Assignments override entries from the file.
pub fn load(file: Option<&Path>, assignments: &[String]) -> VarResult<StaticData> {
    let mut data = StaticData::new();

    if let Some(path) = file {
        let source = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&source)
            .map_err(|e| format!("invalid vars file {}: {}", path.display(), e))?;
        match from_yaml(doc)? {
            Value::Object(attrs) => {
                for (name, value) in attrs.iter() {
                    data.insert(name.clone(), value.clone());
                }
            }
            Value::Null(_) => {}
            other => {
                return Err(format!(
                    "vars file {} must contain a mapping, found {}",
                    path.display(),
                    other.ty()
                )
                .into())
            }
        }
    }

    for assignment in assignments {
        let (name, value) = parse_assignment(assignment)?;
        data.insert(name, value);
    }

    Ok(data)
}

/// Parse `NAME=JSON`. A value that is not valid JSON is taken as a string.
pub fn parse_assignment(assignment: &str) -> VarResult<(String, Value)> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| format!("invalid variable \"{}\": expected NAME=VALUE", assignment))?;
    let name = name.trim();
    if !is_identifier(name) {
        return Err(format!("invalid variable name \"{}\"", name).into());
    }
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => from_json(json)?,
        Err(_) => Value::string(raw),
    };
    Ok((name.to_string(), value))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn number(text: &str) -> VarResult<Value> {
    let n = parse_number(text).map_err(|e| format!("invalid variable value: {}", e))?;
    Ok(Value::number(n))
}

pub fn from_json(json: serde_json::Value) -> VarResult<Value> {
    use serde_json::Value as Json;

    Ok(match json {
        Json::Null => Value::null(),
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number(&n.to_string())?,
        Json::String(s) => Value::string(s),
        Json::Array(items) => Value::tuple(
            items
                .into_iter()
                .map(from_json)
                .collect::<VarResult<Vec<_>>>()?,
        ),
        Json::Object(entries) => {
            let mut attrs = BTreeMap::new();
            for (k, v) in entries {
                attrs.insert(k, from_json(v)?);
            }
            Value::object(attrs)
        }
    })
}

pub fn from_yaml(yaml: serde_yaml::Value) -> VarResult<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::null(),
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => number(&n.to_string())?,
        Yaml::String(s) => Value::string(s),
        Yaml::Sequence(items) => Value::tuple(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<VarResult<Vec<_>>>()?,
        ),
        Yaml::Mapping(entries) => {
            let mut attrs = BTreeMap::new();
            for (k, v) in entries {
                let key = match k {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key {:?}", other).into()),
                };
                attrs.insert(key, from_yaml(v)?);
            }
            Value::object(attrs)
        }
        Yaml::Tagged(tagged) => from_yaml(tagged.value)?,
    })
}
