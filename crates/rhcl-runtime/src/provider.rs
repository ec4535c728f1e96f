//! Variable resolution for reference expressions

use std::collections::{BTreeMap, BTreeSet};

use rhcl_parser::{Reference, TraversalKey, Traverser};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::value::Value;

/// Outcome of resolving a reference
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Known(Value),
    /// Exists but not computed yet
    Pending,
    /// No such name
    Undefined,
    Failed(Diagnostics),
}

/// Source of values for references
///
/// Must answer the same reference the same way for the whole of one
/// evaluation, and be safe to read from several threads.
pub trait DataProvider: Send + Sync {
    fn resolve(&self, reference: &Reference) -> Resolution;
}

/// Provider with no variables at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoData;

impl DataProvider for NoData {
    fn resolve(&self, _reference: &Reference) -> Resolution {
        Resolution::Undefined
    }
}

/// Provider backed by a fixed set of root values
#[derive(Debug, Default, Clone)]
pub struct StaticData {
    values: BTreeMap<String, Value>,
    pending: BTreeSet<String>,
}

impl StaticData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Declare a name whose value is not known yet
    pub fn mark_pending(&mut self, name: impl Into<String>) {
        self.pending.insert(name.into());
    }

    pub fn len(&self) -> usize {
        self.values.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataProvider for StaticData {
    fn resolve(&self, reference: &Reference) -> Resolution {
        let name = reference.root_name();
        if self.pending.contains(name) {
            return Resolution::Pending;
        }
        let Some(mut current) = self.values.get(name).cloned() else {
            return Resolution::Undefined;
        };

        for step in &reference.steps {
            let next = match step {
                Traverser::Attr(attr) => current.get_attr(attr),
                Traverser::Index(TraversalKey::Int(i)) => current.index(&Value::int(*i)),
                Traverser::Index(TraversalKey::String(s)) => current.index(&Value::string(s.as_str())),
            };
            current = match next {
                Ok(v) => v,
                Err(err) => {
                    let diag = Diagnostic::error(
                        DiagnosticKind::InvalidExpression,
                        "Invalid reference",
                        format!("Cannot resolve \"{}\": {}.", reference, err),
                    )
                    .with_span(reference.span);
                    return Resolution::Failed(diag.into());
                }
            };
        }
        Resolution::Known(current)
    }
}
