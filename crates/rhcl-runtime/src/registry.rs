//! Function registry

use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::function::Function;

/// Name to function mapping, built once and then shared read-only
#[derive(Debug, Default, Clone)]
pub struct FunctionRegistry {
    functions: IndexMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function; names are case-sensitive and must be unique
    pub fn register(&mut self, function: Function) -> Result<(), RegistryError> {
        if self.functions.contains_key(&function.name) {
            return Err(RegistryError::Duplicate(function.name));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Functions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn constant(name: &str) -> Function {
        Function::new(name, |_, _| Ok(Value::int(1)))
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = FunctionRegistry::new();
        registry.register(constant("one")).unwrap();
        assert_eq!(
            registry.register(constant("one")),
            Err(RegistryError::Duplicate("one".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut registry = FunctionRegistry::new();
        registry.register(constant("upper")).unwrap();
        assert!(registry.get("upper").is_some());
        assert!(registry.get("Upper").is_none());
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = FunctionRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(constant(name)).unwrap();
        }
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FunctionRegistry>();
    }
}
