//! rhcl Standard Library
//!
//! This crate provides the function catalog: numeric, network, collection,
//! conversion, string and filesystem functions, each module registering its
//! functions into a [`FunctionRegistry`].

mod args;
mod cidr;
mod collections;
mod conversion;
mod filesystem;
mod math;
mod string;

use rhcl_runtime::{FunctionRegistry, RegistryError};

/// Register all standard library functions
pub fn register_stdlib(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    math::register(registry)?;
    cidr::register(registry)?;
    collections::register(registry)?;
    conversion::register(registry)?;
    string::register(registry)?;
    filesystem::register(registry)?;
    Ok(())
}

/// Create a registry with all stdlib functions registered
pub fn stdlib_registry() -> Result<FunctionRegistry, RegistryError> {
    let mut registry = FunctionRegistry::new();
    register_stdlib(&mut registry)?;
    Ok(registry)
}
