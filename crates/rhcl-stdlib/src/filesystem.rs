//! Filesystem functions
//!
//! Relative paths resolve against the scope's base directory. Reads are
//! marked impure so pure-only scopes never touch the disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rhcl_runtime::{
    EvalError, EvalResult, Function, FunctionRegistry, Parameter, RegistryError, Scope, Type,
    Value,
};
use tracing::debug;

use crate::args::get_string_arg;

pub fn register(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    registry.register(
        Function::new("file", file)
            .param(Parameter::new("path", Type::String))
            .returns(Type::String)
            .impure(),
    )?;
    registry.register(
        Function::new("fileexists", fileexists)
            .param(Parameter::new("path", Type::String))
            .returns(Type::Bool)
            .impure(),
    )?;
    registry.register(
        Function::new("pathexpand", pathexpand)
            .param(Parameter::new("path", Type::String))
            .returns(Type::String),
    )?;
    Ok(())
}

/// Expand a leading `~` to the current user's home directory
fn expand_home(path: &str) -> EvalResult<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return Ok(PathBuf::from(path)),
    };
    let home = dirs::home_dir()
        .ok_or_else(|| EvalError::invalid("cannot determine the home directory"))?;
    Ok(home.join(rest.trim_start_matches(['/', '\\'])))
}

fn resolve(scope: &Scope<'_>, path: &str) -> EvalResult<PathBuf> {
    let expanded = expand_home(path)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(scope.base_dir().join(expanded))
    }
}

fn read_file(path: &Path) -> EvalResult<String> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => EvalError::ResourceNotFound(path.to_path_buf()),
        _ => EvalError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    String::from_utf8(bytes).map_err(|_| {
        EvalError::invalid(format!(
            "contents of {} are not valid UTF-8",
            path.display()
        ))
    })
}

fn file(args: &[Value], scope: &Scope<'_>) -> EvalResult<Value> {
    let path = resolve(scope, get_string_arg(args, 0)?)?;
    debug!(path = %path.display(), "reading file");
    Ok(Value::string(read_file(&path)?))
}

fn fileexists(args: &[Value], scope: &Scope<'_>) -> EvalResult<Value> {
    let path = resolve(scope, get_string_arg(args, 0)?)?;
    debug!(path = %path.display(), "checking file");
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => Ok(Value::Bool(true)),
        Ok(_) => Err(EvalError::invalid(format!(
            "{} is not a regular file",
            path.display()
        ))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Value::Bool(false)),
        Err(source) => Err(EvalError::Io { path, source }),
    }
}

fn pathexpand(args: &[Value], _scope: &Scope<'_>) -> EvalResult<Value> {
    let path = expand_home(get_string_arg(args, 0)?)?;
    Ok(Value::string(path.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_expansion() {
        assert_eq!(expand_home("a/~b").unwrap(), PathBuf::from("a/~b"));
        assert_eq!(expand_home("~user/x").unwrap(), PathBuf::from("~user/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~").unwrap(), home);
            assert_eq!(expand_home("~/.ssh").unwrap(), home.join(".ssh"));
        }
    }
}
