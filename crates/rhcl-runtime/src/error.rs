//! Runtime error types

use std::path::PathBuf;

use thiserror::Error;

/// Result type for function implementations
pub type EvalResult<T> = Result<T, EvalError>;

/// Failure raised by a function implementation
///
/// The scope turns every variant into a diagnostic; none of these cross the
/// `eval_expr` boundary as errors.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A specific argument is unacceptable (reported against its parameter)
    #[error("{message}")]
    InvalidArgument { index: usize, message: String },

    #[error("no file exists at {}", .0.display())]
    ResourceNotFound(PathBuf),

    #[error("index {index} out of range for length {length}")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("{0}")]
    Conversion(#[from] ConversionError),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    InvalidOperation(String),
}

impl EvalError {
    /// Create an argument error
    pub fn argument(index: usize, message: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            index,
            message: message.into(),
        }
    }

    /// Create a general failure
    pub fn invalid(message: impl Into<String>) -> Self {
        EvalError::InvalidOperation(message.into())
    }
}

/// A value could not be converted to the requested type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Registry construction failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("function \"{0}\" is already registered")]
    Duplicate(String),
}
