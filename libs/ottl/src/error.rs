//! Error types for the transformation engine

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compile-time and evaluation-time errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid path `{path}`: cannot resolve segment `{segment}`")]
    InvalidPath { path: String, segment: String },

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Invalid arguments for `{function}`: {message}")]
    InvalidArguments { function: String, message: String },

    #[error("Enum symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Statement {index} (`{statement}`) failed: {source}")]
    Statement {
        index: usize,
        statement: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to compile {} statement(s): {}", .0.len(), join_errors(.0))]
    Compile(Vec<Error>),
}

impl Error {
    pub(crate) fn invalid_path(path: impl ToString, segment: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.to_string(),
            segment: segment.into(),
        }
    }

    pub(crate) fn invalid_arguments(function: &str, message: impl Into<String>) -> Self {
        Error::InvalidArguments {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Flatten an aggregated compile error into its individual failures.
    pub fn causes(&self) -> Vec<&Error> {
        match self {
            Error::Compile(errors) => errors.iter().flat_map(Error::causes).collect(),
            Error::Statement { source, .. } => source.causes(),
            other => vec![other],
        }
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
