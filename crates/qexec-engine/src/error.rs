//! Error types for the execution engine

use std::fmt::Display;

use qexec_core::{DbError, SqlType};
use thiserror::Error;

/// Descriptor metadata that can never execute as written.
///
/// These indicate a defect in the descriptor itself and should be treated as
/// fatal for the call site.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Unsupported stored procedure signature for {name}: {signature}")]
    InvalidSignature { name: String, signature: String },

    #[error(
        "Signature argument count differs from declared type count for {name}{}: signature: {signature_count}; declared: {declared_count}",
        bracketed(.declared_types)
    )]
    SignatureArityMismatch {
        name: String,
        declared_types: Vec<SqlType>,
        signature_count: usize,
        declared_count: usize,
    },

    #[error("Stored procedure {name} cannot run with result shape {shape}; a row-producing shape is required")]
    UnsupportedShape { name: String, shape: String },
}

/// Supplied argument values that do not fit the descriptor
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("{}", count_mismatch_message(.name, .arg_names, .expected, .actual))]
    CountMismatch {
        name: String,
        arg_names: Vec<String>,
        expected: usize,
        actual: usize,
    },

    #[error("No arguments expected for {name}")]
    UnexpectedArguments { name: String },

    #[error(
        "Insufficient arguments count for {name}{}: minimum: {minimum}; actual: {actual}",
        bracketed(.declared_types)
    )]
    InsufficientArguments {
        name: String,
        declared_types: Vec<SqlType>,
        minimum: usize,
        actual: usize,
    },
}

/// Error returned by every engine operation
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error("Failed to acquire connection: {0}")]
    Connection(#[source] DbError),

    #[error("Statement execution failed: {0}")]
    Execution(#[source] DbError),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl EngineError {
    /// Whether the error stems from descriptor metadata or supplied arguments
    /// rather than from the database.
    pub fn is_caller_defect(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Arguments(_))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

fn count_mismatch_message(
    name: &str,
    arg_names: &[String],
    expected: &usize,
    actual: &usize,
) -> String {
    if *expected == 0 {
        format!("No arguments expected for {}", name)
    } else {
        format!(
            "Incorrect argument count for {}{}: expect: {}; actual: {}",
            name,
            bracketed(arg_names),
            expected,
            actual
        )
    }
}

/// Render a list as `[a, b, c]`
fn bracketed<T: Display>(items: &[T]) -> String {
    let joined = items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}
