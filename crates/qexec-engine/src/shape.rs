//! Requested result shapes and their outcomes

use std::fmt;

use qexec_core::{SqlType, Value};

use crate::error::{EngineError, Result};
use crate::package::ResultPackage;

/// What the caller wants back from a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Run as an update and return the affected-row count
    Update,
    /// Hand the open connection, statement and cursor to the caller
    Package,
    /// First column of the first row as an integer, `-1` without rows
    Integer,
    /// First column of the first row as text
    Text,
    /// First column of the first row coerced to the given type
    Typed(SqlType),
}

impl ResultShape {
    /// Whether the statement runs as a query producing a cursor
    pub fn produces_rows(self) -> bool {
        !matches!(self, Self::Update)
    }

    /// Whether the engine closes the resources before returning
    pub fn is_transient(self) -> bool {
        !matches!(self, Self::Package)
    }
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => f.write_str("Update"),
            Self::Package => f.write_str("Package"),
            Self::Integer => f.write_str("Integer"),
            Self::Text => f.write_str("Text"),
            Self::Typed(sql_type) => write!(f, "Typed({})", sql_type),
        }
    }
}

/// Result of running a statement, one variant per [`ResultShape`]
#[derive(Debug)]
pub enum QueryOutcome {
    RowCount(u64),
    Package(ResultPackage),
    Integer(i64),
    Text(Option<String>),
    Typed(Option<Value>),
}

impl QueryOutcome {
    fn kind(&self) -> &'static str {
        match self {
            Self::RowCount(_) => "row count",
            Self::Package(_) => "result package",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Typed(_) => "typed value",
        }
    }

    fn unexpected(self, wanted: &str) -> EngineError {
        EngineError::InvalidState(format!("expected {} outcome, got {}", wanted, self.kind()))
    }

    pub fn into_row_count(self) -> Result<u64> {
        match self {
            Self::RowCount(count) => Ok(count),
            other => Err(other.unexpected("row count")),
        }
    }

    pub fn into_package(self) -> Result<ResultPackage> {
        match self {
            Self::Package(package) => Ok(package),
            other => Err(other.unexpected("result package")),
        }
    }

    pub fn into_integer(self) -> Result<i64> {
        match self {
            Self::Integer(value) => Ok(value),
            other => Err(other.unexpected("integer")),
        }
    }

    pub fn into_text(self) -> Result<Option<String>> {
        match self {
            Self::Text(value) => Ok(value),
            other => Err(other.unexpected("text")),
        }
    }

    pub fn into_typed(self) -> Result<Option<Value>> {
        match self {
            Self::Typed(value) => Ok(value),
            other => Err(other.unexpected("typed value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shape_properties() {
        assert!(!ResultShape::Update.produces_rows());
        assert!(ResultShape::Update.is_transient());
        assert!(ResultShape::Package.produces_rows());
        assert!(!ResultShape::Package.is_transient());
        assert!(ResultShape::Typed(SqlType::Date).produces_rows());
        assert_eq!(ResultShape::Typed(SqlType::Date).to_string(), "Typed(DATE)");
    }

    #[test]
    fn test_wrong_accessor_is_invalid_state() {
        let err = QueryOutcome::Integer(-1).into_text().unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert_eq!(
            err.to_string(),
            "Invalid state: expected text outcome, got integer"
        );
        assert_eq!(QueryOutcome::RowCount(3).into_row_count().unwrap(), 3);
    }
}
