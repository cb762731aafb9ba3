//! SQLite connection provider

use std::sync::Arc;

use qexec_core::{Connection, ConnectionProvider, Result, Value};

use crate::{SqliteConnection, SqliteOptions};

/// Body of a stored procedure registered with [`SqliteDriver::with_procedure`]
pub type ProcedureFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A stored procedure installed on every connection the driver opens
#[derive(Clone)]
pub(crate) struct Procedure {
    pub(crate) name: String,
    /// Fixed argument count, or `None` for variadic procedures
    pub(crate) arity: Option<usize>,
    pub(crate) func: ProcedureFn,
}

/// SQLite connection provider.
///
/// SQLite has no server-side stored procedures, so procedures are Rust
/// closures installed as SQL functions on every connection. A call such as
/// `{call add_tax(?, ?)}` runs as `SELECT add_tax(?, ?)` and its single
/// result row carries the return value.
#[derive(Clone, Default)]
pub struct SqliteDriver {
    procedures: Vec<Procedure>,
}

impl SqliteDriver {
    /// Create a driver with no procedures registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure callable through `{call name(...)}`.
    ///
    /// `arity` is the exact argument count, or `None` to accept any number.
    pub fn with_procedure<F>(mut self, name: impl Into<String>, arity: Option<usize>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(procedure = %name, ?arity, "registering SQLite procedure");
        self.procedures.retain(|p| p.name != name || p.arity != arity);
        self.procedures.push(Procedure {
            name,
            arity,
            func: Arc::new(f),
        });
        self
    }

    /// Names of the registered procedures
    pub fn procedure_names(&self) -> Vec<&str> {
        self.procedures.iter().map(|p| p.name.as_str()).collect()
    }

    /// Whether a connection string looks like one this driver can open
    pub fn accepts(connection_string: &str) -> bool {
        let trimmed = connection_string.trim();
        trimmed.starts_with("sqlite:")
            || trimmed.starts_with("file:")
            || trimmed == ":memory:"
            || trimmed.ends_with(".db")
            || trimmed.ends_with(".sqlite")
            || trimmed.ends_with(".sqlite3")
    }

    /// Open a connection from already-parsed options
    pub fn connect(&self, options: &SqliteOptions) -> Result<SqliteConnection> {
        SqliteConnection::open(options, &self.procedures)
    }
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("procedures", &self.procedure_names())
            .finish()
    }
}

impl ConnectionProvider for SqliteDriver {
    #[tracing::instrument(skip(self, connection_string))]
    fn acquire(&self, connection_string: &str) -> Result<Box<dyn Connection>> {
        let options = SqliteOptions::parse(connection_string)?;
        Ok(Box::new(self.connect(&options)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts() {
        assert!(SqliteDriver::accepts("sqlite::memory:"));
        assert!(SqliteDriver::accepts("/tmp/data.db"));
        assert!(SqliteDriver::accepts("file:x?mode=memory"));
        assert!(!SqliteDriver::accepts("postgres://localhost/app"));
    }

    #[test]
    fn test_reregistering_replaces_procedure() {
        let driver = SqliteDriver::new()
            .with_procedure("one", Some(0), |_| Ok(Value::Int64(1)))
            .with_procedure("one", Some(0), |_| Ok(Value::Int64(2)))
            .with_procedure("one", None, |_| Ok(Value::Int64(3)));

        assert_eq!(driver.procedure_names(), vec!["one", "one"]);
    }
}
