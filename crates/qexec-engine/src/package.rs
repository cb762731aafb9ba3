//! Ownership of the connection, statement and cursor behind a result

use std::fmt;

use qexec_core::{ColumnMeta, Connection, Cursor, Statement, Value};

use crate::error::{EngineError, Result};

/// An open cursor together with the statement and connection it came from.
///
/// Returned by [`ResultShape::Package`](crate::ResultShape::Package). The
/// caller owns all three resources and releases them with [`close`] or by
/// dropping the package. Release closes the cursor, then the statement, then
/// commits and closes the connection; failures along the way are logged and
/// ignored.
///
/// [`close`]: ResultPackage::close
pub struct ResultPackage {
    pub(crate) connection: Option<Box<dyn Connection>>,
    pub(crate) statement: Option<Box<dyn Statement>>,
    pub(crate) cursor: Option<Box<dyn Cursor>>,
}

impl ResultPackage {
    /// Package a prepared statement before it runs; the cursor is attached
    /// once the statement executes.
    pub(crate) fn new(connection: Box<dyn Connection>, statement: Box<dyn Statement>) -> Self {
        Self {
            connection: Some(connection),
            statement: Some(statement),
            cursor: None,
        }
    }

    fn released() -> EngineError {
        EngineError::InvalidState("The result cursor in this package has been closed".into())
    }

    /// The open cursor
    pub fn cursor(&self) -> Result<&dyn Cursor> {
        self.cursor.as_deref().ok_or_else(Self::released)
    }

    /// The open cursor, for advancing through rows
    pub fn cursor_mut(&mut self) -> Result<&mut dyn Cursor> {
        match self.cursor.as_deref_mut() {
            Some(cursor) => Ok(cursor),
            None => Err(Self::released()),
        }
    }

    /// Column metadata of the open cursor
    pub fn columns(&self) -> Result<&[ColumnMeta]> {
        Ok(self.cursor()?.columns())
    }

    /// Value of an OUT or INOUT parameter of the retained statement
    pub fn out_value(&self, index: usize) -> Result<Value> {
        let statement = self.statement.as_deref().ok_or_else(|| {
            EngineError::InvalidState("The statement in this package has been closed".into())
        })?;
        statement.out_value(index).map_err(EngineError::Execution)
    }

    /// Whether every resource has been released
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none() && self.statement.is_none() && self.connection.is_none()
    }

    /// Release the cursor, statement and connection.
    ///
    /// Calling this again, or dropping the package afterwards, does nothing.
    pub fn close(&mut self) {
        release(
            self.cursor.take(),
            self.statement.take(),
            self.connection.take(),
        );
    }
}

impl Drop for ResultPackage {
    fn drop(&mut self) {
        if !self.is_closed() {
            tracing::debug!("releasing result package on drop");
            self.close();
        }
    }
}

impl fmt::Debug for ResultPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultPackage")
            .field("connection_open", &self.connection.is_some())
            .field("statement_open", &self.statement.is_some())
            .field("cursor_open", &self.cursor.is_some())
            .finish()
    }
}

/// Best-effort release in fixed order: cursor, statement, connection.
///
/// Each step runs regardless of earlier failures and no failure escapes.
pub(crate) fn release(
    cursor: Option<Box<dyn Cursor>>,
    statement: Option<Box<dyn Statement>>,
    connection: Option<Box<dyn Connection>>,
) {
    if let Some(mut cursor) = cursor
        && let Err(e) = cursor.close()
    {
        tracing::warn!(error = %e, "failed to close cursor");
    }

    if let Some(mut statement) = statement
        && let Err(e) = statement.close()
    {
        tracing::warn!(error = %e, "failed to close statement");
    }

    if let Some(mut connection) = connection {
        if let Err(e) = connection.commit() {
            tracing::warn!(error = %e, driver = connection.driver_name(), "failed to commit connection");
        }
        if let Err(e) = connection.close() {
            tracing::warn!(error = %e, driver = connection.driver_name(), "failed to close connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, MockScript};
    use pretty_assertions::assert_eq;
    use qexec_core::ConnectionProvider;

    fn open_package(script: MockScript) -> (ResultPackage, MockProvider) {
        let provider = MockProvider::new(script);
        let mut connection = provider.acquire("mock:").unwrap();
        let mut statement = connection.prepare("SELECT 1").unwrap();
        let cursor = statement.execute_query().unwrap();
        let mut package = ResultPackage::new(connection, statement);
        package.cursor = Some(cursor);
        (package, provider)
    }

    #[test]
    fn test_close_releases_in_order_once() {
        let (mut package, provider) = open_package(MockScript::with_rows(vec![vec![1i64.into()]]));

        assert!(package.cursor().is_ok());
        package.close();
        assert!(package.is_closed());
        assert!(matches!(package.cursor(), Err(EngineError::InvalidState(_))));
        assert!(matches!(package.cursor_mut(), Err(EngineError::InvalidState(_))));

        package.close();
        drop(package);

        assert_eq!(
            provider.state().events(),
            vec!["cursor.close", "statement.close", "connection.commit", "connection.close"]
        );
    }

    #[test]
    fn test_drop_releases() {
        let (package, provider) = open_package(MockScript::default());
        drop(package);
        assert_eq!(provider.state().connection_closes(), 1);
    }

    #[test]
    fn test_cleanup_failures_are_swallowed() {
        let script = MockScript {
            fail_cursor_close: true,
            fail_statement_close: true,
            fail_commit: true,
            ..MockScript::default()
        };
        let (mut package, provider) = open_package(script);

        package.close();

        assert!(package.is_closed());
        assert_eq!(
            provider.state().events(),
            vec!["cursor.close", "statement.close", "connection.commit", "connection.close"]
        );
    }

    #[test]
    fn test_out_value_reads_retained_statement() {
        let script = MockScript {
            out_values: vec![(1, Value::String("done".into()))],
            ..MockScript::default()
        };
        let (mut package, _provider) = open_package(script);

        assert_eq!(package.out_value(1).unwrap(), Value::String("done".into()));
        assert!(matches!(package.out_value(0), Err(EngineError::Execution(_))));

        package.close();
        assert!(matches!(package.out_value(1), Err(EngineError::InvalidState(_))));
    }
}
