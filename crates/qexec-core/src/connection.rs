//! Blocking driver traits: provider, connection, statement and cursor
//!
//! Every object handed out by a driver is owned (`Box<dyn ...>`), so a
//! connection, one of its statements and that statement's cursor can be held
//! together by a single owner and released in a fixed order.

use crate::{ColumnMeta, DbError, Result, SqlType, Value};

/// Turns a connection string into a live connection.
///
/// Implementations must be safe to call from several threads at once; every
/// call returns a connection that is private to the caller.
pub trait ConnectionProvider: Send + Sync {
    /// Open a new connection for the given connection string
    fn acquire(&self, connection_string: &str) -> Result<Box<dyn Connection>>;
}

/// A live database connection
pub trait Connection: Send {
    /// Get the driver name (e.g., "sqlite")
    fn driver_name(&self) -> &str;

    /// Prepare a plain SQL statement that may contain `?` placeholders
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Prepare a stored-procedure call written in `{call name(?, ...)}` form
    fn prepare_call(&mut self, call_text: &str) -> Result<Box<dyn Statement>>;

    /// Commit any pending work. A no-op when nothing is pending.
    fn commit(&mut self) -> Result<()>;

    /// Close the connection. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A prepared statement or callable statement.
///
/// Parameter indices are 0-based positions of the `?` placeholders.
pub trait Statement: Send {
    /// Bind an input value at the given position
    fn set_value(&mut self, index: usize, value: &Value) -> Result<()>;

    /// Declare the position as an OUT parameter of the given type
    fn register_out_parameter(&mut self, index: usize, sql_type: SqlType) -> Result<()> {
        let _ = sql_type;
        Err(DbError::NotSupported(format!(
            "OUT parameters are not supported by this statement (position {})",
            index
        )))
    }

    /// Read the value of an OUT or INOUT parameter after execution
    fn out_value(&self, index: usize) -> Result<Value> {
        Err(DbError::NotSupported(format!(
            "OUT parameters are not supported by this statement (position {})",
            index
        )))
    }

    /// Execute as an update/DDL operation and return the affected-row count
    fn execute_update(&mut self) -> Result<u64>;

    /// Execute as a row-producing operation
    fn execute_query(&mut self) -> Result<Box<dyn Cursor>>;

    /// Release the statement. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;
}

/// A forward-only cursor over the rows produced by a statement.
///
/// Column indices are 0-based. Accessors read from the row the last call to
/// [`Cursor::next`] moved onto.
pub trait Cursor: Send {
    /// Advance to the next row; `false` once the rows are exhausted
    fn next(&mut self) -> Result<bool>;

    /// Column metadata for the rows of this cursor
    fn columns(&self) -> &[ColumnMeta];

    /// Raw value of a column of the current row
    fn get(&self, index: usize) -> Result<Value>;

    /// Column value coerced to a 64-bit integer; SQL NULL reads as 0
    fn get_i64(&self, index: usize) -> Result<i64> {
        match self.get(index)?.coerce(SqlType::BigInt)? {
            Value::Int64(v) => Ok(v),
            _ => Ok(0),
        }
    }

    /// Column value as text; SQL NULL reads as `None`
    fn get_string(&self, index: usize) -> Result<Option<String>> {
        match self.get(index)?.coerce(SqlType::Varchar)? {
            Value::String(s) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    /// Column value coerced to the given SQL type
    fn get_typed(&self, index: usize, sql_type: SqlType) -> Result<Value> {
        self.get(index)?.coerce(sql_type)
    }

    /// Release the cursor. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;
}
