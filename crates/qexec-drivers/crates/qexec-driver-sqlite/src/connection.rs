//! SQLite connection, statement and cursor implementation

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use qexec_core::{ColumnMeta, Connection, Cursor, DbError, Result, Statement, Value};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};

use crate::SqliteOptions;
use crate::driver::Procedure;

type SharedConnection = Arc<Mutex<Option<RusqliteConnection>>>;

static CALL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\{\s*call\s+(.+?)\s*\}$").expect("valid regex"));

fn closed_connection() -> DbError {
    DbError::InvalidState("SQLite connection is closed".into())
}

/// Run `f` against the underlying connection, failing if it has been closed.
fn with_connection<T>(
    shared: &SharedConnection,
    f: impl FnOnce(&RusqliteConnection) -> Result<T>,
) -> Result<T> {
    let guard = shared.lock();
    let conn = guard.as_ref().ok_or_else(closed_connection)?;
    f(conn)
}

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: SharedConnection,
    auto_commit: bool,
}

impl SqliteConnection {
    /// Open a SQLite database with the given options and procedures
    pub(crate) fn open(options: &SqliteOptions, procedures: &[Procedure]) -> Result<Self> {
        tracing::debug!(path = %options.path, "opening SQLite database");

        let conn = if options.is_memory() {
            RusqliteConnection::open_in_memory().map_err(|e| {
                DbError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            let expanded_path = Self::expand_path(&options.path)?;

            // Validate that parent directory exists for non-URI paths
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    return Err(DbError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                DbError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", if options.foreign_keys { "ON" } else { "OFF" })
            .map_err(|e| DbError::Connection(format!("Failed to set foreign keys: {}", e)))?;

        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)
                .map_err(|e| DbError::Connection(format!("Failed to set busy timeout: {}", e)))?;
        }

        if let Some(mode) = &options.journal_mode {
            let applied: String = conn
                .pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))
                .map_err(|e| DbError::Connection(format!("Failed to set journal mode: {}", e)))?;
            tracing::debug!(requested = %mode, applied = %applied, "journal mode set");
        }

        for procedure in procedures {
            register_procedure(&conn, procedure)?;
        }

        if !options.auto_commit {
            conn.execute_batch("BEGIN DEFERRED")
                .map_err(|e| DbError::Connection(format!("Failed to begin transaction: {}", e)))?;
        }

        tracing::info!(
            path = %options.path,
            auto_commit = options.auto_commit,
            procedures = procedures.len(),
            "SQLite connection established"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            auto_commit: options.auto_commit,
        })
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                let home_path = std::path::PathBuf::from(home);
                home_path.join(rest).to_string_lossy().to_string()
            } else {
                return Err(DbError::Configuration(
                    "Unable to determine HOME directory".into(),
                ));
            }
        } else if path.starts_with('~') {
            return Err(DbError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// Translate `{call name(?, ?)}` into the `SELECT name(?, ?)` form SQLite
    /// understands for registered procedures.
    fn rewrite_call(call_text: &str) -> Result<String> {
        let captures = CALL_REGEX.captures(call_text.trim()).ok_or_else(|| {
            DbError::Query(format!(
                "Stored procedure call must use the {{call name(...)}} form: {}",
                call_text
            ))
        })?;
        let target = &captures[1];
        if target.contains('(') {
            Ok(format!("SELECT {}", target))
        } else {
            Ok(format!("SELECT {}()", target))
        }
    }

    fn new_statement(&self, sql: String, callable: bool) -> Result<SqliteStatement> {
        // Compile once up front so syntax errors surface at prepare time; the
        // compiled statement stays in the connection's statement cache.
        with_connection(&self.conn, |conn| {
            conn.prepare_cached(&sql)
                .map(|_| ())
                .map_err(|e| DbError::Query(format!("Failed to prepare statement: {}", e)))
        })?;

        Ok(SqliteStatement {
            conn: Arc::clone(&self.conn),
            sql,
            params: Vec::new(),
            callable,
            closed: false,
        })
    }
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        Ok(Box::new(self.new_statement(sql.to_string(), false)?))
    }

    #[tracing::instrument(skip(self))]
    fn prepare_call(&mut self, call_text: &str) -> Result<Box<dyn Statement>> {
        let sql = Self::rewrite_call(call_text)?;
        tracing::debug!(sql = %sql, "rewrote procedure call");
        Ok(Box::new(self.new_statement(sql, true)?))
    }

    fn commit(&mut self) -> Result<()> {
        with_connection(&self.conn, |conn| {
            if conn.is_autocommit() {
                return Ok(());
            }
            conn.execute_batch("COMMIT")
                .map_err(|e| DbError::Query(format!("Failed to commit transaction: {}", e)))?;
            if !self.auto_commit {
                conn.execute_batch("BEGIN DEFERRED").map_err(|e| {
                    DbError::Query(format!("Failed to begin transaction: {}", e))
                })?;
            }
            tracing::debug!("SQLite transaction committed");
            Ok(())
        })
    }

    fn close(&mut self) -> Result<()> {
        let taken = self.conn.lock().take();
        if let Some(conn) = taken {
            tracing::debug!("closing SQLite connection");
            conn.close().map_err(|(_, e)| {
                DbError::Connection(format!("Failed to close SQLite connection: {}", e))
            })?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

/// A prepared SQLite statement.
///
/// Values are collected by [`Statement::set_value`] and bound when the
/// statement runs, so the statement does not borrow the connection.
pub struct SqliteStatement {
    conn: SharedConnection,
    sql: String,
    params: Vec<Value>,
    callable: bool,
    closed: bool,
}

impl SqliteStatement {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(DbError::InvalidState("SQLite statement is closed".into()))
        } else {
            Ok(())
        }
    }

    /// SQL text that will be executed
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Statement for SqliteStatement {
    fn set_value(&mut self, index: usize, value: &Value) -> Result<()> {
        self.ensure_open()?;
        if self.params.len() <= index {
            self.params.resize(index + 1, Value::Null);
        }
        self.params[index] = value.clone();
        Ok(())
    }

    fn register_out_parameter(&mut self, index: usize, sql_type: qexec_core::SqlType) -> Result<()> {
        let kind = if self.callable { "procedures" } else { "statements" };
        Err(DbError::NotSupported(format!(
            "SQLite {} cannot return OUT parameters (position {}, type {})",
            kind, index, sql_type
        )))
    }

    #[tracing::instrument(skip(self), fields(sql_preview = %self.sql.chars().take(100).collect::<String>()))]
    fn execute_update(&mut self) -> Result<u64> {
        self.ensure_open()?;
        let params = values_to_rusqlite(&self.params);

        let rows_affected = with_connection(&self.conn, |conn| {
            let mut stmt = conn
                .prepare_cached(&self.sql)
                .map_err(|e| DbError::Query(format!("Failed to prepare statement: {}", e)))?;
            stmt.execute(params_from_iter(params.iter()))
                .map_err(|e| DbError::Query(format!("Failed to execute statement: {}", e)))
        })?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(rows_affected as u64)
    }

    #[tracing::instrument(skip(self), fields(sql_preview = %self.sql.chars().take(100).collect::<String>()))]
    fn execute_query(&mut self) -> Result<Box<dyn Cursor>> {
        self.ensure_open()?;
        let params = values_to_rusqlite(&self.params);

        let (columns, rows) = with_connection(&self.conn, |conn| {
            let mut stmt = conn
                .prepare_cached(&self.sql)
                .map_err(|e| DbError::Query(format!("Failed to prepare query: {}", e)))?;

            let columns: Vec<ColumnMeta> = stmt
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| ColumnMeta {
                    name: col.name().to_string(),
                    data_type: col.decl_type().unwrap_or("DYNAMIC").to_string(),
                    nullable: true,
                    ordinal: idx,
                })
                .collect();

            let mut rows = Vec::new();
            let mut query_rows = stmt
                .query(params_from_iter(params.iter()))
                .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))?;

            while let Some(row) = query_rows
                .next()
                .map_err(|e| DbError::Query(format!("Failed to fetch row: {}", e)))?
            {
                let mut values = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    let value_ref = row
                        .get_ref(i)
                        .map_err(|e| DbError::Query(e.to_string()))?;
                    values.push(value_ref_to_value(value_ref));
                }
                rows.push(values);
            }

            Ok((columns, rows))
        })?;

        tracing::debug!(row_count = rows.len(), "query executed successfully");
        Ok(Box::new(SqliteCursor::new(columns, rows)))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.params.clear();
        Ok(())
    }
}

/// Cursor over rows materialized from a SQLite query
pub struct SqliteCursor {
    columns: Vec<ColumnMeta>,
    rows: std::vec::IntoIter<Vec<Value>>,
    current: Option<Vec<Value>>,
    closed: bool,
}

impl SqliteCursor {
    fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
            current: None,
            closed: false,
        }
    }

    /// Number of rows not yet visited
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for SqliteCursor {
    fn next(&mut self) -> Result<bool> {
        if self.closed {
            return Err(DbError::InvalidState("SQLite cursor is closed".into()));
        }
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn get(&self, index: usize) -> Result<Value> {
        let row = self.current.as_ref().ok_or_else(|| {
            DbError::InvalidState("cursor is not positioned on a row".into())
        })?;
        row.get(index).cloned().ok_or_else(|| {
            DbError::Query(format!(
                "column index {} out of range ({} columns)",
                index,
                row.len()
            ))
        })
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}

fn register_procedure(conn: &RusqliteConnection, procedure: &Procedure) -> Result<()> {
    let n_arg = procedure.arity.map_or(-1, |arity| arity as i32);
    let func = AssertUnwindSafe(Arc::clone(&procedure.func));

    conn.create_scalar_function(
        procedure.name.as_str(),
        n_arg,
        FunctionFlags::SQLITE_UTF8,
        move |ctx| {
            let func = &func;
            let args: Vec<Value> = (0..ctx.len())
                .map(|i| value_ref_to_value(ctx.get_raw(i)))
                .collect();
            let result =
                (func.0)(&args).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
            Ok(value_to_rusqlite(&result))
        },
    )
    .map_err(|e| {
        DbError::Connection(format!(
            "Failed to register procedure '{}': {}",
            procedure.name, e
        ))
    })
}

fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Int8(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int16(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int32(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float32(f) => rusqlite::types::Value::Real(*f as f64),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::Decimal(d) => rusqlite::types::Value::Text(d.clone()),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Date(d) => rusqlite::types::Value::Text(d.to_string()),
        Value::Time(t) => rusqlite::types::Value::Text(t.to_string()),
        Value::DateTime(dt) => rusqlite::types::Value::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => rusqlite::types::Value::Text(dt.to_rfc3339()),
        Value::Json(j) => rusqlite::types::Value::Text(j.to_string()),
        Value::Uuid(u) => rusqlite::types::Value::Text(u.to_string()),
    }
}

fn value_ref_to_value(value_ref: rusqlite::types::ValueRef<'_>) -> Value {
    use rusqlite::types::ValueRef;

    match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_call_forms() {
        assert_eq!(
            SqliteConnection::rewrite_call("{call add_tax(?,?)}").unwrap(),
            "SELECT add_tax(?,?)"
        );
        assert_eq!(
            SqliteConnection::rewrite_call("  { CALL now_utc } ").unwrap(),
            "SELECT now_utc()"
        );
        assert!(SqliteConnection::rewrite_call("SELECT 1").is_err());
    }

    #[test]
    fn test_cursor_requires_current_row() {
        let mut cursor = SqliteCursor::new(
            vec![ColumnMeta {
                name: "n".into(),
                ..Default::default()
            }],
            vec![vec![Value::Int64(1)]],
        );

        assert!(matches!(cursor.get(0), Err(DbError::InvalidState(_))));
        assert_eq!(cursor.remaining(), 1);
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.get(0).unwrap(), Value::Int64(1));
        assert!(cursor.get(3).is_err());
        assert!(!cursor.next().unwrap());

        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(matches!(cursor.next(), Err(DbError::InvalidState(_))));
    }

    #[test]
    fn test_value_conversion_to_sqlite() {
        assert_eq!(
            value_to_rusqlite(&Value::Bool(true)),
            rusqlite::types::Value::Integer(1)
        );
        assert_eq!(
            value_to_rusqlite(&Value::Decimal("1.50".into())),
            rusqlite::types::Value::Text("1.50".into())
        );
        assert_eq!(
            value_ref_to_value(rusqlite::types::ValueRef::Blob(&[1, 2])),
            Value::Bytes(vec![1, 2])
        );
    }
}
