//! Integration tests for the SQLite connection provider
//!
//! Each test works against a database file in its own temporary directory, so
//! separate `acquire` calls observe each other's committed writes.

use qexec_core::{ConnectionProvider, DbError, SqlType, Value};
use qexec_driver_sqlite::SqliteDriver;
use tempfile::TempDir;

/// Helper to create a temp directory and a connection string inside it
fn temp_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("test.db");
    let conn_str = format!("sqlite:{}", path.display());
    (dir, conn_str)
}

fn seed(driver: &SqliteDriver, conn_str: &str) {
    let mut conn = driver.acquire(conn_str).expect("Failed to connect");
    for sql in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL)",
        "INSERT INTO users (id, name, score) VALUES (1, 'Alice', 9.5)",
        "INSERT INTO users (id, name, score) VALUES (2, 'Bob', NULL)",
    ] {
        let mut stmt = conn.prepare(sql).expect("Failed to prepare");
        stmt.execute_update().expect("Failed to execute");
        stmt.close().unwrap();
    }
    conn.commit().unwrap();
    conn.close().unwrap();
}

#[test]
fn test_query_with_bound_parameters() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new();
    seed(&driver, &conn_str);

    let mut conn = driver.acquire(&conn_str).unwrap();
    assert_eq!(conn.driver_name(), "sqlite");

    let mut stmt = conn
        .prepare("SELECT id, name, score FROM users WHERE id >= ? ORDER BY id")
        .unwrap();
    stmt.set_value(0, &Value::Int64(1)).unwrap();
    let mut cursor = stmt.execute_query().unwrap();

    let names: Vec<&str> = cursor.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "score"]);
    assert_eq!(cursor.columns()[0].data_type, "INTEGER");

    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get_i64(0).unwrap(), 1);
    assert_eq!(cursor.get_string(1).unwrap().as_deref(), Some("Alice"));
    assert_eq!(
        cursor.get_typed(2, SqlType::Double).unwrap(),
        Value::Float64(9.5)
    );

    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get(2).unwrap(), Value::Null);
    assert_eq!(cursor.get_string(2).unwrap(), None);
    assert!(!cursor.next().unwrap());

    cursor.close().unwrap();
    stmt.close().unwrap();
    conn.close().unwrap();
    assert!(conn.is_closed());
}

#[test]
fn test_update_returns_affected_rows() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new();
    seed(&driver, &conn_str);

    let mut conn = driver.acquire(&conn_str).unwrap();
    let mut stmt = conn.prepare("UPDATE users SET score = ?").unwrap();
    stmt.set_value(0, &Value::Float64(1.0)).unwrap();
    assert_eq!(stmt.execute_update().unwrap(), 2);

    let mut stmt = conn.prepare("DELETE FROM users WHERE id = ?").unwrap();
    stmt.set_value(0, &Value::Int64(42)).unwrap();
    assert_eq!(stmt.execute_update().unwrap(), 0);
}

#[test]
fn test_prepare_reports_syntax_errors() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new();
    let mut conn = driver.acquire(&conn_str).unwrap();

    let result = conn.prepare("SELEC nonsense");
    assert!(matches!(result, Err(DbError::Query(_))));
}

#[test]
fn test_manual_commit_mode() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new();
    seed(&driver, &conn_str);

    let manual = format!("{}?auto_commit=false", conn_str);

    // Work that is never committed disappears when the connection closes
    let mut conn = driver.acquire(&manual).unwrap();
    let mut stmt = conn.prepare("DELETE FROM users").unwrap();
    assert_eq!(stmt.execute_update().unwrap(), 2);
    stmt.close().unwrap();
    conn.close().unwrap();

    let mut conn = driver.acquire(&conn_str).unwrap();
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM users").unwrap();
    let mut cursor = stmt.execute_query().unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get_i64(0).unwrap(), 2);
    drop(cursor);
    drop(stmt);
    conn.close().unwrap();

    // Committed work survives
    let mut conn = driver.acquire(&manual).unwrap();
    let mut stmt = conn.prepare("DELETE FROM users WHERE id = 2").unwrap();
    assert_eq!(stmt.execute_update().unwrap(), 1);
    conn.commit().unwrap();
    conn.close().unwrap();

    let mut conn = driver.acquire(&conn_str).unwrap();
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM users").unwrap();
    let mut cursor = stmt.execute_query().unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get_i64(0).unwrap(), 1);
}

#[test]
fn test_registered_procedure_call() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new()
        .with_procedure("add_tax", Some(2), |args| {
            let amount = args[0].as_f64().unwrap_or_default();
            let rate = args[1].as_f64().unwrap_or_default();
            Ok(Value::Float64(amount * (1.0 + rate)))
        })
        .with_procedure("answer", Some(0), |_| Ok(Value::Int64(42)));

    let mut conn = driver.acquire(&conn_str).unwrap();

    let mut stmt = conn.prepare_call("{call add_tax(?,?)}").unwrap();
    stmt.set_value(0, &Value::Float64(100.0)).unwrap();
    stmt.set_value(1, &Value::Float64(0.25)).unwrap();
    let mut cursor = stmt.execute_query().unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get_typed(0, SqlType::Double).unwrap(), Value::Float64(125.0));

    let mut stmt = conn.prepare_call("{call answer()}").unwrap();
    let mut cursor = stmt.execute_query().unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get_i64(0).unwrap(), 42);
}

#[test]
fn test_procedure_errors_propagate() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new().with_procedure("fail", None, |_| {
        Err(DbError::Query("procedure refused".into()))
    });

    let mut conn = driver.acquire(&conn_str).unwrap();
    let mut stmt = conn.prepare_call("{call fail(?)}").unwrap();
    stmt.set_value(0, &Value::Int64(1)).unwrap();

    let err = stmt.execute_query().err().expect("procedure should fail");
    assert!(err.to_string().contains("procedure refused"), "{}", err);
}

#[test]
fn test_out_parameters_not_supported() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new().with_procedure("p", Some(1), |a| Ok(a[0].clone()));

    let mut conn = driver.acquire(&conn_str).unwrap();
    let mut stmt = conn.prepare_call("{call p(?)}").unwrap();
    let result = stmt.register_out_parameter(0, SqlType::Integer);
    assert!(matches!(result, Err(DbError::NotSupported(_))));
}

#[test]
fn test_unknown_procedure_fails_to_prepare() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new();
    let mut conn = driver.acquire(&conn_str).unwrap();

    assert!(conn.prepare_call("{call missing(?)}").is_err());
}

#[test]
fn test_operations_after_close() {
    let (_dir, conn_str) = temp_db();
    let driver = SqliteDriver::new();
    let mut conn = driver.acquire(&conn_str).unwrap();
    let mut stmt = conn.prepare("SELECT 1").unwrap();

    conn.close().unwrap();
    conn.close().unwrap();

    assert!(matches!(stmt.execute_query(), Err(DbError::InvalidState(_))));
    assert!(matches!(conn.prepare("SELECT 1"), Err(DbError::InvalidState(_))));
    assert!(matches!(conn.commit(), Err(DbError::InvalidState(_))));
}

#[test]
fn test_missing_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope").join("test.db");
    let driver = SqliteDriver::new();

    let result = driver.acquire(&format!("sqlite:{}", path.display()));
    assert!(matches!(result, Err(DbError::Connection(_))));
}
