//! Scripted in-memory driver for engine tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use qexec_core::{
    ColumnMeta, Connection, ConnectionProvider, Cursor, DbError, Result, SqlType, Statement, Value,
};

/// Behaviour of every connection handed out by a [`MockProvider`]
#[derive(Debug, Clone, Default)]
pub(crate) struct MockScript {
    pub rows: Vec<Vec<Value>>,
    pub update_count: u64,
    pub out_values: Vec<(usize, Value)>,
    pub fail_acquire: bool,
    pub fail_prepare: bool,
    pub fail_execute: bool,
    pub fail_read: bool,
    pub fail_cursor_close: bool,
    pub fail_statement_close: bool,
    pub fail_commit: bool,
    pub fail_connection_close: bool,
}

impl MockScript {
    pub fn with_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

/// Everything the mock driver observed
#[derive(Debug, Default)]
pub(crate) struct MockState {
    acquisitions: AtomicUsize,
    connection_closes: AtomicUsize,
    prepared: Mutex<Vec<String>>,
    bound: Mutex<Vec<(usize, Value)>>,
    out_registrations: Mutex<Vec<(usize, SqlType)>>,
    events: Mutex<Vec<&'static str>>,
}

impl MockState {
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn connection_closes(&self) -> usize {
        self.connection_closes.load(Ordering::SeqCst)
    }

    pub fn prepared(&self) -> Vec<String> {
        self.prepared.lock().clone()
    }

    pub fn bound(&self) -> Vec<(usize, Value)> {
        self.bound.lock().clone()
    }

    pub fn out_registrations(&self) -> Vec<(usize, SqlType)> {
        self.out_registrations.lock().clone()
    }

    /// Release steps in the order they happened
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().push(event);
    }
}

fn injected(what: &str) -> DbError {
    DbError::Driver(format!("injected {} failure", what))
}

// =============================================================================
// Provider
// =============================================================================

pub(crate) struct MockProvider {
    script: MockScript,
    state: Arc<MockState>,
}

impl MockProvider {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            state: Arc::new(MockState::default()),
        }
    }

    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }
}

impl ConnectionProvider for MockProvider {
    fn acquire(&self, _connection_string: &str) -> Result<Box<dyn Connection>> {
        self.state.acquisitions.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_acquire {
            return Err(DbError::Connection("injected acquire failure".into()));
        }
        Ok(Box::new(MockConnection {
            script: self.script.clone(),
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

// =============================================================================
// Connection
// =============================================================================

struct MockConnection {
    script: MockScript,
    state: Arc<MockState>,
    closed: bool,
}

impl MockConnection {
    fn statement(&mut self, text: &str) -> Result<Box<dyn Statement>> {
        self.state.prepared.lock().push(text.to_string());
        if self.script.fail_prepare {
            return Err(DbError::Query("injected prepare failure".into()));
        }
        Ok(Box::new(MockStatement::new(
            self.script.clone(),
            Arc::clone(&self.state),
        )))
    }
}

impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.statement(sql)
    }

    fn prepare_call(&mut self, call_text: &str) -> Result<Box<dyn Statement>> {
        self.statement(call_text)
    }

    fn commit(&mut self) -> Result<()> {
        self.state.record("connection.commit");
        if self.script.fail_commit {
            return Err(injected("commit"));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.state.record("connection.close");
        self.state.connection_closes.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_connection_close {
            return Err(injected("connection close"));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// =============================================================================
// Statement
// =============================================================================

pub(crate) struct MockStatement {
    script: MockScript,
    state: Arc<MockState>,
    closed: bool,
}

impl MockStatement {
    fn new(script: MockScript, state: Arc<MockState>) -> Self {
        Self {
            script,
            state,
            closed: false,
        }
    }

    /// A statement outside any connection, for binding tests
    pub fn standalone() -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (Self::new(MockScript::default(), Arc::clone(&state)), state)
    }
}

impl Statement for MockStatement {
    fn set_value(&mut self, index: usize, value: &Value) -> Result<()> {
        self.state.bound.lock().push((index, value.clone()));
        Ok(())
    }

    fn register_out_parameter(&mut self, index: usize, sql_type: SqlType) -> Result<()> {
        self.state.out_registrations.lock().push((index, sql_type));
        Ok(())
    }

    fn out_value(&self, index: usize) -> Result<Value> {
        self.script
            .out_values
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| DbError::Query(format!("position {} is not an OUT parameter", index)))
    }

    fn execute_update(&mut self) -> Result<u64> {
        if self.script.fail_execute {
            return Err(DbError::Query("injected execute failure".into()));
        }
        Ok(self.script.update_count)
    }

    fn execute_query(&mut self) -> Result<Box<dyn Cursor>> {
        if self.script.fail_execute {
            return Err(DbError::Query("injected execute failure".into()));
        }
        let width = self.script.rows.first().map_or(1, Vec::len);
        let columns = (0..width)
            .map(|ordinal| ColumnMeta {
                name: format!("c{}", ordinal),
                data_type: "ANY".into(),
                nullable: true,
                ordinal,
            })
            .collect();
        Ok(Box::new(MockCursor {
            columns,
            rows: self.script.rows.clone().into_iter(),
            current: None,
            fail_read: self.script.fail_read,
            fail_close: self.script.fail_cursor_close,
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.state.record("statement.close");
        if self.script.fail_statement_close {
            return Err(injected("statement close"));
        }
        Ok(())
    }
}

// =============================================================================
// Cursor
// =============================================================================

struct MockCursor {
    columns: Vec<ColumnMeta>,
    rows: std::vec::IntoIter<Vec<Value>>,
    current: Option<Vec<Value>>,
    fail_read: bool,
    fail_close: bool,
    state: Arc<MockState>,
    closed: bool,
}

impl Cursor for MockCursor {
    fn next(&mut self) -> Result<bool> {
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn get(&self, index: usize) -> Result<Value> {
        if self.fail_read {
            return Err(DbError::Conversion("injected read failure".into()));
        }
        self.current
            .as_ref()
            .and_then(|row| row.get(index).cloned())
            .ok_or_else(|| DbError::Query(format!("no value at column {}", index)))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.state.record("cursor.close");
        if self.fail_close {
            return Err(injected("cursor close"));
        }
        Ok(())
    }
}
