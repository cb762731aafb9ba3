//! Connection string parsing for SQLite
//!
//! Accepted forms:
//!
//! - `sqlite::memory:` or `:memory:`
//! - `sqlite:/abs/path.db`, `sqlite:///abs/path.db`, `sqlite://relative/path.db`
//! - a plain file path
//! - `file:` URIs, passed to SQLite verbatim
//!
//! Options follow a `?` as `key=value` pairs separated by `&`:
//! `auto_commit`, `busy_timeout` (milliseconds), `foreign_keys`, `journal_mode`.

use std::time::Duration;

use qexec_core::{DbError, Result};

const MEMORY: &str = ":memory:";

/// Parsed SQLite connection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    /// Database path, `:memory:`, or a `file:` URI
    pub path: String,
    /// Commit after every statement. When false, each connection runs inside
    /// a transaction that only `Connection::commit` makes durable.
    pub auto_commit: bool,
    /// How long to wait on a locked database before failing
    pub busy_timeout: Option<Duration>,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
    /// Journal mode to set on open (e.g. "WAL", "DELETE")
    pub journal_mode: Option<String>,
}

impl SqliteOptions {
    /// Options for a database at `path` with defaults for everything else
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            auto_commit: true,
            busy_timeout: None,
            foreign_keys: true,
            journal_mode: None,
        }
    }

    /// Parse a connection string
    pub fn parse(connection_string: &str) -> Result<Self> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(DbError::Configuration(
                "SQLite connection string is empty".into(),
            ));
        }

        let rest = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);

        if rest.starts_with("file:") {
            return Ok(Self::new(rest));
        }

        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };

        let path = if location == MEMORY {
            MEMORY.to_string()
        } else if let Some(stripped) = location.strip_prefix("//") {
            stripped.to_string()
        } else {
            location.to_string()
        };

        if path.is_empty() {
            return Err(DbError::Configuration(format!(
                "SQLite connection string has no database path: {}",
                connection_string
            )));
        }

        let mut options = Self::new(path);
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    DbError::Configuration(format!("SQLite option '{}' has no value", pair))
                })?;
                options.apply(key.trim(), value.trim())?;
            }
        }

        Ok(options)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "auto_commit" | "autocommit" => self.auto_commit = parse_flag(key, value)?,
            "foreign_keys" => self.foreign_keys = parse_flag(key, value)?,
            "busy_timeout" => {
                let ms = value.parse::<u64>().map_err(|_| {
                    DbError::Configuration(format!(
                        "busy_timeout must be a number of milliseconds, got '{}'",
                        value
                    ))
                })?;
                self.busy_timeout = Some(Duration::from_millis(ms));
            }
            "journal_mode" => {
                let mode = value.to_ascii_uppercase();
                match mode.as_str() {
                    "DELETE" | "TRUNCATE" | "PERSIST" | "MEMORY" | "WAL" | "OFF" => {
                        self.journal_mode = Some(mode)
                    }
                    _ => {
                        return Err(DbError::Configuration(format!(
                            "unknown journal_mode '{}'",
                            value
                        )));
                    }
                }
            }
            _ => {
                return Err(DbError::Configuration(format!(
                    "unknown SQLite option '{}'",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Whether this is an in-memory database
    pub fn is_memory(&self) -> bool {
        self.path == MEMORY
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" => Ok(false),
        _ => Err(DbError::Configuration(format!(
            "option '{}' expects a boolean, got '{}'",
            key, value
        ))),
    }
}
