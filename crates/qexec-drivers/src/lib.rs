//! qexec drivers - connection provider implementations
//!
//! This crate bundles the concrete providers for the traits defined in
//! `qexec-core` and a [`DriverRegistry`] that picks one per connection string.

#[cfg(feature = "sqlite")]
pub use qexec_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from qexec-core
pub use qexec_core::{
    ColumnMeta, Connection, ConnectionProvider, Cursor, DbError, Result, SqlType, Statement,
    Value,
};
