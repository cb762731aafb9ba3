//! qexec Core - Core abstractions shared by the execution engine and its drivers
//!
//! This crate provides the fundamental traits and types that all other
//! qexec crates depend on. It defines:
//!
//! - `ConnectionProvider` - Trait for turning a connection string into a live connection
//! - `Connection`, `Statement`, `Cursor` - The blocking driver surface the engine drives
//! - `Value` and `SqlType` - Database values and the type codes used to coerce them
//! - `FromValue` - Conversion from a `Value` into plain Rust types

mod connection;
mod error;
mod types;

pub use connection::*;
pub use error::*;
pub use types::*;
