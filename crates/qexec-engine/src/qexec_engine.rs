//! qexec engine - descriptor-driven SQL execution
//!
//! Callers describe a query or stored procedure once, as a [`QueryDescriptor`]
//! or [`ProcedureDescriptor`], and run it through an [`Executor`]. The executor
//! validates the supplied arguments, binds them, executes the statement and
//! returns the result in the requested [`ResultShape`]:
//!
//! ```no_run
//! use qexec_engine::{Catalog, Executor, QueryDescriptor};
//!
//! # fn main() -> anyhow::Result<()> {
//! let catalog = Catalog::load("queries.toml")?;
//! let executor = Executor::with_default_drivers();
//!
//! if let Some(query) = catalog.query("USER_NAME") {
//!     let name = executor.get_string(query, &[42i64.into()])?;
//!     println!("{}: {:?}", query.name(), name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Stored procedures are described by a signature such as `add_tax(>, >, <)`,
//! whose markers give each argument's direction (`>` IN, `<` OUT, `=` INOUT).

mod call;
mod catalog;
mod descriptor;
mod engine;
mod error;
mod execute;
pub mod logging;
#[cfg(test)]
mod mock;
mod package;
mod param;
mod reconcile;
mod shape;
mod signature;

pub use call::build_call_text;
pub use catalog::{Catalog, CatalogError, ProcedureDef, QueryDef};
pub use descriptor::{ProcedureDescriptor, QueryDescriptor};
pub use engine::Executor;
pub use error::{ArgumentError, ConfigurationError, EngineError, Result};
pub use execute::execute_statement;
pub use package::ResultPackage;
pub use param::{BindParameter, Param, ParamMode};
pub use reconcile::reconcile;
pub use shape::{QueryOutcome, ResultShape};
pub use signature::{Signature, parse_signature};

/// Re-export commonly used types from qexec-core
pub use qexec_core::{
    ColumnMeta, Connection, ConnectionProvider, Cursor, DbError, FromValue, SqlType, Statement,
    Value,
};
pub use qexec_drivers::DriverRegistry;
