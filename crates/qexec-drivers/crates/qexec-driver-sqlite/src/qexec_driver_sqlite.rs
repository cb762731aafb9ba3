//! SQLite connection provider implementation

mod connection;
mod driver;
mod options;

pub use connection::{SqliteConnection, SqliteCursor, SqliteStatement};
pub use driver::{ProcedureFn, SqliteDriver};
pub use options::SqliteOptions;
