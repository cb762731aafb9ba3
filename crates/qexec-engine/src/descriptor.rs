//! Declarative descriptions of queries and stored procedures

use qexec_core::SqlType;

/// A parameterized SQL query.
///
/// Implementations are read concurrently and must not change between calls.
pub trait QueryDescriptor: Send + Sync {
    /// Identity used in error reports
    fn name(&self) -> &str;

    /// SQL text with one `?` per argument
    fn query_text(&self) -> &str;

    /// Argument names in placeholder order
    fn arg_names(&self) -> Vec<&str>;

    /// Number of arguments the query takes
    fn arg_count(&self) -> usize {
        self.arg_names().len()
    }

    /// Connection string of the target database
    fn connection(&self) -> &str;
}

/// A stored procedure described by its signature.
///
/// Implementations are read concurrently and must not change between calls.
pub trait ProcedureDescriptor: Send + Sync {
    /// Identity used in error reports
    fn name(&self) -> &str;

    /// Signature text such as `add_tax(>, >, <)`
    fn signature(&self) -> &str;

    /// Declared SQL type of each signature argument
    fn arg_types(&self) -> &[SqlType];

    /// Number of declared arguments, checked against the signature's markers
    fn arg_count(&self) -> usize {
        self.arg_types().len()
    }

    /// Connection string of the target database
    fn connection(&self) -> &str;
}
