//! The executor: front door for queries and stored-procedure calls

use std::fmt;
use std::sync::Arc;

use qexec_core::{Connection, ConnectionProvider, DbError, FromValue, SqlType, Statement, Value};
use qexec_drivers::DriverRegistry;

use crate::call::build_call_text;
use crate::descriptor::{ProcedureDescriptor, QueryDescriptor};
use crate::error::{ArgumentError, ConfigurationError, EngineError, Result};
use crate::execute::execute_statement;
use crate::package::{ResultPackage, release};
use crate::param::BindParameter;
use crate::reconcile::reconcile;
use crate::shape::{QueryOutcome, ResultShape};
use crate::signature::parse_signature;

/// Executes descriptor-driven queries and stored procedures.
///
/// Every call acquires its own connection from the provider, so one executor
/// can be shared freely between threads.
#[derive(Clone)]
pub struct Executor {
    provider: Arc<dyn ConnectionProvider>,
}

impl Executor {
    /// Create an executor that acquires connections from `provider`
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self { provider }
    }

    /// Create an executor backed by a [`DriverRegistry`] holding every
    /// built-in driver
    pub fn with_default_drivers() -> Self {
        Self::new(Arc::new(DriverRegistry::with_defaults()))
    }

    /// The connection provider in use
    pub fn provider(&self) -> &Arc<dyn ConnectionProvider> {
        &self.provider
    }

    // =========================================================================
    // Query shapes
    // =========================================================================

    /// Run an update/DDL query and return the affected-row count
    pub fn update(&self, query: &dyn QueryDescriptor, args: &[Value]) -> Result<u64> {
        self.execute_query(ResultShape::Update, query, args)?
            .into_row_count()
    }

    /// First column of the first row as an integer, `-1` when there are no rows
    pub fn get_int(&self, query: &dyn QueryDescriptor, args: &[Value]) -> Result<i64> {
        self.execute_query(ResultShape::Integer, query, args)?
            .into_integer()
    }

    /// First column of the first row as text
    pub fn get_string(&self, query: &dyn QueryDescriptor, args: &[Value]) -> Result<Option<String>> {
        self.execute_query(ResultShape::Text, query, args)?
            .into_text()
    }

    /// Open cursor over the query's rows; the caller releases it
    pub fn get_result_package(
        &self,
        query: &dyn QueryDescriptor,
        args: &[Value],
    ) -> Result<ResultPackage> {
        self.execute_query(ResultShape::Package, query, args)?
            .into_package()
    }

    /// First column of the first row coerced to `sql_type`
    pub fn get_typed(
        &self,
        query: &dyn QueryDescriptor,
        sql_type: SqlType,
        args: &[Value],
    ) -> Result<Option<Value>> {
        self.execute_query(ResultShape::Typed(sql_type), query, args)?
            .into_typed()
    }

    /// First column of the first row converted to `T`
    pub fn get_as<T: FromValue>(
        &self,
        query: &dyn QueryDescriptor,
        args: &[Value],
    ) -> Result<Option<T>> {
        self.get_typed(query, T::SQL_TYPE, args)?
            .map(T::from_value)
            .transpose()
            .map_err(EngineError::Execution)
    }

    /// Validate the argument count of `query` and run it for `shape`
    #[tracing::instrument(skip(self, query, args), fields(query = query.name(), args = args.len()))]
    pub fn execute_query(
        &self,
        shape: ResultShape,
        query: &dyn QueryDescriptor,
        args: &[Value],
    ) -> Result<QueryOutcome> {
        let expected = query.arg_count();
        if args.len() != expected {
            return Err(ArgumentError::CountMismatch {
                name: query.name().to_string(),
                arg_names: query.arg_names().into_iter().map(String::from).collect(),
                expected,
                actual: args.len(),
            }
            .into());
        }

        self.execute_query_raw(shape, query.connection(), query.query_text(), args)
    }

    /// Run `sql` against `connection_string`, binding `args` positionally
    pub fn execute_query_raw(
        &self,
        shape: ResultShape,
        connection_string: &str,
        sql: &str,
        args: &[Value],
    ) -> Result<QueryOutcome> {
        self.run(
            shape,
            connection_string,
            |connection| connection.prepare(sql),
            |statement| {
                args.iter()
                    .enumerate()
                    .try_for_each(|(index, value)| statement.set_value(index, value))
            },
        )
    }

    // =========================================================================
    // Stored procedures
    // =========================================================================

    /// Parse the procedure's signature, reconcile `args` against it and call it
    #[tracing::instrument(skip(self, procedure, args), fields(procedure = procedure.name(), args = args.len()))]
    pub fn execute_stored_procedure(
        &self,
        shape: ResultShape,
        procedure: &dyn ProcedureDescriptor,
        args: &[Value],
    ) -> Result<QueryOutcome> {
        require_rows(procedure.name(), shape)?;
        let signature = parse_signature(procedure.name(), procedure.signature())?;
        if signature.arity() != procedure.arg_count() {
            return Err(ConfigurationError::SignatureArityMismatch {
                name: procedure.name().to_string(),
                declared_types: procedure.arg_types().to_vec(),
                signature_count: signature.arity(),
                declared_count: procedure.arg_count(),
            }
            .into());
        }
        let params = reconcile(procedure.name(), &signature.modes, procedure.arg_types(), args)?;

        self.execute_stored_procedure_by_name(
            shape,
            procedure.connection(),
            &signature.name,
            params.as_slice(),
        )
    }

    /// Call the procedure `name` with one placeholder per parameter
    pub fn execute_stored_procedure_by_name<P: BindParameter>(
        &self,
        shape: ResultShape,
        connection_string: &str,
        name: &str,
        params: &[P],
    ) -> Result<QueryOutcome> {
        require_rows(name, shape)?;
        let call_text = build_call_text(name, params.len());
        self.execute_call(shape, connection_string, &call_text, params)
    }

    /// Run a `{call ...}` statement, binding each parameter at its position
    #[tracing::instrument(skip(self, connection_string, params), fields(params = params.len()))]
    pub fn execute_call<P: BindParameter>(
        &self,
        shape: ResultShape,
        connection_string: &str,
        call_text: &str,
        params: &[P],
    ) -> Result<QueryOutcome> {
        require_rows(call_text, shape)?;
        self.run(
            shape,
            connection_string,
            |connection| connection.prepare_call(call_text),
            |statement| {
                params
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, param)| param.bind_to(&mut *statement, index))
            },
        )
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn acquire(&self, connection_string: &str) -> Result<Box<dyn Connection>> {
        self.provider.acquire(connection_string).map_err(|e| {
            tracing::debug!(error = %e, "connection acquisition failed");
            EngineError::Connection(e)
        })
    }

    /// Acquire, prepare, bind and execute. Whatever was opened before a
    /// failure is released before the failure is returned.
    fn run(
        &self,
        shape: ResultShape,
        connection_string: &str,
        prepare: impl FnOnce(&mut dyn Connection) -> std::result::Result<Box<dyn Statement>, DbError>,
        bind: impl FnOnce(&mut dyn Statement) -> std::result::Result<(), DbError>,
    ) -> Result<QueryOutcome> {
        let mut connection = self.acquire(connection_string)?;

        let mut statement = match prepare(connection.as_mut()) {
            Ok(statement) => statement,
            Err(e) => {
                release(None, None, Some(connection));
                return Err(EngineError::Execution(e));
            }
        };

        if let Err(e) = bind(statement.as_mut()) {
            release(None, Some(statement), Some(connection));
            return Err(EngineError::Execution(e));
        }

        execute_statement(shape, connection, statement)
    }
}

/// Procedures always run as queries; an update count is not a valid result.
fn require_rows(name: &str, shape: ResultShape) -> Result<()> {
    if shape.produces_rows() {
        Ok(())
    } else {
        Err(ConfigurationError::UnsupportedShape {
            name: name.to_string(),
            shape: shape.to_string(),
        }
        .into())
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}
