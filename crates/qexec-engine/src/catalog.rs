//! TOML catalog of query and procedure descriptors
//!
//! ```toml
//! [connections]
//! default = "sqlite:/var/lib/app/app.db"
//! reporting = "sqlite:/var/lib/app/reports.db?busy_timeout=5000"
//!
//! [queries.USER_NAME]
//! sql = "SELECT name FROM users WHERE id = ?"
//! args = ["id"]
//!
//! [procedures.ADD_TAX]
//! signature = "add_tax(>, >)"
//! arg_types = ["DOUBLE", "DOUBLE"]
//! connection = "reporting"
//! ```
//!
//! An entry's `connection` names an alias from `[connections]` or is itself a
//! connection string. Entries without one use the `default` alias.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use qexec_core::SqlType;
use serde::Deserialize;
use thiserror::Error;

use crate::descriptor::{ProcedureDescriptor, QueryDescriptor};
use crate::error::ConfigurationError;
use crate::signature::parse_signature;

const DEFAULT_CONNECTION: &str = "default";

/// Errors that can occur while building a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{kind} {name} has no connection and the catalog defines no default connection")]
    MissingConnection { kind: &'static str, name: String },

    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

/// A query loaded from a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDef {
    name: String,
    sql: String,
    args: Vec<String>,
    connection: String,
}

impl QueryDef {
    pub fn new(
        name: impl Into<String>,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        connection: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            args: args.into_iter().map(Into::into).collect(),
            connection: connection.into(),
        }
    }
}

impl QueryDescriptor for QueryDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_text(&self) -> &str {
        &self.sql
    }

    fn arg_names(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }

    fn arg_count(&self) -> usize {
        self.args.len()
    }

    fn connection(&self) -> &str {
        &self.connection
    }
}

/// A stored procedure loaded from a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDef {
    name: String,
    signature: String,
    arg_types: Vec<SqlType>,
    connection: String,
}

impl ProcedureDef {
    pub fn new(
        name: impl Into<String>,
        signature: impl Into<String>,
        arg_types: impl IntoIterator<Item = SqlType>,
        connection: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            arg_types: arg_types.into_iter().collect(),
            connection: connection.into(),
        }
    }

    /// Check that the signature parses and agrees with the declared types
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let signature = parse_signature(&self.name, &self.signature)?;
        if signature.arity() != self.arg_types.len() {
            return Err(ConfigurationError::SignatureArityMismatch {
                name: self.name.clone(),
                declared_types: self.arg_types.clone(),
                signature_count: signature.arity(),
                declared_count: self.arg_types.len(),
            });
        }
        Ok(())
    }
}

impl ProcedureDescriptor for ProcedureDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn arg_types(&self) -> &[SqlType] {
        &self.arg_types
    }

    fn connection(&self) -> &str {
        &self.connection
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    connections: BTreeMap<String, String>,
    #[serde(default)]
    queries: BTreeMap<String, QueryEntry>,
    #[serde(default)]
    procedures: BTreeMap<String, ProcedureEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryEntry {
    sql: String,
    #[serde(default)]
    args: Vec<String>,
    connection: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcedureEntry {
    signature: String,
    #[serde(default)]
    arg_types: Vec<SqlType>,
    connection: Option<String>,
}

/// Named queries and procedures with their connections resolved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    queries: BTreeMap<String, QueryDef>,
    procedures: BTreeMap<String, ProcedureDef>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a query
    pub fn with_query(mut self, query: QueryDef) -> Self {
        self.queries.insert(query.name.clone(), query);
        self
    }

    /// Add or replace a procedure
    pub fn with_procedure(mut self, procedure: ProcedureDef) -> Self {
        self.procedures.insert(procedure.name.clone(), procedure);
        self
    }

    /// Parse and validate a catalog from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        let resolve = |kind: &'static str, name: &str, connection: Option<String>| {
            let key = connection.unwrap_or_else(|| DEFAULT_CONNECTION.to_string());
            match file.connections.get(&key) {
                Some(connection_string) => Ok(connection_string.clone()),
                None if key == DEFAULT_CONNECTION => Err(CatalogError::MissingConnection {
                    kind,
                    name: name.to_string(),
                }),
                None => Ok(key),
            }
        };

        let mut catalog = Catalog::new();
        for (name, entry) in &file.queries {
            let connection = resolve("Query", name, entry.connection.clone())?;
            catalog = catalog.with_query(QueryDef::new(
                name.as_str(),
                entry.sql.as_str(),
                entry.args.iter().map(String::as_str),
                connection,
            ));
        }
        for (name, entry) in &file.procedures {
            let connection = resolve("Procedure", name, entry.connection.clone())?;
            catalog = catalog.with_procedure(ProcedureDef::new(
                name.as_str(),
                entry.signature.as_str(),
                entry.arg_types.iter().copied(),
                connection,
            ));
        }

        catalog.validate()?;
        tracing::debug!(
            queries = catalog.queries.len(),
            procedures = catalog.procedures.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Load and validate a catalog file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog from {:?}", path))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid catalog {:?}", path))
    }

    /// Check every procedure signature against its declared types
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.procedures.values().try_for_each(ProcedureDef::validate)
    }

    pub fn query(&self, name: &str) -> Option<&QueryDef> {
        self.queries.get(name)
    }

    pub fn procedure(&self, name: &str) -> Option<&ProcedureDef> {
        self.procedures.get(name)
    }

    /// Queries in name order
    pub fn queries(&self) -> impl Iterator<Item = &QueryDef> {
        self.queries.values()
    }

    /// Procedures in name order
    pub fn procedures(&self) -> impl Iterator<Item = &ProcedureDef> {
        self.procedures.values()
    }
}

#[cfg(test)]
mod tests;
