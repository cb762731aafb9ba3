//! Driver registry routing connection strings to connection providers

use std::collections::HashMap;
use std::sync::Arc;

use qexec_core::{Connection, ConnectionProvider, DbError, Result};

/// Registry of available connection providers, keyed by connection-string scheme.
///
/// The scheme is the text before the first `:` (`sqlite` in
/// `sqlite:/tmp/app.db`). Connection strings without a recognizable scheme go
/// to the default provider, if one is set.
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn ConnectionProvider>>,
    default_scheme: Option<String>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
            default_scheme: None,
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        {
            let sqlite: Arc<dyn ConnectionProvider> =
                Arc::new(crate::sqlite::SqliteDriver::new());
            registry.register("sqlite", Arc::clone(&sqlite));
            registry.register("file", sqlite);
            registry.set_default("sqlite");
        }

        registry
    }

    /// Register a provider for a connection-string scheme
    pub fn register(&mut self, scheme: impl Into<String>, driver: Arc<dyn ConnectionProvider>) {
        let scheme = scheme.into().to_ascii_lowercase();
        tracing::info!(driver = %scheme, "registering connection provider");
        self.drivers.insert(scheme, driver);
    }

    /// Route connection strings without a registered scheme to this provider
    pub fn set_default(&mut self, scheme: impl Into<String>) {
        self.default_scheme = Some(scheme.into().to_ascii_lowercase());
    }

    /// Get a provider by scheme
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn ConnectionProvider>> {
        let driver = self.drivers.get(&scheme.to_ascii_lowercase()).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %scheme, "driver not found in registry");
        }
        driver
    }

    /// List all registered schemes
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a scheme is registered
    pub fn has(&self, scheme: &str) -> bool {
        self.drivers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Pick the provider responsible for a connection string
    pub fn resolve(&self, connection_string: &str) -> Result<Arc<dyn ConnectionProvider>> {
        if let Some(scheme) = scheme_of(connection_string)
            && let Some(driver) = self.drivers.get(&scheme)
        {
            return Ok(Arc::clone(driver));
        }

        self.default_scheme
            .as_ref()
            .and_then(|scheme| self.drivers.get(scheme))
            .cloned()
            .ok_or_else(|| {
                DbError::Configuration(format!(
                    "no connection provider registered for scheme '{}'",
                    scheme_of(connection_string).unwrap_or_default()
                ))
            })
    }
}

/// Extract the lower-cased scheme of a connection string.
///
/// Single-letter prefixes are treated as Windows drive letters, not schemes.
fn scheme_of(connection_string: &str) -> Option<String> {
    let (scheme, _) = connection_string.trim().split_once(':')?;
    let valid = scheme.len() > 1
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

impl ConnectionProvider for DriverRegistry {
    fn acquire(&self, connection_string: &str) -> Result<Box<dyn Connection>> {
        let driver = self.resolve(connection_string)?;
        tracing::debug!(
            scheme = scheme_of(connection_string).as_deref().unwrap_or("<default>"),
            "acquiring connection"
        );
        driver.acquire(connection_string)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
