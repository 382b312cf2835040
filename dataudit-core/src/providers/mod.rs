//! Provider traits and registry for unified database access.
//!
//! Every database engine plugs into the engine through the same three
//! operations: open a session, create a parameterizable command, fill a
//! tabular result. The runner never sees provider-internal types — it only
//! consumes [`crate::models::ResultTable`] and the typed
//! [`SessionError`] classification.
//!
//! Providers are looked up through an explicit [`ProviderRegistry`]
//! populated by the host at startup; there is no discovery mechanism.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::ConnectionDescriptor;
use crate::models::{CommandKind, ResultTable};
use crate::Result;

// Database-specific provider modules
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgresql")]
pub mod postgres;

/// How a session-level failure should be interpreted by the engine.
///
/// Providers classify their own failures; the engine never inspects error
/// text to guess at a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// The statement or connection exceeded its configured timeout
    Timeout,
    /// Any other engine-reported failure
    Other,
}

/// A classified failure raised by a provider session.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SessionError {
    /// Classification supplied by the provider
    pub kind: SessionErrorKind,
    /// The engine's own message, surfaced to operators verbatim
    pub message: String,
}

impl SessionError {
    /// Creates a timeout-classified session error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// Creates an unclassified session error.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Other,
            message: message.into(),
        }
    }
}

/// An executable statement handed to a session.
#[derive(Debug, Clone)]
pub struct AuditCommand {
    /// Statement text, exactly as assembled by the query builder
    pub text: String,
    /// Statement kind (SQL text or stored procedure)
    pub kind: CommandKind,
    /// Command timeout the provider must enforce
    pub timeout: Duration,
}

/// Capability contract implemented once per database engine.
///
/// # Object Safety
/// This trait is object-safe so registries can hold
/// `Arc<dyn AuditProvider>` and dispatch dynamically.
#[async_trait]
pub trait AuditProvider: Send + Sync {
    /// Human-readable engine name, used in logs.
    fn engine_name(&self) -> &'static str;

    /// Registry id this provider answers to (for example `sqlite`).
    fn provider_id(&self) -> &'static str;

    /// Opens a session against the engine described by `descriptor`.
    ///
    /// The session is scoped to a single test execution: the runner closes
    /// it on every exit path and never reuses it.
    ///
    /// # Errors
    /// Returns a connection error when the session cannot be opened. The
    /// raw connection string is never included in the error.
    async fn create_session(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn AuditSession>>;

    /// Creates a command for this engine.
    ///
    /// The default implementation builds the engine-agnostic
    /// [`AuditCommand`]; providers only override this when the engine needs
    /// statement rewriting.
    fn create_command(&self, text: &str, kind: CommandKind, timeout: Duration) -> AuditCommand {
        AuditCommand {
            text: text.to_string(),
            kind,
            timeout,
        }
    }
}

/// A live session against one database engine.
#[async_trait]
pub trait AuditSession: Send {
    /// Executes the command and fills a tabular result.
    ///
    /// # Errors
    /// Returns a [`SessionError`] with the provider's own failure
    /// classification. Timeout-classified errors produce the distinguished
    /// timeout message upstream.
    async fn fill(&mut self, command: &AuditCommand) -> std::result::Result<ResultTable, SessionError>;

    /// Releases the underlying connection.
    ///
    /// Called by the runner on every exit path, including after a failed
    /// fill.
    async fn close(&mut self);
}

/// Explicit mapping from provider id to provider instance.
///
/// The host populates this at process start; the engine only reads it.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AuditProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its own id, replacing any previous
    /// registration for that id.
    pub fn register(&mut self, provider: Arc<dyn AuditProvider>) {
        self.providers
            .insert(provider.provider_id().to_string(), provider);
    }

    /// Looks up a provider by id.
    #[must_use]
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn AuditProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Registered provider ids, sorted for stable display.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct NullProvider;

    #[async_trait]
    impl AuditProvider for NullProvider {
        fn engine_name(&self) -> &'static str {
            "Null"
        }

        fn provider_id(&self) -> &'static str {
            "null"
        }

        async fn create_session(
            &self,
            _descriptor: &ConnectionDescriptor,
        ) -> Result<Box<dyn AuditSession>> {
            Err(crate::error::AuditError::configuration(
                "null provider cannot open sessions",
            ))
        }
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(NullProvider));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("null").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.provider_ids(), vec!["null".to_string()]);
    }

    #[test]
    fn test_default_command_carries_inputs() {
        let provider = NullProvider;
        let command =
            provider.create_command("SELECT 1", CommandKind::SqlText, Duration::from_secs(30));

        assert_eq!(command.text, "SELECT 1");
        assert_eq!(command.kind, CommandKind::SqlText);
        assert_eq!(command.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_session_error_classification() {
        let err = SessionError::timeout("took too long");
        assert_eq!(err.kind, SessionErrorKind::Timeout);
        assert_eq!(err.to_string(), "took too long");

        let err = SessionError::other("syntax error");
        assert_eq!(err.kind, SessionErrorKind::Other);
    }
}
