//! Error types for the audit engine.
//!
//! Only one condition is fatal to a run: starting a collection run with no
//! audits loaded. Every per-test failure is captured as data on the test and
//! reported through the notification path instead of propagating.

use thiserror::Error;

/// Main error type for DatAudit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A collection run was requested before any audits were loaded.
    /// This is the only fatal condition in the engine.
    #[error("No audits have been loaded. Please load some audits and try again.")]
    NoAuditsLoaded,

    /// Database session could not be opened (credentials sanitized)
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Statement execution failed during fetch
    #[error("Statement execution failed: {context}")]
    Execution { context: String },

    /// Notification could not be handed to the dispatcher
    #[error("Notification dispatch failed: {context}")]
    Notification {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with AuditError
pub type Result<T> = std::result::Result<T, AuditError>;

/// Masks password values in a semicolon-delimited connection string.
///
/// Keys named `password` or `pwd` (case-insensitive) have their values
/// replaced with `****`; everything else passes through untouched. Safe to
/// call on malformed fragments — pairs without `=` are kept as-is.
///
/// # Example
///
/// ```rust
/// use dataudit_core::error::redact_connection_string;
///
/// let sanitized = redact_connection_string("Server=db1;Uid=app;Pwd=secret");
/// assert_eq!(sanitized, "Server=db1;Uid=app;Pwd=****");
/// assert!(!sanitized.contains("secret"));
/// ```
pub fn redact_connection_string(raw: &str) -> String {
    raw.split(';')
        .map(|item| match item.split_once('=') {
            Some((key, _)) if matches!(key.trim().to_lowercase().as_str(), "password" | "pwd") => {
                format!("{key}=****")
            }
            _ => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

impl AuditError {
    /// Creates a connection error with sanitized context
    pub fn connection_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a statement execution error
    pub fn execution_failed(context: impl Into<String>) -> Self {
        Self::Execution {
            context: context.into(),
        }
    }

    /// Creates a notification dispatch error
    pub fn notification_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Notification {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
