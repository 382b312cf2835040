//! Host-side implementations of the engine's boundary traits.
//!
//! This console host has no mail relay: composed notifications are emitted
//! through the log, which keeps every alert observable while leaving real
//! transport wiring to deployments that need it. Progress events map onto
//! INFO lines the same way.

use async_trait::async_trait;
use tracing::{debug, info};

use dataudit_core::providers::ProviderRegistry;
use dataudit_core::{Audit, Notification, NotificationDispatcher, ProgressObserver};

/// Builds the provider registry for this host from the compiled-in drivers.
pub fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "sqlite")]
    registry.register(std::sync::Arc::new(
        dataudit_core::providers::sqlite::SqliteAuditProvider::new(),
    ));

    #[cfg(feature = "postgresql")]
    registry.register(std::sync::Arc::new(
        dataudit_core::providers::postgres::PostgresAuditProvider::new(),
    ));

    registry
}

/// Dispatcher that emits composed notifications through the log.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: &Notification) -> dataudit_core::Result<()> {
        info!(
            "Notification '{}' for {} recipient(s): {}",
            notification.subject,
            notification.recipients.len(),
            notification.recipients.join(", ")
        );
        debug!("Notification body: {}", notification.html_body);
        Ok(())
    }
}

/// Progress observer that narrates the run at INFO level.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn collection_starting(&self) {
        info!("Audit collection starting");
    }

    fn audit_running(&self, index: usize, name: &str) {
        info!("Audit #{} '{}' running", index, name);
    }

    fn audit_done(&self, index: usize, name: &str) {
        info!("Audit #{} '{}' done", index, name);
    }

    fn single_audit_running(&self, audit: &Audit) {
        info!("Audit '{}' running", audit.name);
    }

    fn single_audit_done(&self, audit: &Audit) {
        info!("Audit '{}' done", audit.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_holds_compiled_providers() {
        let registry = build_registry();

        #[cfg(feature = "sqlite")]
        assert!(registry.get("sqlite").is_some());

        #[cfg(feature = "postgresql")]
        assert!(registry.get("postgresql").is_some());
    }

    #[tokio::test]
    async fn test_log_dispatcher_accepts_notifications() {
        let dispatcher = LogDispatcher;
        let notification = Notification {
            subject: "Audit Failure - orders".to_string(),
            html_body: "<br/>".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            priority: dataudit_core::MessagePriority::High,
        };

        assert!(dispatcher.dispatch(&notification).await.is_ok());
    }
}
