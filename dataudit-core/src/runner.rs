//! Sequential execution of audit collections.
//!
//! The runner advances one test at a time, one audit at a time: build the
//! statement, open a session, fill, close the session, evaluate, dispatch.
//! Sessions never outlive the test they were opened for. Per-test failures
//! become data on the test and the run moves on; the only fatal condition
//! is running a collection that was never loaded.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::connection::ConnectionDescriptor;
use crate::error::{redact_connection_string, AuditError};
use crate::models::{Audit, AuditCollection, AuditState, ResultTable};
use crate::notify::{compose_notification, NotificationDispatcher};
use crate::providers::{ProviderRegistry, SessionErrorKind};
use crate::threshold::{self, Dispatch};
use crate::{query, Result};

/// Observer for run progress.
///
/// All callbacks are observational: they fire strictly before/after the
/// associated work, carry no control meaning, and default to no-ops.
pub trait ProgressObserver: Send + Sync {
    /// A collection run is about to start.
    fn collection_starting(&self) {}

    /// The audit at `index` is about to run as part of a collection run.
    fn audit_running(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// The audit at `index` finished running as part of a collection run.
    fn audit_done(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// A standalone single-audit run is about to start.
    fn single_audit_running(&self, audit: &Audit) {
        let _ = audit;
    }

    /// A standalone single-audit run finished.
    fn single_audit_done(&self, audit: &Audit) {
        let _ = audit;
    }
}

/// Runs audits sequentially and dispatches notifications on failure and
/// report conditions.
///
/// Runners share no mutable state: running several collections in parallel
/// means one independent runner each.
pub struct AuditRunner {
    audits: Option<AuditCollection>,
    registry: ProviderRegistry,
    dispatcher: Arc<dyn NotificationDispatcher>,
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl AuditRunner {
    /// Creates a runner with no audits loaded.
    #[must_use]
    pub fn new(registry: ProviderRegistry, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            audits: None,
            registry,
            dispatcher,
            observers: Vec::new(),
        }
    }

    /// Loads the collection to run.
    pub fn load_audits(&mut self, audits: AuditCollection) {
        self.audits = Some(audits);
    }

    /// Builder method to load the collection to run.
    #[must_use]
    pub fn with_audits(mut self, audits: AuditCollection) -> Self {
        self.audits = Some(audits);
        self
    }

    /// Registers a progress observer.
    pub fn add_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    /// The loaded collection, if any.
    #[must_use]
    pub fn audits(&self) -> Option<&AuditCollection> {
        self.audits.as_ref()
    }

    /// Runs every audit in the loaded collection, in insertion order.
    ///
    /// # Errors
    /// Returns [`AuditError::NoAuditsLoaded`] when no collection was loaded
    /// or the loaded collection is empty. No events fire in that case.
    pub async fn run_audits(&mut self) -> Result<()> {
        let mut audits = self.audits.take().ok_or(AuditError::NoAuditsLoaded)?;

        if audits.is_empty() {
            self.audits = Some(audits);
            return Err(AuditError::NoAuditsLoaded);
        }

        info!("Starting collection run of {} audits", audits.len());

        for observer in &self.observers {
            observer.collection_starting();
        }

        for (index, audit) in audits.iter_mut().enumerate() {
            for observer in &self.observers {
                observer.audit_running(index, &audit.name);
            }

            self.run_tests(audit).await;

            for observer in &self.observers {
                observer.audit_done(index, &audit.name);
            }
        }

        info!("Collection run finished");

        self.audits = Some(audits);
        Ok(())
    }

    /// Runs a single audit outside the collection loop.
    pub async fn run_audit(&self, audit: &mut Audit) {
        for observer in &self.observers {
            observer.single_audit_running(audit);
        }

        self.run_tests(audit).await;

        for observer in &self.observers {
            observer.single_audit_done(audit);
        }
    }

    /// Runs an audit's tests in index order.
    async fn run_tests(&self, audit: &mut Audit) {
        audit.reset_run_state();

        info!(
            "Running audit '{}' ({} tests) against {}",
            audit.name,
            audit.tests.len(),
            redact_connection_string(&audit.connection_string)
        );

        for test_index in 0..audit.tests.len() {
            let table = self.execute_test(audit, test_index).await;
            let row_count = table.as_ref().map(|t| t.row_count() as u64);

            let evaluation = threshold::evaluate(&audit.tests[test_index], row_count);

            if let Some(message) = evaluation.failure_message {
                audit.tests[test_index].test_failed_message = message;
            }

            audit.result = if evaluation.passed {
                AuditState::Passed
            } else {
                AuditState::Failed
            };

            match evaluation.dispatch {
                Dispatch::Silent => {}
                Dispatch::FailureAlert | Dispatch::Report => {
                    self.dispatch_notification(audit, test_index, table.as_ref())
                        .await;
                }
            }
        }

        audit.has_run = true;
    }

    /// Builds and executes one test's statement, returning its tabular
    /// result.
    ///
    /// Every failure along the way — unknown provider, session open,
    /// statement execution — is recorded on the test, logged, and collapsed
    /// into `None` so the evaluation's missing-result regime takes over.
    /// The session is closed on every exit path.
    async fn execute_test(&self, audit: &mut Audit, test_index: usize) -> Option<ResultTable> {
        let Some(provider) = self.registry.get(&audit.provider) else {
            let message = format!("No database provider registered for id '{}'.", audit.provider);
            warn!("Audit '{}': {}", audit.name, message);
            if let Some(test) = audit.tests.get_mut(test_index) {
                test.test_failed_message = message;
            }
            return None;
        };

        let descriptor = ConnectionDescriptor::new(&audit.connection_string, &audit.provider);

        let sql = match query::build_statement(audit, test_index) {
            Ok(sql) => sql,
            Err(e) => {
                debug!("Audit '{}': statement build failed: {}", audit.name, e);
                if let Some(test) = audit.tests.get_mut(test_index) {
                    test.test_failed_message = e.to_string();
                }
                return None;
            }
        };

        let mut session = match provider.create_session(&descriptor).await {
            Ok(session) => session,
            Err(e) => {
                debug!(
                    "Audit '{}': session open failed against {}: {}",
                    audit.name,
                    redact_connection_string(&audit.connection_string),
                    e
                );
                if let Some(test) = audit.tests.get_mut(test_index) {
                    test.test_failed_message = e.to_string();
                }
                return None;
            }
        };

        let command = provider.create_command(&sql, audit.sql_type, descriptor.command_timeout);

        let outcome = session.fill(&command).await;
        session.close().await;

        match outcome {
            Ok(table) => Some(table),
            Err(session_error) => {
                let message = match session_error.kind {
                    SessionErrorKind::Timeout => format!(
                        "Timeout expired while running this audit. \
                         The connection timeout was {} seconds. \
                         The command timeout was {} seconds.",
                        descriptor.connect_timeout.as_secs(),
                        descriptor.command_timeout.as_secs()
                    ),
                    SessionErrorKind::Other => session_error.message.clone(),
                };

                debug!(
                    "Audit '{}' test {}: execution failed: {}",
                    audit.name, test_index, session_error
                );

                if let Some(test) = audit.tests.get_mut(test_index) {
                    test.test_failed_message = message;
                }

                None
            }
        }
    }

    /// Composes and dispatches a notification for the given test.
    ///
    /// Dispatch failures are logged and swallowed: a broken transport must
    /// not abort the remaining tests, and the failure is still observable
    /// through the test's recorded message and this log entry.
    async fn dispatch_notification(
        &self,
        audit: &Audit,
        test_index: usize,
        table: Option<&ResultTable>,
    ) {
        let notification = match compose_notification(audit, test_index, table) {
            Ok(notification) => notification,
            Err(e) => {
                warn!(
                    "Audit '{}': could not compose notification: {}",
                    audit.name, e
                );
                return;
            }
        };

        if notification.recipients.is_empty() {
            debug!(
                "Audit '{}': no subscribers configured, skipping dispatch",
                audit.name
            );
            return;
        }

        if let Err(e) = self.dispatcher.dispatch(&notification).await {
            warn!("Audit '{}': notification dispatch failed: {}", audit.name, e);
        }
    }
}

impl std::fmt::Debug for AuditRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRunner")
            .field("audits", &self.audits.as_ref().map(AuditCollection::len))
            .field("registry", &self.registry)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
