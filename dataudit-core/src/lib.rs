//! Audit execution engine for DatAudit.
//!
//! This crate runs SQL-based correctness checks ("audits") against
//! relational data stores, evaluates each check's result against a
//! configured pass/fail threshold, and composes a formatted alert when a
//! check fails — or, for report-only checks, unconditionally.
//!
//! # Architecture
//! - Heterogeneous engines sit behind the [`providers::AuditProvider`]
//!   capability contract, looked up through an explicit, host-populated
//!   [`providers::ProviderRegistry`].
//! - [`query`] assembles executable statements from an audit's base query
//!   plus per-test criteria substitution.
//! - [`threshold`] classifies returned row counts against
//!   operator-parameterized thresholds.
//! - [`report`] renders result tables into the HTML fragments embedded in
//!   notification bodies; [`notify`] composes the full message and hands it
//!   to the host's transport.
//! - [`runner::AuditRunner`] drives the whole pipeline, strictly
//!   sequentially, raising progress notifications as it goes.

pub mod connection;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod providers;
pub mod query;
pub mod report;
pub mod runner;
pub mod threshold;

// Re-export commonly used types
pub use connection::ConnectionDescriptor;
pub use error::{AuditError, Result};
pub use logging::init_logging;
pub use models::{
    Audit, AuditCollection, AuditState, AuditTest, CommandKind, ResultTable, ThresholdOperator,
};
pub use notify::{MessagePriority, Notification, NotificationDispatcher};
pub use providers::{
    AuditCommand, AuditProvider, AuditSession, ProviderRegistry, SessionError, SessionErrorKind,
};
pub use report::{render_html_table, ReportTemplate, TemplateScheme};
pub use runner::{AuditRunner, ProgressObserver};
pub use threshold::{Dispatch, Evaluation};
