//! Notification composition and the dispatch boundary.
//!
//! The engine composes a complete message — subject, HTML body, recipients,
//! priority — and hands it to a [`NotificationDispatcher`]. Transport
//! concerns (sender address, relay host) belong entirely to the host
//! environment behind that trait.

use async_trait::async_trait;

use crate::error::AuditError;
use crate::models::{Audit, ResultTable};
use crate::report::render_html_table;
use crate::Result;

/// HTML line break used between body sections.
const HTML_BREAK: &str = "<br/>";

/// Delivery priority requested from the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessagePriority {
    /// Regular delivery
    #[default]
    Normal,
    /// Expedited delivery; audit alerts always use this
    High,
}

/// A fully composed notification, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message subject line
    pub subject: String,
    /// HTML message body
    pub html_body: String,
    /// Recipient addresses
    pub recipients: Vec<String>,
    /// Requested delivery priority
    pub priority: MessagePriority,
}

/// Boundary through which composed notifications leave the engine.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Hands a composed notification to the transport.
    ///
    /// # Errors
    /// Returns a notification error when the transport rejects the message.
    async fn dispatch(&self, notification: &Notification) -> Result<()>;
}

/// Composes the notification for a failed test or a report-only test.
///
/// Both paths produce identical formatting; only the trailing "ran at" line
/// distinguishes a report from an audit alert. The body is assembled from
/// the audit's display flags: the query section (name, SQL, target server),
/// the threshold failure message, the comments-and-instructions block, and
/// the rendered result table.
///
/// # Errors
/// Returns a configuration error when `test_index` is out of range.
pub fn compose_notification(
    audit: &Audit,
    test_index: usize,
    table: Option<&ResultTable>,
) -> Result<Notification> {
    let test = audit.tests.get(test_index).ok_or_else(|| {
        AuditError::configuration(format!(
            "audit '{}' has no test at index {}",
            audit.name, test_index
        ))
    })?;

    let mut body = String::new();

    if audit.show_query_message {
        body.push_str(&format!(
            "The '{}' audit has failed. The following SQL statement \
             was used to test this audit :{HTML_BREAK}{HTML_BREAK}",
            audit.name
        ));
        body.push_str(&test.sql_statement_to_check);
        body.push_str(HTML_BREAK);
        body.push_str(HTML_BREAK);
        body.push_str(&format!(
            "<b>This query was ran on: {}</b>{HTML_BREAK}{HTML_BREAK}",
            audit.test_server
        ));
    }

    if audit.show_threshold_message {
        body.push_str(&test.test_failed_message);
        body.push_str(HTML_BREAK);
        body.push_str(HTML_BREAK);
    }

    if !audit.tests.is_empty() {
        body.push_str("COMMENTS AND INSTRUCTIONS");
        body.push_str(HTML_BREAK);
        body.push('\n');
        body.push_str("============================");
        body.push_str(HTML_BREAK);
        body.push('\n');

        for audit_test in &audit.tests {
            if !audit_test.instructions.is_empty() {
                body.push_str(&audit_test.instructions);
                body.push_str(HTML_BREAK);
            }
        }

        body.push_str(HTML_BREAK);
        body.push('\n');
    }

    if audit.include_data_in_email {
        if let Some(table) = table {
            let template = test.template_color_scheme.template();
            body.push_str(&render_html_table(table, &template));
        }
    }

    body.push_str(HTML_BREAK);
    body.push('\n');

    let ran_at = chrono::Local::now().format("%m/%d/%Y %H:%M:%S");
    if test.send_report {
        body.push_str(&format!("This report ran at {ran_at}"));
    } else {
        body.push_str(&format!("This audit ran at {ran_at}"));
    }

    let subject = match &audit.email_subject {
        Some(subject) if !subject.is_empty() => subject.clone(),
        _ => format!("Audit Failure - {}", audit.name),
    };

    Ok(Notification {
        subject,
        html_body: body,
        recipients: audit.email_subscribers.clone(),
        priority: MessagePriority::High,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::AuditTest;
    use crate::report::TemplateScheme;

    fn make_audit() -> Audit {
        let mut audit = Audit::new(
            "orders",
            "Server=db1;Database=sales",
            "postgresql",
            "SELECT id FROM orders",
        )
        .with_test_server("db1")
        .with_subscriber("ops@example.com")
        .with_test(AuditTest::new());

        audit.tests[0].sql_statement_to_check = "SELECT id FROM orders".to_string();
        audit.tests[0].test_failed_message =
            "This audit was set to not return any rows. This audit returned 3 rows.".to_string();
        audit
    }

    #[test]
    fn test_subject_defaults_to_audit_name() {
        let notification = compose_notification(&make_audit(), 0, None).unwrap();
        assert_eq!(notification.subject, "Audit Failure - orders");
    }

    #[test]
    fn test_custom_subject_wins() {
        let audit = make_audit().with_email_subject("Nightly data check");
        let notification = compose_notification(&audit, 0, None).unwrap();
        assert_eq!(notification.subject, "Nightly data check");
    }

    #[test]
    fn test_body_query_section_honors_flag() {
        let mut audit = make_audit();

        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(notification.html_body.contains("The 'orders' audit has failed."));
        assert!(notification.html_body.contains("SELECT id FROM orders"));
        assert!(notification
            .html_body
            .contains("<b>This query was ran on: db1</b>"));

        audit.show_query_message = false;
        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(!notification.html_body.contains("audit has failed"));
    }

    #[test]
    fn test_body_threshold_section_honors_flag() {
        let mut audit = make_audit();

        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(notification
            .html_body
            .contains("This audit returned 3 rows."));

        audit.show_threshold_message = false;
        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(!notification
            .html_body
            .contains("This audit returned 3 rows."));
    }

    #[test]
    fn test_body_instructions_block() {
        let mut audit = make_audit();
        audit.tests[0].instructions = "Rerun the nightly load before escalating.".to_string();

        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(notification.html_body.contains("COMMENTS AND INSTRUCTIONS"));
        assert!(notification
            .html_body
            .contains("Rerun the nightly load before escalating."));
    }

    #[test]
    fn test_body_data_table_requires_flag_and_table() {
        let mut table = ResultTable::new(vec!["id".to_string()]);
        table.push_row(vec!["7".to_string()]);

        let audit = make_audit();
        let notification = compose_notification(&audit, 0, Some(&table)).unwrap();
        assert!(
            !notification.html_body.contains("<TABLE BORDER=1>"),
            "table omitted unless include_data_in_email is set"
        );

        let audit = make_audit().with_include_data_in_email(true);
        let notification = compose_notification(&audit, 0, Some(&table)).unwrap();
        assert!(notification.html_body.contains("<TABLE BORDER=1>"));
        assert!(notification.html_body.contains("<TD>7</TD>"));

        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(!notification.html_body.contains("<TABLE BORDER=1>"));
    }

    #[test]
    fn test_body_table_uses_test_template() {
        let mut table = ResultTable::new(vec!["id".to_string()]);
        table.push_row(vec!["7".to_string()]);

        let mut audit = make_audit().with_include_data_in_email(true);
        audit.tests[0].template_color_scheme = TemplateScheme::Yellow;

        let notification = compose_notification(&audit, 0, Some(&table)).unwrap();
        assert!(notification.html_body.contains("bgcolor=\"FFFF00\""));
    }

    #[test]
    fn test_trailing_line_distinguishes_reports() {
        let audit = make_audit();
        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(notification.html_body.contains("This audit ran at "));

        let mut audit = make_audit();
        audit.tests[0].send_report = true;
        let notification = compose_notification(&audit, 0, None).unwrap();
        assert!(notification.html_body.contains("This report ran at "));
    }

    #[test]
    fn test_recipients_and_priority() {
        let notification = compose_notification(&make_audit(), 0, None).unwrap();
        assert_eq!(notification.recipients, vec!["ops@example.com".to_string()]);
        assert_eq!(notification.priority, MessagePriority::High);
    }

    #[test]
    fn test_out_of_range_index_is_configuration_error() {
        let result = compose_notification(&make_audit(), 5, None);
        assert!(matches!(result, Err(AuditError::Configuration { .. })));
    }
}
