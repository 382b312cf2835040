//! Dynamic statement assembly.
//!
//! A test either runs the audit's base statement as-is or narrows it with a
//! where-clause resolved from the test's criteria. Whatever text comes out
//! of here is cached on the test as `sql_statement_to_check` — that field is
//! the auditable record of what was actually sent to the engine, and it is
//! written before execution so it survives execution failures.

use crate::error::AuditError;
use crate::models::{Audit, AuditTest};
use crate::Result;

/// Criteria sentinel resolved into a same-day date comparison.
const CRITERIA_TODAY: &str = "TODAY";

/// Assembles the executable statement for one test of an audit.
///
/// With `use_criteria` unset the base statement is returned unchanged.
/// Otherwise the result is base + `" WHERE "` + the resolved where-clause,
/// plus `" ORDER BY "` + the audit's order-by clause when one is configured
/// and non-empty. The produced text is always written to the test's
/// `sql_statement_to_check` before returning, so repeated calls with
/// unchanged inputs are idempotent.
///
/// # Errors
/// Returns a configuration error when `test_index` is out of range.
pub fn build_statement(audit: &mut Audit, test_index: usize) -> Result<String> {
    let base_statement = audit.sql_statement.clone();
    let order_by = audit.order_by_clause.clone();
    let audit_name = audit.name.clone();

    let test = audit
        .tests
        .get_mut(test_index)
        .ok_or_else(|| AuditError::configuration(format!(
            "audit '{audit_name}' has no test at index {test_index}"
        )))?;

    let result = if test.use_criteria {
        let mut sql = base_statement;
        sql.push_str(" WHERE ");
        sql.push_str(&resolve_where_clause(test));

        if let Some(order_by) = order_by {
            if !order_by.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order_by);
            }
        }

        sql
    } else {
        base_statement
    };

    test.sql_statement_to_check = result.clone();

    Ok(result)
}

/// Resolves a test's criteria into a where-clause.
///
/// The `TODAY` sentinel (case-insensitive) becomes a same-day date
/// comparison over the test's column and is cached onto the test. Any other
/// criteria value means the test's stored where-clause is already fully
/// formed and is returned unchanged.
fn resolve_where_clause(test: &mut AuditTest) -> String {
    if test.criteria.eq_ignore_ascii_case(CRITERIA_TODAY) {
        let clause = format!(
            "{} {}0",
            today_expression(&test.column_name),
            test.operator
        );
        test.where_clause = clause.clone();
        clause
    } else {
        test.where_clause.clone()
    }
}

/// Day-difference expression comparing a column against the current date.
fn today_expression(column_name: &str) -> String {
    format!("DATEDIFF(day, {column_name}, getdate())")
}
