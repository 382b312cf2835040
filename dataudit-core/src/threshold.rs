//! Pass/fail classification of executed tests.
//!
//! Evaluation has two regimes. A *missing* result (no tabular result at all,
//! usually because the statement never executed) is not the same thing as a
//! result with zero rows; the missing regime has its own flag-driven
//! branches, including the report-only carve-out for tests that must be
//! reported on success without ever alerting. A *present* result is
//! classified from its row count: either against the operator/threshold pair
//! (`COUNTROWS` criteria) or against the plain expect-rows/expect-none
//! flags.

use crate::models::AuditTest;

/// Criteria sentinel that switches row-count threshold comparison on.
const CRITERIA_COUNT_ROWS: &str = "COUNTROWS";

/// What the runner should send out after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No notification for this test
    Silent,
    /// The test failed; dispatch a failure alert
    FailureAlert,
    /// The test passed but is flagged report-only; dispatch a non-alerting
    /// report with identical formatting
    Report,
}

/// Outcome of evaluating one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the test passed
    pub passed: bool,
    /// Human-readable failure message naming operator, threshold, and
    /// actual count; `None` when the test passed or when the execution
    /// phase already recorded its own message
    pub failure_message: Option<String>,
    /// Notification decision for the runner
    pub dispatch: Dispatch,
}

impl Evaluation {
    fn passed_with(dispatch: Dispatch) -> Self {
        Self {
            passed: true,
            failure_message: None,
            dispatch,
        }
    }

    fn failed(failure_message: Option<String>) -> Self {
        Self {
            passed: false,
            failure_message,
            dispatch: Dispatch::FailureAlert,
        }
    }
}

/// Evaluates a test against the outcome of its execution.
///
/// `row_count` is `None` when no tabular result was produced at all and
/// `Some(n)` for a real result with `n` rows.
#[must_use]
pub fn evaluate(test: &AuditTest, row_count: Option<u64>) -> Evaluation {
    match row_count {
        None => evaluate_missing_result(test),
        Some(rows) => evaluate_row_count(test, rows),
    }
}

/// Missing-result regime: the statement produced no tabular result.
///
/// Passes unless `fail_if_condition_is_true` is set. When that flag is set
/// together with `send_report`, the test still passes and nothing is
/// dispatched — a deliberate carve-out for two-threshold setups where the
/// second threshold lives in the data itself. With the flag set alone, the
/// test fails and a failure alert goes out; the failure message recorded
/// during execution (if any) stands.
fn evaluate_missing_result(test: &AuditTest) -> Evaluation {
    if !test.fail_if_condition_is_true {
        return Evaluation::passed_with(Dispatch::Silent);
    }

    if test.send_report {
        Evaluation::passed_with(Dispatch::Silent)
    } else {
        Evaluation::failed(None)
    }
}

/// Present-result regime: classify from the returned row count.
fn evaluate_row_count(test: &AuditTest, rows: u64) -> Evaluation {
    let (passed, failure_message) = if test.test_returned_rows {
        if test.criteria.eq_ignore_ascii_case(CRITERIA_COUNT_ROWS) {
            let passed = test.operator.compare(rows, test.row_count);
            let message = (!passed).then(|| {
                format!(
                    "The failure threshold was {} {} rows. This audit returned {} rows.",
                    test.operator.phrase(),
                    test.row_count,
                    rows
                )
            });
            (passed, message)
        } else {
            let passed = rows > 0;
            let message = (!passed).then(|| {
                format!(
                    "This audit was set to have more than zero rows returned. \
                     This audit returned {rows} rows."
                )
            });
            (passed, message)
        }
    } else {
        let passed = rows == 0;
        let message = (!passed).then(|| {
            format!("This audit was set to not return any rows. This audit returned {rows} rows.")
        });
        (passed, message)
    };

    if passed {
        let dispatch = if test.send_report {
            Dispatch::Report
        } else {
            Dispatch::Silent
        };
        Evaluation::passed_with(dispatch)
    } else {
        Evaluation::failed(failure_message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{AuditTest, ThresholdOperator};

    fn count_rows_test(operator: ThresholdOperator, threshold: u64) -> AuditTest {
        AuditTest::new()
            .with_test_returned_rows(true)
            .with_criteria("COUNTROWS")
            .with_operator(operator)
            .with_row_count(threshold)
    }

    #[test]
    fn test_count_rows_within_threshold_passes() {
        let test = count_rows_test(ThresholdOperator::LessOrEqual, 10);
        let evaluation = evaluate(&test, Some(10));

        assert!(evaluation.passed);
        assert!(evaluation.failure_message.is_none());
        assert_eq!(evaluation.dispatch, Dispatch::Silent);
    }

    #[test]
    fn test_count_rows_over_threshold_fails_with_message() {
        let test = count_rows_test(ThresholdOperator::LessOrEqual, 10);
        let evaluation = evaluate(&test, Some(11));

        assert!(!evaluation.passed);
        assert_eq!(
            evaluation.failure_message.as_deref(),
            Some(
                "The failure threshold was less than or equal to 10 rows. \
                 This audit returned 11 rows."
            )
        );
        assert_eq!(evaluation.dispatch, Dispatch::FailureAlert);
    }

    #[test]
    fn test_count_rows_operator_table() {
        // (operator, threshold, actual, expected pass) - the full table,
        // including boundary values.
        let cases = [
            (ThresholdOperator::GreaterThan, 10, 11, true),
            (ThresholdOperator::GreaterThan, 10, 10, false),
            (ThresholdOperator::GreaterOrEqual, 10, 10, true),
            (ThresholdOperator::GreaterOrEqual, 10, 9, false),
            (ThresholdOperator::LessThan, 10, 9, true),
            (ThresholdOperator::LessThan, 10, 10, false),
            (ThresholdOperator::LessOrEqual, 10, 10, true),
            (ThresholdOperator::LessOrEqual, 10, 11, false),
            (ThresholdOperator::Equal, 10, 10, true),
            (ThresholdOperator::Equal, 10, 9, false),
        ];

        for (operator, threshold, actual, expected) in cases {
            let test = count_rows_test(operator, threshold);
            let evaluation = evaluate(&test, Some(actual));
            assert_eq!(
                evaluation.passed, expected,
                "operator {} threshold {} actual {}",
                operator, threshold, actual
            );
        }
    }

    #[test]
    fn test_count_rows_failure_message_phrases() {
        let cases = [
            (ThresholdOperator::GreaterThan, "greater than"),
            (ThresholdOperator::GreaterOrEqual, "greater than or equal to"),
            (ThresholdOperator::LessThan, "less than"),
            (ThresholdOperator::LessOrEqual, "less than or equal to"),
            (ThresholdOperator::Equal, "equal to"),
        ];

        for (operator, phrase) in cases {
            // Pick an actual value that fails each comparison against 5.
            let actual = match operator {
                ThresholdOperator::GreaterThan | ThresholdOperator::GreaterOrEqual => 1,
                _ => 9,
            };
            let test = count_rows_test(operator, 5);
            let evaluation = evaluate(&test, Some(actual));

            assert!(!evaluation.passed);
            let message = evaluation.failure_message.unwrap();
            assert_eq!(
                message,
                format!(
                    "The failure threshold was {phrase} 5 rows. \
                     This audit returned {actual} rows."
                )
            );
        }
    }

    #[test]
    fn test_criteria_count_rows_is_case_insensitive() {
        let test = AuditTest::new()
            .with_test_returned_rows(true)
            .with_criteria("countrows")
            .with_operator(ThresholdOperator::Equal)
            .with_row_count(3);

        let evaluation = evaluate(&test, Some(3));
        assert!(evaluation.passed);
    }

    #[test]
    fn test_expect_rows_without_count_rows() {
        let test = AuditTest::new().with_test_returned_rows(true);

        assert!(evaluate(&test, Some(1)).passed);

        let evaluation = evaluate(&test, Some(0));
        assert!(!evaluation.passed);
        assert_eq!(
            evaluation.failure_message.as_deref(),
            Some(
                "This audit was set to have more than zero rows returned. \
                 This audit returned 0 rows."
            )
        );
    }

    #[test]
    fn test_expect_no_rows() {
        let test = AuditTest::new().with_test_returned_rows(false);

        assert!(evaluate(&test, Some(0)).passed);

        let evaluation = evaluate(&test, Some(3));
        assert!(!evaluation.passed);
        assert_eq!(
            evaluation.failure_message.as_deref(),
            Some("This audit was set to not return any rows. This audit returned 3 rows.")
        );
        assert_eq!(evaluation.dispatch, Dispatch::FailureAlert);
    }

    #[test]
    fn test_missing_result_passes_by_default() {
        let test = AuditTest::new();
        let evaluation = evaluate(&test, None);

        assert!(evaluation.passed);
        assert_eq!(evaluation.dispatch, Dispatch::Silent);
    }

    #[test]
    fn test_missing_result_fails_when_condition_flag_set() {
        let test = AuditTest::new().with_fail_if_condition_is_true(true);
        let evaluation = evaluate(&test, None);

        assert!(!evaluation.passed);
        assert_eq!(evaluation.dispatch, Dispatch::FailureAlert);
        assert!(
            evaluation.failure_message.is_none(),
            "the execution phase owns the message for this branch"
        );
    }

    #[test]
    fn test_missing_result_report_carve_out() {
        // fail_if_condition_is_true + send_report: still a pass, and
        // nothing is dispatched - not even a report.
        let test = AuditTest::new()
            .with_fail_if_condition_is_true(true)
            .with_send_report(true);
        let evaluation = evaluate(&test, None);

        assert!(evaluation.passed);
        assert_eq!(evaluation.dispatch, Dispatch::Silent);
    }

    #[test]
    fn test_passing_test_with_send_report_dispatches_report() {
        let test = count_rows_test(ThresholdOperator::Equal, 2).with_send_report(true);
        let evaluation = evaluate(&test, Some(2));

        assert!(evaluation.passed);
        assert_eq!(evaluation.dispatch, Dispatch::Report);
    }
}
