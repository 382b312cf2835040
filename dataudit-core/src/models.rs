//! Core data model for audits, tests, and tabular results.
//!
//! An [`AuditCollection`] owns an ordered list of [`Audit`]s; each audit owns
//! an ordered list of [`AuditTest`]s. Order is significant — it is the
//! execution order. The runner is the only mutator of the run-state fields
//! (`result`, `has_run`, `test_failed_message`, `sql_statement_to_check`).

use serde::{Deserialize, Serialize};

use crate::report::TemplateScheme;

/// How a statement should be executed by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Plain SQL text
    #[default]
    SqlText,
    /// Stored procedure invocation
    StoredProcedure,
}

/// Outcome of the most recent run of an audit.
///
/// `NotRun` is distinct from both terminal states so a loaded-but-unexecuted
/// audit is never mistaken for a passing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditState {
    /// The audit has not been executed yet
    #[default]
    NotRun,
    /// Every test held on the most recent run
    Passed,
    /// At least one test broke its threshold on the most recent run
    Failed,
}

/// Comparison operator applied between a returned row count and the
/// configured threshold.
///
/// Parses the five symbols, including the alias pairs `>=`/`=>` and
/// `<=`/`=<`; always serializes back to the canonical symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ThresholdOperator {
    /// Pass when `actual > threshold`
    GreaterThan,
    /// Pass when `actual >= threshold`
    GreaterOrEqual,
    /// Pass when `actual < threshold`
    LessThan,
    /// Pass when `actual <= threshold`
    LessOrEqual,
    /// Pass when `actual == threshold`
    Equal,
}

impl ThresholdOperator {
    /// Evaluates the comparison for a returned row count against the
    /// configured threshold.
    #[must_use]
    pub fn compare(self, actual: u64, threshold: u64) -> bool {
        match self {
            Self::GreaterThan => actual > threshold,
            Self::GreaterOrEqual => actual >= threshold,
            Self::LessThan => actual < threshold,
            Self::LessOrEqual => actual <= threshold,
            Self::Equal => actual == threshold,
        }
    }

    /// The canonical symbol for this operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "=",
        }
    }

    /// The relation phrase used when composing failure messages.
    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            Self::GreaterThan => "greater than",
            Self::GreaterOrEqual => "greater than or equal to",
            Self::LessThan => "less than",
            Self::LessOrEqual => "less than or equal to",
            Self::Equal => "equal to",
        }
    }
}

impl Default for ThresholdOperator {
    fn default() -> Self {
        Self::GreaterThan
    }
}

impl std::str::FromStr for ThresholdOperator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Self::GreaterThan),
            ">=" | "=>" => Ok(Self::GreaterOrEqual),
            "<" => Ok(Self::LessThan),
            "<=" | "=<" => Ok(Self::LessOrEqual),
            "=" => Ok(Self::Equal),
            other => Err(format!("unrecognized threshold operator '{other}'")),
        }
    }
}

impl TryFrom<String> for ThresholdOperator {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThresholdOperator> for String {
    fn from(op: ThresholdOperator) -> Self {
        op.symbol().to_string()
    }
}

impl std::fmt::Display for ThresholdOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Engine-agnostic tabular result produced by a provider session.
///
/// Cell values are already rendered to strings by the provider; SQL NULLs
/// arrive as empty strings. Column and row order match the engine's result
/// set exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    /// Ordered column names
    pub columns: Vec<String>,
    /// Rows of string cells, one cell per column
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Creates an empty table with the given column names.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row of cells.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Number of data rows in the table.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One concrete pass/fail rule evaluated against the audit's query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTest {
    /// Criteria modifier: `TODAY`, `COUNTROWS`, or a literal stored clause
    #[serde(default)]
    pub criteria: String,
    /// Column the `TODAY` criteria applies to
    #[serde(default)]
    pub column_name: String,
    /// Comparison operator for row-count thresholds
    #[serde(default)]
    pub operator: ThresholdOperator,
    /// Row-count threshold
    #[serde(default)]
    pub row_count: u64,
    /// Stored where-clause; also the cache target for resolved `TODAY`
    /// criteria
    #[serde(default)]
    pub where_clause: String,
    /// The exact statement last sent to the engine for this test.
    /// Retained for reporting, whatever happened during execution.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sql_statement_to_check: String,
    /// True when the test expects rows back, false when it expects none
    #[serde(default)]
    pub test_returned_rows: bool,
    /// Inverts the empty-result regime: an unexecutable statement becomes a
    /// failure instead of a pass
    #[serde(default)]
    pub fail_if_condition_is_true: bool,
    /// Report-only: dispatch a non-alerting report when the test passes
    #[serde(default)]
    pub send_report: bool,
    /// Operator instructions included in the notification body
    #[serde(default)]
    pub instructions: String,
    /// Color template applied when the result table is rendered
    #[serde(default)]
    pub template_color_scheme: TemplateScheme,
    /// Whether the audit's base statement is narrowed with a where-clause
    #[serde(default)]
    pub use_criteria: bool,
    /// Failure message from the most recent run; empty when the test passed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub test_failed_message: String,
}

impl Default for AuditTest {
    fn default() -> Self {
        Self {
            criteria: String::new(),
            column_name: String::new(),
            operator: ThresholdOperator::default(),
            row_count: 0,
            where_clause: String::new(),
            sql_statement_to_check: String::new(),
            test_returned_rows: false,
            fail_if_condition_is_true: false,
            send_report: false,
            instructions: String::new(),
            template_color_scheme: TemplateScheme::default(),
            use_criteria: false,
            test_failed_message: String::new(),
        }
    }
}

impl AuditTest {
    /// Creates a test with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the criteria.
    #[must_use]
    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = criteria.into();
        self
    }

    /// Builder method to set the column name.
    #[must_use]
    pub fn with_column_name(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = column_name.into();
        self
    }

    /// Builder method to set the operator.
    #[must_use]
    pub fn with_operator(mut self, operator: ThresholdOperator) -> Self {
        self.operator = operator;
        self
    }

    /// Builder method to set the row-count threshold.
    #[must_use]
    pub fn with_row_count(mut self, row_count: u64) -> Self {
        self.row_count = row_count;
        self
    }

    /// Builder method to set the stored where-clause.
    #[must_use]
    pub fn with_where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    /// Builder method to set whether rows are expected back.
    #[must_use]
    pub fn with_test_returned_rows(mut self, expect_rows: bool) -> Self {
        self.test_returned_rows = expect_rows;
        self
    }

    /// Builder method to set the fail-if-condition-is-true flag.
    #[must_use]
    pub fn with_fail_if_condition_is_true(mut self, fail: bool) -> Self {
        self.fail_if_condition_is_true = fail;
        self
    }

    /// Builder method to set the report-only flag.
    #[must_use]
    pub fn with_send_report(mut self, send_report: bool) -> Self {
        self.send_report = send_report;
        self
    }

    /// Builder method to set the use-criteria flag.
    #[must_use]
    pub fn with_use_criteria(mut self, use_criteria: bool) -> Self {
        self.use_criteria = use_criteria;
        self
    }

    /// Clears run-state left behind by a previous execution.
    ///
    /// The stored `where_clause` survives — for non-`TODAY` criteria it is
    /// configuration, not cache.
    pub fn reset_run_state(&mut self) {
        self.test_failed_message.clear();
        self.sql_statement_to_check.clear();
    }
}

/// One named, schedulable check against one data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    /// Audit identity, used in notification subjects and progress events
    pub name: String,
    /// Raw connection string, semicolon-delimited `key=value` pairs
    pub connection_string: String,
    /// Provider id resolved through the host-populated registry
    pub provider: String,
    /// Label of the server the query runs on, echoed into notifications
    #[serde(default)]
    pub test_server: String,
    /// Base SQL statement shared by all tests of this audit
    pub sql_statement: String,
    /// Statement kind passed through to the provider
    #[serde(default)]
    pub sql_type: CommandKind,
    /// Optional order-by clause appended when criteria are in use
    #[serde(default)]
    pub order_by_clause: Option<String>,
    /// Ordered tests; index order is execution order
    #[serde(default)]
    pub tests: Vec<AuditTest>,
    /// Notification recipients
    #[serde(default)]
    pub email_subscribers: Vec<String>,
    /// Include the audit name, SQL, and server label in notifications
    #[serde(default = "default_true")]
    pub show_query_message: bool,
    /// Include the threshold failure message in notifications
    #[serde(default = "default_true")]
    pub show_threshold_message: bool,
    /// Render the result table into the notification body
    #[serde(default)]
    pub include_data_in_email: bool,
    /// Custom notification subject; falls back to `Audit Failure - <name>`
    #[serde(default)]
    pub email_subject: Option<String>,
    /// Outcome of the most recent run
    #[serde(default, skip_serializing)]
    pub result: AuditState,
    /// Whether this audit has been executed since it was loaded or reset
    #[serde(default, skip_serializing)]
    pub has_run: bool,
}

fn default_true() -> bool {
    true
}

impl Audit {
    /// Creates an audit with the given identity, connection, provider, and
    /// base statement.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        connection_string: impl Into<String>,
        provider: impl Into<String>,
        sql_statement: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            connection_string: connection_string.into(),
            provider: provider.into(),
            test_server: String::new(),
            sql_statement: sql_statement.into(),
            sql_type: CommandKind::SqlText,
            order_by_clause: None,
            tests: Vec::new(),
            email_subscribers: Vec::new(),
            show_query_message: true,
            show_threshold_message: true,
            include_data_in_email: false,
            email_subject: None,
            result: AuditState::NotRun,
            has_run: false,
        }
    }

    /// Builder method to set the target-server label.
    #[must_use]
    pub fn with_test_server(mut self, test_server: impl Into<String>) -> Self {
        self.test_server = test_server.into();
        self
    }

    /// Builder method to set the order-by clause.
    #[must_use]
    pub fn with_order_by_clause(mut self, order_by: impl Into<String>) -> Self {
        self.order_by_clause = Some(order_by.into());
        self
    }

    /// Builder method to append a test.
    #[must_use]
    pub fn with_test(mut self, test: AuditTest) -> Self {
        self.tests.push(test);
        self
    }

    /// Builder method to append a subscriber address.
    #[must_use]
    pub fn with_subscriber(mut self, address: impl Into<String>) -> Self {
        self.email_subscribers.push(address.into());
        self
    }

    /// Builder method to set the custom notification subject.
    #[must_use]
    pub fn with_email_subject(mut self, subject: impl Into<String>) -> Self {
        self.email_subject = Some(subject.into());
        self
    }

    /// Builder method to set whether result data is rendered into
    /// notifications.
    #[must_use]
    pub fn with_include_data_in_email(mut self, include: bool) -> Self {
        self.include_data_in_email = include;
        self
    }

    /// Resets this audit and all of its tests for a fresh run.
    ///
    /// Run-state reflects only the most recent execution, so every rerun
    /// starts from a clean slate.
    pub fn reset_run_state(&mut self) {
        self.result = AuditState::NotRun;
        self.has_run = false;
        for test in &mut self.tests {
            test.reset_run_state();
        }
    }
}

/// Ordered collection of audits; insertion order is execution order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditCollection {
    audits: Vec<Audit>,
}

impl AuditCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an audit at the end of the execution order.
    pub fn push(&mut self, audit: Audit) {
        self.audits.push(audit);
    }

    /// Number of audits in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.audits.len()
    }

    /// True when the collection holds no audits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.audits.is_empty()
    }

    /// Returns the audit at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Audit> {
        self.audits.get(index)
    }

    /// Returns a mutable reference to the audit at `index`, if any.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Audit> {
        self.audits.get_mut(index)
    }

    /// Finds an audit by name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Audit> {
        self.audits.iter().find(|a| a.name == name)
    }

    /// Finds an audit by name, mutably.
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Audit> {
        self.audits.iter_mut().find(|a| a.name == name)
    }

    /// Iterates audits in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Audit> {
        self.audits.iter()
    }

    /// Iterates audits in execution order, mutably.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Audit> {
        self.audits.iter_mut()
    }
}

impl FromIterator<Audit> for AuditCollection {
    fn from_iter<T: IntoIterator<Item = Audit>>(iter: T) -> Self {
        Self {
            audits: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AuditCollection {
    type Item = &'a Audit;
    type IntoIter = std::slice::Iter<'a, Audit>;

    fn into_iter(self) -> Self::IntoIter {
        self.audits.iter()
    }
}
