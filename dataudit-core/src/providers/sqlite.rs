//! SQLite provider.
//!
//! Sessions wrap a single `sqlx` SQLite connection. The descriptor's
//! `Data Source` field is the database file path. Command timeouts are
//! enforced locally since SQLite has no server-side statement timeout.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row};
use tracing::debug;

use super::{AuditCommand, AuditProvider, AuditSession, SessionError};
use crate::connection::ConnectionDescriptor;
use crate::error::AuditError;
use crate::models::ResultTable;
use crate::Result;

/// SQLite implementation of the provider contract.
#[derive(Debug, Default)]
pub struct SqliteAuditProvider;

impl SqliteAuditProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditProvider for SqliteAuditProvider {
    fn engine_name(&self) -> &'static str {
        "SQLite"
    }

    fn provider_id(&self) -> &'static str {
        "sqlite"
    }

    async fn create_session(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn AuditSession>> {
        if descriptor.server().is_empty() {
            return Err(AuditError::configuration(
                "SQLite connection string has no Data Source",
            ));
        }

        let options = SqliteConnectOptions::new()
            .filename(Path::new(descriptor.server()))
            .read_only(true);

        let connect = options.connect();
        let connection = tokio::time::timeout(descriptor.connect_timeout, connect)
            .await
            .map_err(|e| AuditError::connection_failed("SQLite connection timed out", e))?
            .map_err(|e| AuditError::connection_failed("could not open SQLite database", e))?;

        Ok(Box::new(SqliteSession {
            connection: Some(connection),
        }))
    }
}

/// One open SQLite connection, scoped to a single test execution.
struct SqliteSession {
    connection: Option<SqliteConnection>,
}

#[async_trait]
impl AuditSession for SqliteSession {
    async fn fill(
        &mut self,
        command: &AuditCommand,
    ) -> std::result::Result<ResultTable, SessionError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| SessionError::other("session is already closed"))?;

        let fetch = sqlx::query(&command.text).fetch_all(connection);
        let rows = match tokio::time::timeout(command.timeout, fetch).await {
            Ok(result) => result.map_err(classify_error)?,
            Err(_) => {
                return Err(SessionError::timeout(
                    "statement exceeded the configured command timeout",
                ));
            }
        };

        Ok(rows_to_table(&rows))
    }

    async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                debug!("SQLite session close failed: {}", e);
            }
        }
    }
}

/// Maps a sqlx failure onto the engine's session error classification.
fn classify_error(error: sqlx::Error) -> SessionError {
    match error {
        sqlx::Error::PoolTimedOut => {
            SessionError::timeout("connection pool timed out acquiring a connection")
        }
        other => SessionError::other(other.to_string()),
    }
}

/// Collapses fetched rows into the engine-agnostic table shape.
///
/// Column names come from the first row; a statement with no rows yields an
/// empty table.
fn rows_to_table(rows: &[SqliteRow]) -> ResultTable {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut table = ResultTable::new(columns);

    for row in rows {
        let cells = (0..row.columns().len())
            .map(|index| extract_cell(row, index))
            .collect();
        table.push_row(cells);
    }

    table
}

/// Renders a column value to text.
///
/// SQLite is dynamically typed, so types are tried in order of likelihood;
/// NULLs and undecodable values become empty strings.
fn extract_cell(row: &SqliteRow, index: usize) -> String {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(|b| b.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return value
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
    }

    String::new()
}
