//! PostgreSQL provider.
//!
//! Sessions wrap a single `sqlx` Postgres connection built from the
//! descriptor's named fields. The configured command timeout is installed
//! as the connection's `statement_timeout` so the server enforces it; a
//! local timeout backstops statements the server cannot cancel.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, ConnectOptions, Connection, Row};
use tracing::debug;

use super::{AuditCommand, AuditProvider, AuditSession, SessionError};
use crate::connection::ConnectionDescriptor;
use crate::error::AuditError;
use crate::models::ResultTable;
use crate::Result;

/// PostgreSQL implementation of the provider contract.
#[derive(Debug, Default)]
pub struct PostgresAuditProvider;

impl PostgresAuditProvider {
    /// Creates the provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditProvider for PostgresAuditProvider {
    fn engine_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn provider_id(&self) -> &'static str {
        "postgresql"
    }

    async fn create_session(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn AuditSession>> {
        if descriptor.server().is_empty() {
            return Err(AuditError::configuration(
                "PostgreSQL connection string has no server",
            ));
        }

        let mut options = PgConnectOptions::new().host(descriptor.server());

        if !descriptor.port().is_empty() {
            let port: u16 = descriptor.port().parse().map_err(|e| {
                AuditError::connection_failed(
                    format!("invalid PostgreSQL port '{}'", descriptor.port()),
                    e,
                )
            })?;
            options = options.port(port);
        }

        if !descriptor.database().is_empty() {
            options = options.database(descriptor.database());
        }

        if !descriptor.user().is_empty() {
            options = options.username(descriptor.user());
        }

        if !descriptor.password().is_empty() {
            options = options.password(descriptor.password());
        }

        let connect = options.connect();
        let connection = tokio::time::timeout(descriptor.connect_timeout, connect)
            .await
            .map_err(|e| AuditError::connection_failed("PostgreSQL connection timed out", e))?
            .map_err(|e| AuditError::connection_failed("could not open PostgreSQL session", e))?;

        Ok(Box::new(PostgresSession {
            connection: Some(connection),
        }))
    }
}

/// One open PostgreSQL connection, scoped to a single test execution.
struct PostgresSession {
    connection: Option<PgConnection>,
}

#[async_trait]
impl AuditSession for PostgresSession {
    async fn fill(
        &mut self,
        command: &AuditCommand,
    ) -> std::result::Result<ResultTable, SessionError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| SessionError::other("session is already closed"))?;

        let timeout_millis = command.timeout.as_millis();
        let set_timeout = format!("SET statement_timeout = {timeout_millis}");
        sqlx::query(&set_timeout)
            .execute(&mut *connection)
            .await
            .map_err(classify_error)?;

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
                debug!("PostgreSQL session close failed: {}", e);
            }
        }
    }
}

/// Postgres error code raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Maps a sqlx failure onto the engine's session error classification.
fn classify_error(error: sqlx::Error) -> SessionError {
    match &error {
        sqlx::Error::PoolTimedOut => {
            SessionError::timeout("connection pool timed out acquiring a connection")
        }
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some(QUERY_CANCELED) => {
            SessionError::timeout(db_error.to_string())
        }
        _ => SessionError::other(error.to_string()),
    }
}

/// Collapses fetched rows into the engine-agnostic table shape.
fn rows_to_table(rows: &[PgRow]) -> ResultTable {
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
/// Postgres decoding is strictly typed, so the common scalar types are
/// tried in turn; NULLs and undecodable values become empty strings.
fn extract_cell(row: &PgRow, index: usize) -> String {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return value.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<i16>, _>(index) {
        return value.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<f32>, _>(index) {
        return value.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return value.map(|b| b.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index) {
        return value.map(|ts| ts.to_rfc3339()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return value.map(|ts| ts.to_string()).unwrap_or_default();
    }
    if let Ok(value) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return value.map(|d| d.to_string()).unwrap_or_default();
    }

    String::new()
}
