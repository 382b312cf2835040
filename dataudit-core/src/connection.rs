//! Provider-agnostic connection descriptors.
//!
//! A [`ConnectionDescriptor`] is a normalized view over a raw
//! semicolon-delimited connection string. Recognized keys are mapped through
//! a fixed alias table into named fields; everything else is preserved
//! verbatim in an extras bag so a round-trip through
//! [`ConnectionDescriptor::to_connection_string`] loses nothing. Round-trip
//! is only defined within a single provider id — rebuilding a Hive string
//! from a SQL-Server descriptor is not supported.

use std::time::Duration;

/// Default connection timeout when the caller does not override it.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default command timeout when the caller does not override it.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(180);

/// Normalized, provider-agnostic view of a connection string.
///
/// Immutable after construction except for the two timeout fields, which the
/// host may tune before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Provider id this descriptor serializes for
    provider_id: String,
    /// Server / host / data source
    server: String,
    /// Database, catalog, or schema name
    database: String,
    /// User name, if any
    user: String,
    /// Password, if any
    password: String,
    /// Listening port, kept as text exactly as supplied
    port: String,
    /// Target table, for engines that carry one in the connection string
    target_table: String,
    /// ODBC-style driver name
    driver: String,
    /// Unrecognized pairs, re-joined as `key=value;` in encounter order
    extra_settings: String,
    /// Connection timeout handed to the provider
    pub connect_timeout: Duration,
    /// Command timeout handed to the provider
    pub command_timeout: Duration,
}

impl ConnectionDescriptor {
    /// Parses a raw connection string for the given provider id.
    ///
    /// Splits on `;` then on the first `=` of each pair. Keys are
    /// case-insensitive and run through the alias table (`data source` /
    /// `server` / `host`, `initial catalog` / `database` / `schema`,
    /// `user id` / `uid`, `password` / `pwd`, `port`, `defaulttable`,
    /// `driver`). Unrecognized non-empty keys land in the extras bag;
    /// malformed or empty fragments are ignored. Parsing never fails.
    #[must_use]
    pub fn new(raw: &str, provider_id: impl Into<String>) -> Self {
        let mut descriptor = Self {
            provider_id: provider_id.into(),
            server: String::new(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            port: String::new(),
            target_table: String::new(),
            driver: String::new(),
            extra_settings: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        };

        for item in raw.split(';') {
            let (key, value) = match item.split_once('=') {
                Some((key, value)) => (key, value),
                None => (item, ""),
            };

            match key.to_lowercase().as_str() {
                "data source" | "server" | "host" => descriptor.server = value.to_string(),
                "initial catalog" | "database" | "schema" => {
                    descriptor.database = value.to_string();
                }
                "user id" | "uid" => descriptor.user = value.to_string(),
                "password" | "pwd" => descriptor.password = value.to_string(),
                "port" => descriptor.port = value.to_string(),
                "defaulttable" => descriptor.target_table = value.to_string(),
                "driver" => descriptor.driver = value.to_string(),
                "" => {}
                _ => {
                    descriptor.extra_settings.push_str(key);
                    descriptor.extra_settings.push('=');
                    descriptor.extra_settings.push_str(value);
                    descriptor.extra_settings.push(';');
                }
            }
        }

        descriptor
    }

    /// The provider id this descriptor was built for.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Server / host / data source.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Database, catalog, or schema name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// User name, if any.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Password, if any.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Listening port, as supplied.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Target table for engines that require one.
    #[must_use]
    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    /// ODBC-style driver name.
    #[must_use]
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Unrecognized pairs, re-joined as `key=value;` in encounter order.
    #[must_use]
    pub fn extra_settings(&self) -> &str {
        &self.extra_settings
    }

    /// Builder method to override the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to override the command timeout.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Re-serializes the descriptor into the dialect required by its
    /// provider id.
    ///
    /// Unrecognized provider ids produce an empty string — the registry is
    /// the authority on which providers exist, not this type.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self.provider_id.as_str() {
            "sqlserver" | "mssql" => self.build_sqlserver(),
            "mysql" => self.build_mysql(),
            "sqlite" => self.build_sqlite(),
            "postgresql" | "postgres" => self.build_postgres(),
            "hive" => self.build_hive(),
            _ => String::new(),
        }
    }

    fn build_sqlserver(&self) -> String {
        format!(
            "Data Source={};Initial Catalog={};User ID={};Password={};",
            self.server, self.database, self.user, self.password
        )
    }

    fn build_mysql(&self) -> String {
        let mut retval = format!(
            "Server={};Database={};Uid={};Pwd={}",
            self.server, self.database, self.user, self.password
        );

        if !self.port.is_empty() {
            retval.push_str(";Port=");
            retval.push_str(&self.port);
        }

        retval
    }

    fn build_sqlite(&self) -> String {
        let mut retval = format!("Data Source={}", self.server);

        if !self.extra_settings.is_empty() {
            retval.push_str(&self.extra_settings);
        }

        retval
    }

    fn build_postgres(&self) -> String {
        let mut retval = format!(
            "Server={};Database={};User ID={};Password={}",
            self.server, self.database, self.user, self.password
        );

        if !self.port.is_empty() {
            retval.push_str(";Port=");
            retval.push_str(&self.port);
        }

        retval
    }

    fn build_hive(&self) -> String {
        let dsn_only = self.driver.is_empty()
            && self.server.is_empty()
            && self.port.is_empty()
            && self.database.is_empty()
            && self.target_table.is_empty()
            && !self.extra_settings.is_empty();

        if dsn_only {
            // A DSN-only descriptor: the extras string IS the connection
            // string, with no field labels added.
            self.extra_settings.clone()
        } else {
            format!(
                "DRIVER={};Host={};Port={};Schema={};DefaultTable={};{}",
                self.driver, self.server, self.port, self.database, self.target_table,
                self.extra_settings
            )
        }
    }
}

impl std::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionDescriptor({}{}{})",
            self.server,
            if self.port.is_empty() {
                String::new()
            } else {
                format!(":{}", self.port)
            },
            if self.database.is_empty() {
                String::new()
            } else {
                format!("/{}", self.database)
            }
        )
        // Intentionally omit user and never include the password
    }
}
