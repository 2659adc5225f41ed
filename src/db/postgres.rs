//! PostgreSQL database client implementation.
//!
//! Provides `PostgresDriver`, which opens one unpooled `sqlx::PgConnection`
//! per call, and `PostgresClient`, which implements `DatabaseClient` on top
//! of it.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, DatabaseDriver, QueryResult, Row, Value};
use crate::error::{FrameError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgColumn, PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{Column as SqlxColumn, Connection, Either, Executor, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Opens PostgreSQL connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        let client = PostgresClient::connect(config).await?;
        Ok(Box::new(client))
    }
}

/// PostgreSQL database client owning a single connection.
pub struct PostgresClient {
    conn: Mutex<Option<PgConnection>>,
}

impl PostgresClient {
    /// Opens a connection. There are no retries: a failed attempt is a failed call.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = connect_options(config)?;
        debug!("Connecting to {}", config.display_string());

        let attempt = PgConnection::connect_with(&options);
        let result = match config.connect_timeout {
            // libpq treats 0 as "wait forever"
            Some(secs) if secs > 0 => tokio::time::timeout(Duration::from_secs(secs), attempt)
                .await
                .map_err(|_| {
                    FrameError::connection(format!(
                        "Connection to {}:{} timed out after {secs} seconds",
                        config.host_or_default(),
                        config.port
                    ))
                })?,
            _ => attempt.await,
        };

        let conn = result.map_err(|e| map_connection_error(e, config))?;
        debug!("Successfully connected to database");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| FrameError::execution("Connection is already closed"))?;

        let start = Instant::now();
        let rows = fetch_last_statement(conn, sql)
            .await
            .map_err(|e| map_query_error(e, sql))?;
        let execution_time = start.elapsed();

        // Empty result - ask the server to describe the statement instead
        let columns = match rows.first() {
            Some(first_row) => column_info(first_row.columns()),
            None => match (&mut *conn).describe(sql).await {
                Ok(describe) => column_info(describe.columns()),
                Err(e) => {
                    debug!("Could not describe empty result: {}", e);
                    Vec::new()
                }
            },
        };

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
        })
    }

    async fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .await
            .take()
            .ok_or_else(|| FrameError::execution("Connection is already closed"))?;

        conn.close()
            .await
            .map_err(|e| FrameError::connection(format!("Failed to close connection: {e}")))
    }
}

/// Runs `sql` over the simple query protocol and keeps the rows of its last statement.
///
/// The simple protocol accepts scripts with several statements, and returns
/// every value in text form so any column type can be read back as a string.
async fn fetch_last_statement(
    conn: &mut PgConnection,
    sql: &str,
) -> std::result::Result<Vec<PgRow>, sqlx::Error> {
    let mut stream = (&mut *conn).fetch_many(sql);
    let mut last = Vec::new();
    let mut current = Vec::new();

    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(_done) => last = std::mem::take(&mut current),
            Either::Right(row) => current.push(row),
        }
    }

    if !current.is_empty() {
        last = current;
    }
    Ok(last)
}

/// Builds sqlx connect options from a validated config.
pub fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new()
        .host(config.host_or_default())
        .port(config.port)
        .database(&config.database);

    if let Some(user) = &config.user {
        options = options.username(user);
    }
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    if let Some(mode) = &config.sslmode {
        let mode = mode
            .parse::<PgSslMode>()
            .map_err(|e| FrameError::config(format!("Invalid sslmode '{mode}': {e}")))?;
        options = options.ssl_mode(mode);
    }
    if let Some(name) = &config.application_name {
        options = options.application_name(name);
    }
    if let Some(cert) = &config.sslrootcert {
        options = options.ssl_root_cert(cert);
    }
    if let Some(cert) = &config.sslcert {
        options = options.ssl_client_cert(cert);
    }
    if let Some(key) = &config.sslkey {
        options = options.ssl_client_key(key);
    }
    if !config.extras.is_empty() {
        options = options.options(
            config
                .extras
                .iter()
                .map(|(name, value)| (name, escape_option_value(value))),
        );
    }

    Ok(options)
}

/// Backslash-escapes spaces so the server reads a value as one `-c` argument.
fn escape_option_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn column_info(columns: &[PgColumn]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<Option<bool>, _>(index).map(Value::from),
        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| Value::from(v.map(i64::from))),
        "INT4" | "INT" | "INTEGER" => row.try_get::<Option<i32>, _>(index).map(Value::from),
        "INT8" | "BIGINT" => row.try_get::<Option<i64>, _>(index).map(Value::from),
        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| Value::from(v.map(f64::from))),
        "FLOAT8" | "DOUBLE PRECISION" => row.try_get::<Option<f64>, _>(index).map(Value::from),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index).map(Value::from),
        // Text protocol: numeric, dates, uuids, json etc. all arrive as text
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .map(Value::from),
    };

    value.unwrap_or_default()
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> FrameError {
    let host = config.host_or_default();
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = &config.database;

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        FrameError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running: {error}"
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        FrameError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials: {error}"
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        FrameError::connection(format!("Database '{database}' does not exist: {error}"))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        FrameError::connection(format!(
            "TLS negotiation with {host}:{port} failed. Check the sslmode setting: {error}"
        ))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        FrameError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        FrameError::connection(format!(
            "Failed to connect to {host}:{port}. Check your connection settings: {error}"
        ))
    }
}

/// Splits query failures into syntax/semantic rejections (SQLSTATE class 42) and the rest.
fn map_query_error(error: sqlx::Error, sql: &str) -> FrameError {
    let message = format_query_error(&error);
    let is_rejection = error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .is_some_and(|code| code.starts_with("42"));

    if is_rejection {
        FrameError::query_syntax(message, sql)
    } else {
        FrameError::execution(format!("Failed to create dataframe: {message}"))
    }
}

/// Formats a query error with hints if available.
fn format_query_error(error: &sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(sqlx::postgres::PgErrorPosition::Original(position)) = pg_error.position() {
            result.push_str(&format!("\n  POSITION: {position}"));
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
