//! Database abstraction layer for pg-dataframe.
//!
//! A [`DatabaseDriver`] opens connections; each open connection is a
//! [`DatabaseClient`] that executes queries and is closed exactly once by
//! its owner.

mod mock;
mod postgres;
mod types;

pub use mock::{MockCalls, MockClient, MockDriver, MockFailure};
pub use postgres::{connect_options, PostgresClient, PostgresDriver};
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Opens database connections from a validated configuration.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Opens a new, unshared connection.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}

/// A single open database connection.
///
/// All database operations are async and return Results with FrameError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
