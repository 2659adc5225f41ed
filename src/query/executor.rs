//! Builds a `DataFrame` from a credential file and a query.
//!
//! The executor loads the credentials, opens exactly one connection, resolves
//! the query text, executes it and closes the connection again, whatever
//! happened in between.

use crate::config::ConfigLoader;
use crate::db::{DatabaseClient, DatabaseDriver, PostgresDriver};
use crate::error::Result;
use crate::frame::DataFrame;
use crate::path::PathNormalizer;
use crate::query::QuerySource;
use tracing::{debug, info, warn};

/// Runs one query per call against a freshly opened connection.
pub struct QueryExecutor {
    driver: Box<dyn DatabaseDriver>,
    loader: ConfigLoader,
    normalizer: PathNormalizer,
}

impl QueryExecutor {
    /// Creates an executor using `driver` and the default `/mnt/c` path mapping.
    pub fn new(driver: impl DatabaseDriver + 'static) -> Self {
        let normalizer = PathNormalizer::default();
        Self {
            driver: Box::new(driver),
            loader: ConfigLoader::new(normalizer.clone()),
            normalizer,
        }
    }

    /// Uses `normalizer` for both the credential path and the query argument.
    pub fn with_normalizer(mut self, normalizer: PathNormalizer) -> Self {
        self.loader = ConfigLoader::new(normalizer.clone()).with_section(self.loader.section());
        self.normalizer = normalizer;
        self
    }

    /// Reads connection parameters from `section` instead of `[postgresql]`.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.loader = self.loader.with_section(section);
        self
    }

    /// Loads `query` (literal SQL or a path to a SQL file) into a table.
    ///
    /// Configuration problems abort before any connection is attempted. Once a
    /// connection is open it is closed exactly once; a failure to close is
    /// logged and never replaces the outcome of the query.
    pub async fn build(&self, connection_config_path: &str, query: &str) -> Result<DataFrame> {
        let config = self.loader.load(connection_config_path)?;

        debug!("Connecting to {}", config.display_string());
        let client = self.driver.connect(&config).await?;
        info!("Database connection established successfully.");

        let outcome = self.run(client.as_ref(), query).await;

        match client.close().await {
            Ok(()) => info!("Database connection closed successfully."),
            Err(e) => warn!("Failed to close connection: {}", e),
        }

        outcome
    }

    async fn run(&self, client: &dyn DatabaseClient, query: &str) -> Result<DataFrame> {
        let source = QuerySource::resolve(query, &self.normalizer)?;
        info!("SQL query source: {}", source.kind());

        debug!("Creating dataframe ...");
        let result = client.execute_query(source.text()).await?;
        debug!("Query executed in {:?}", result.execution_time);

        let frame = DataFrame::materialize(result);
        info!(
            "Result: {} records and {} column(s) extracted",
            frame.row_count(),
            frame.column_count()
        );

        Ok(frame)
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(PostgresDriver)
    }
}

/// Loads `query` into a table using PostgreSQL and the default path mapping.
pub async fn build_dataframe(connection_config_path: &str, query: &str) -> Result<DataFrame> {
    QueryExecutor::default()
        .build(connection_config_path, query)
        .await
}
