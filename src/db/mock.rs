//! Mock database driver for testing.
//!
//! Provides an in-memory driver that records every connect, execute and
//! close call, and can be told to fail at any of those steps.

use super::{ColumnInfo, DatabaseClient, DatabaseDriver, QueryResult, Value};
use crate::config::ConnectionConfig;
use crate::error::{FrameError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Leading keywords the mock accepts as SQL; anything else is a syntax error.
const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "VALUES", "TABLE", "SHOW", "EXPLAIN", "INSERT", "UPDATE", "DELETE",
    "CREATE", "DROP", "ALTER", "BEGIN", "COMMIT",
];

/// A step at which the mock should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// `connect` returns a connection error.
    Connect,
    /// `execute_query` rejects the query as a syntax error.
    Syntax,
    /// `execute_query` fails with a generic execution error.
    Execute,
    /// `close` returns an error.
    Close,
}

/// Everything the mock has been asked to do so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    /// Number of connect attempts.
    pub connects: usize,
    /// Database names passed to connect.
    pub databases: Vec<String>,
    /// Query texts passed to execute, in order.
    pub executed: Vec<String>,
    /// Number of close calls.
    pub closes: usize,
}

#[derive(Debug, Default)]
struct MockState {
    calls: MockCalls,
    failures: Vec<MockFailure>,
    result: Option<QueryResult>,
}

/// A mock driver whose clients return predefined results.
///
/// Clones share state, so a test can keep one handle and hand another to the
/// code under test.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Creates a mock that answers SELECTs with a single text cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `result` for every accepted query.
    pub fn with_result(self, result: QueryResult) -> Self {
        self.lock().result = Some(result);
        self
    }

    /// Makes the given step fail.
    pub fn failing(self, failure: MockFailure) -> Self {
        self.lock().failures.push(failure);
        self
    }

    /// Returns a snapshot of the calls recorded so far.
    pub fn calls(&self) -> MockCalls {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded calls from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fails(&self, failure: MockFailure) -> bool {
        self.lock().failures.contains(&failure)
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        {
            let mut state = self.lock();
            state.calls.connects += 1;
            state.calls.databases.push(config.database.clone());
        }

        if self.fails(MockFailure::Connect) {
            return Err(FrameError::connection(format!(
                "Cannot connect to {}:{}. Check that the server is running.",
                config.host_or_default(),
                config.port
            )));
        }

        Ok(Box::new(MockClient {
            driver: self.clone(),
        }))
    }
}

/// A connection handed out by [`MockDriver`].
#[derive(Debug)]
pub struct MockClient {
    driver: MockDriver,
}

#[async_trait]
impl DatabaseClient for MockClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.driver.lock().calls.executed.push(sql.to_string());

        let first_word = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches(';')
            .to_uppercase();

        if self.driver.fails(MockFailure::Syntax) || !SQL_KEYWORDS.contains(&first_word.as_str())
        {
            let token = sql.split_whitespace().next().unwrap_or_default();
            return Err(FrameError::query_syntax(
                format!("ERROR: syntax error at or near \"{token}\""),
                sql,
            ));
        }

        if self.driver.fails(MockFailure::Execute) {
            return Err(FrameError::execution(
                "Failed to create dataframe: ERROR: canceling statement due to statement timeout",
            ));
        }

        if let Some(result) = self.driver.lock().result.clone() {
            return Ok(result);
        }

        if first_word == "SELECT" {
            let columns = vec![ColumnInfo::new("result", "TEXT")];
            let rows = vec![vec![Value::String(format!("Mock result for: {}", sql))]];
            Ok(QueryResult::with_data(columns, rows).with_execution_time(Duration::from_millis(1)))
        } else {
            Ok(QueryResult::new().with_execution_time(Duration::from_millis(1)))
        }
    }

    async fn close(&self) -> Result<()> {
        self.driver.lock().calls.closes += 1;

        if self.driver.fails(MockFailure::Close) {
            return Err(FrameError::connection(
                "Failed to close connection: server closed the connection unexpectedly",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect(driver: &MockDriver) -> Box<dyn DatabaseClient> {
        driver.connect(&ConnectionConfig::new("mockdb")).await.unwrap()
    }

    #[tokio::test]
    async fn test_mock_select() {
        let driver = MockDriver::new();
        let client = connect(&driver).await;
        let result = client.execute_query("SELECT 1").await.unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.column_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_insert() {
        let driver = MockDriver::new();
        let client = connect(&driver).await;
        let result = client
            .execute_query("INSERT INTO test VALUES (1)")
            .await
            .unwrap();
        assert_eq!(result.row_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_rejects_non_sql() {
        let driver = MockDriver::new();
        let client = connect(&driver).await;
        let error = client.execute_query("/no/such/file.sql").await.unwrap_err();
        assert!(matches!(error, FrameError::QuerySyntax { .. }));
        assert!(error.to_string().contains("\"/no/such/file.sql\""));
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let driver = MockDriver::new().failing(MockFailure::Close);
        let client = connect(&driver).await;
        client.execute_query("SELECT 1").await.unwrap();
        assert!(client.close().await.is_err());

        let calls = driver.calls();
        assert_eq!(calls.connects, 1);
        assert_eq!(calls.databases, vec!["mockdb".to_string()]);
        assert_eq!(calls.executed, vec!["SELECT 1".to_string()]);
        assert_eq!(calls.closes, 1);
    }

    #[tokio::test]
    async fn test_mock_connect_failure() {
        let driver = MockDriver::new().failing(MockFailure::Connect);
        let result = driver.connect(&ConnectionConfig::new("mockdb")).await;
        assert!(matches!(result, Err(FrameError::Connection(_))));
        assert_eq!(driver.calls().connects, 1);
    }
}
