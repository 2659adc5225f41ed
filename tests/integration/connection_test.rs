//! PostgreSQL connection tests.
//!
//! The live tests read an INI file named by PGFRAME_TEST_INI and skip when it
//! is not set.

use pg_dataframe::config::ConnectionConfig;
use pg_dataframe::db::PostgresDriver;
use pg_dataframe::db::{DatabaseDriver, Value};
use pg_dataframe::{FrameError, QueryExecutor};

/// Helper to get the test credential file from the environment.
fn get_test_ini() -> Option<String> {
    std::env::var("PGFRAME_TEST_INI").ok()
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_refused_port() {
    let mut config = ConnectionConfig::new("testdb");
    config.host = Some("127.0.0.1".to_string());
    config.port = 1;
    config.user = Some("testuser".to_string());
    config.password = Some("testpass".to_string());
    config.connect_timeout = Some(5);

    let result = PostgresDriver.connect(&config).await;
    let Err(error) = result else {
        panic!("Expected connection to 127.0.0.1:1 to fail");
    };

    assert!(matches!(error, FrameError::Connection(_)));
    assert!(error.to_string().contains("127.0.0.1:1"));
}

#[tokio::test]
async fn test_build_select_against_live_database() {
    let Some(ini) = get_test_ini() else {
        eprintln!("Skipping test: PGFRAME_TEST_INI not set");
        return;
    };

    let frame = QueryExecutor::new(PostgresDriver)
        .build(&ini, "SELECT 1 AS x, NULL::text AS empty")
        .await
        .unwrap();

    assert_eq!(frame.shape(), (1, 2));
    assert_eq!(frame.get(0, 0), Some(&Value::Int(1)));
    assert_eq!(frame.get(0, 1), Some(&Value::Null));
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let Some(ini) = get_test_ini() else {
        eprintln!("Skipping test: PGFRAME_TEST_INI not set");
        return;
    };

    let frame = QueryExecutor::new(PostgresDriver)
        .build(&ini, "SELECT 1 AS a, 'x' AS b WHERE false")
        .await
        .unwrap();

    assert_eq!(frame.shape(), (0, 2));
    assert_eq!(frame.column_names(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_syntax_error_against_live_database() {
    let Some(ini) = get_test_ini() else {
        eprintln!("Skipping test: PGFRAME_TEST_INI not set");
        return;
    };

    let error = QueryExecutor::new(PostgresDriver)
        .build(&ini, "SELEC 1")
        .await
        .unwrap_err();

    assert!(matches!(error, FrameError::QuerySyntax { .. }));
    assert!(error.to_string().contains("SELEC 1"));
}
