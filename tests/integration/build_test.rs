//! End-to-end build tests against the mock driver.
//!
//! Covers the literal-vs-file decision, config loading order and the
//! connection lifecycle.

use pg_dataframe::db::{ColumnInfo, MockDriver, MockFailure, QueryResult, Value};
use pg_dataframe::{FrameError, PathNormalizer, QueryExecutor};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const VALID_INI: &str = "\
[postgresql]
host = localhost
port = 5432
database = sales
user = analyst
password = s3cret
";

/// Writes `content` to `name` inside `dir` and returns the path as a string.
fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn single_cell() -> QueryResult {
    QueryResult::with_data(vec![ColumnInfo::new("x", "INT4")], vec![vec![Value::Int(1)]])
}

#[tokio::test]
async fn test_literal_query_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "db.ini", VALID_INI);
    let driver = MockDriver::new().with_result(single_cell());

    let frame = QueryExecutor::new(driver.clone())
        .build(&config, "SELECT 1 AS x")
        .await
        .unwrap();

    assert_eq!(frame.row_count(), 1);
    assert_eq!(frame.column_count(), 1);
    assert_eq!(frame.column_names(), vec!["x"]);
    assert_eq!(driver.calls().executed, vec!["SELECT 1 AS x".to_string()]);
}

#[tokio::test]
async fn test_file_query_executes_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "db.ini", VALID_INI);
    let query = write_file(&dir, "report.sql", "SELECT 1;");
    let driver = MockDriver::new().with_result(single_cell());

    QueryExecutor::new(driver.clone())
        .build(&config, &query)
        .await
        .unwrap();

    assert_eq!(driver.calls().executed, vec!["SELECT 1;".to_string()]);
}

#[tokio::test]
async fn test_windows_paths_for_config_and_query() {
    // Lay out <tmp>/c/creds/db.ini and <tmp>/c/sql/q.sql, then refer to them as C:\...
    let dir = tempfile::tempdir().unwrap();
    let drive = dir.path().join("c");
    std::fs::create_dir_all(drive.join("creds")).unwrap();
    std::fs::create_dir_all(drive.join("sql")).unwrap();
    std::fs::write(drive.join("creds").join("db.ini"), VALID_INI).unwrap();
    std::fs::write(drive.join("sql").join("q.sql"), "SELECT 42 AS answer").unwrap();

    let driver = MockDriver::new();
    let normalizer = PathNormalizer::new().with_mount_root(dir.path().to_str().unwrap());

    let frame = QueryExecutor::new(driver.clone())
        .with_normalizer(normalizer)
        .build(r"C:\creds\db.ini", r"C:\sql\q.sql")
        .await
        .unwrap();

    let calls = driver.calls();
    assert_eq!(calls.databases, vec!["sales".to_string()]);
    assert_eq!(calls.executed, vec!["SELECT 42 AS answer".to_string()]);
    assert_eq!(frame.shape(), (1, 1));
}

#[tokio::test]
async fn test_missing_config_file_is_config_error() {
    let driver = MockDriver::new();

    let error = QueryExecutor::new(driver.clone())
        .build("/no/such/creds/db.ini", "SELECT 1")
        .await
        .unwrap_err();

    assert!(matches!(error, FrameError::Config(_)));
    assert!(error.to_string().contains("/no/such/creds/db.ini"));
    assert_eq!(driver.calls().connects, 0);
}

#[tokio::test]
async fn test_missing_section_fails_before_connect() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "db.ini", "[mysql]\nhost = localhost\n");
    let driver = MockDriver::new();

    let error = QueryExecutor::new(driver.clone())
        .build(&config, "SELECT 1")
        .await
        .unwrap_err();

    assert!(matches!(error, FrameError::Config(_)));
    assert_eq!(
        error.to_string(),
        format!("Configuration error: Section postgresql not found in the {config} file")
    );
    assert_eq!(driver.calls().connects, 0);
}

#[tokio::test]
async fn test_invalid_credentials_fail_before_connect() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        format!("{VALID_INI}\n[postgresql]\nhost = replica\n"),
        format!("{VALID_INI}target_session_attrs = read-write\n"),
        format!("{VALID_INI}options = search_path=sales\n"),
    ];

    for (i, content) in cases.iter().enumerate() {
        let config = write_file(&dir, &format!("db{i}.ini"), content);
        let driver = MockDriver::new();

        let error = QueryExecutor::new(driver.clone())
            .build(&config, "SELECT 1")
            .await
            .unwrap_err();

        assert!(matches!(error, FrameError::Config(_)), "{content}");
        assert_eq!(driver.calls().connects, 0);
    }
}

#[tokio::test]
async fn test_nonexistent_query_path_runs_as_literal() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "db.ini", VALID_INI);
    let missing = dir.path().join("missing.sql");
    let missing = missing.to_str().unwrap();
    let driver = MockDriver::new();

    let error = QueryExecutor::new(driver.clone())
        .build(&config, missing)
        .await
        .unwrap_err();

    assert!(matches!(error, FrameError::QuerySyntax { .. }));
    let calls = driver.calls();
    assert_eq!(calls.executed, vec![missing.to_string()]);
    assert_eq!(calls.closes, 1);
}

#[tokio::test]
async fn test_every_open_connection_is_closed_once() {
    for failure in [None, Some(MockFailure::Syntax), Some(MockFailure::Execute)] {
        let dir = tempfile::tempdir().unwrap();
        let config = write_file(&dir, "db.ini", VALID_INI);
        let driver = match failure {
            Some(f) => MockDriver::new().failing(f),
            None => MockDriver::new(),
        };

        let _ = QueryExecutor::new(driver.clone())
            .build(&config, "SELECT 1")
            .await;

        let calls = driver.calls();
        assert_eq!((calls.connects, calls.closes), (1, 1), "failure: {failure:?}");
    }
}

#[tokio::test]
async fn test_query_file_read_error_still_closes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "db.ini", VALID_INI);
    let path = dir.path().join("binary.sql");
    std::fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();
    let driver = MockDriver::new();

    let error = QueryExecutor::new(driver.clone())
        .build(&config, path.to_str().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(error, FrameError::QueryFile { .. }));
    let calls = driver.calls();
    assert!(calls.executed.is_empty());
    assert_eq!(calls.closes, 1);
}

#[tokio::test]
async fn test_close_failure_does_not_change_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "db.ini", VALID_INI);
    let clean = MockDriver::new().with_result(single_cell());
    let flaky = MockDriver::new()
        .with_result(single_cell())
        .failing(MockFailure::Close);

    let expected = QueryExecutor::new(clean)
        .build(&config, "SELECT 1 AS x")
        .await
        .unwrap();
    let actual = QueryExecutor::new(flaky.clone())
        .build(&config, "SELECT 1 AS x")
        .await
        .unwrap();

    assert_eq!(actual, expected);
    assert_eq!(flaky.calls().closes, 1);
}

#[tokio::test]
async fn test_missing_database_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(&dir, "db.ini", "[postgresql]\nhost = localhost\n");
    let driver = MockDriver::new();

    // PGDATABASE would otherwise fill the gap
    if std::env::var("PGDATABASE").is_ok() {
        eprintln!("Skipping test: PGDATABASE is set");
        return;
    }

    let error = QueryExecutor::new(driver.clone())
        .build(&config, "SELECT 1")
        .await
        .unwrap_err();

    assert!(matches!(error, FrameError::Config(_)));
    assert_eq!(driver.calls().connects, 0);
}
