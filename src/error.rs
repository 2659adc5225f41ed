//! Error types for pg-dataframe.
//!
//! Every step of building a table returns one of these kinds, so callers can
//! tell a bad credential file apart from an unreachable server or a query the
//! database rejected.

use std::fmt;
use std::io;
use thiserror::Error;

/// Maximum number of characters of query text carried in a syntax error.
const QUERY_FRAGMENT_LEN: usize = 120;

/// Main error type for pg-dataframe operations.
#[derive(Error, Debug)]
pub enum FrameError {
    /// Credential file missing, unreadable, malformed, or missing the required section/fields.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database session could not be established (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The query argument named an existing file that could not be fully read.
    #[error("Query file error ({kind}): {path}: {message}")]
    QueryFile {
        path: String,
        kind: QueryFileErrorKind,
        message: String,
    },

    /// The database rejected the query text itself.
    #[error("SQL syntax error. Please verify your query:\n{message}\n  QUERY: {query}")]
    QuerySyntax { message: String, query: String },

    /// Any other failure while executing the query.
    #[error("Execution error: {0}")]
    Execution(String),
}

/// Why a query file could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFileErrorKind {
    /// The file disappeared between the existence check and the read.
    NotFound,
    /// The process may not read the file.
    PermissionDenied,
    /// The file is not valid UTF-8.
    InvalidEncoding,
    /// Any other I/O failure.
    Io,
}

impl QueryFileErrorKind {
    /// Classifies an I/O error raised while reading a query file.
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::InvalidData => Self::InvalidEncoding,
            _ => Self::Io,
        }
    }
}

impl fmt::Display for QueryFileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::InvalidEncoding => "invalid encoding",
            Self::Io => "i/o",
        };
        f.write_str(label)
    }
}

impl FrameError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a syntax error carrying a truncated fragment of the offending query.
    pub fn query_syntax(msg: impl Into<String>, query: &str) -> Self {
        Self::QuerySyntax {
            message: msg.into(),
            query: query_fragment(query),
        }
    }

    /// Creates a query file error from the I/O error raised while reading `path`.
    pub fn query_file(path: impl Into<String>, error: &io::Error) -> Self {
        let kind = QueryFileErrorKind::from_io(error);
        let message = match kind {
            QueryFileErrorKind::NotFound => {
                "SQL file not found. Please verify the file path exists.".to_string()
            }
            QueryFileErrorKind::PermissionDenied => "Permission denied to read file".to_string(),
            QueryFileErrorKind::InvalidEncoding => "SQL file is not valid UTF-8".to_string(),
            QueryFileErrorKind::Io => format!("Error reading SQL file: {error}"),
        };
        Self::QueryFile {
            path: path.into(),
            kind,
            message,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::QueryFile { .. } => "Query File Error",
            Self::QuerySyntax { .. } => "Query Syntax Error",
            Self::Execution(_) => "Execution Error",
        }
    }
}

/// Collapses whitespace and truncates query text for error messages.
fn query_fragment(query: &str) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= QUERY_FRAGMENT_LEN {
        collapsed
    } else {
        let mut fragment: String = collapsed.chars().take(QUERY_FRAGMENT_LEN).collect();
        fragment.push_str("...");
        fragment
    }
}

/// Result type alias using FrameError.
pub type Result<T> = std::result::Result<T, FrameError>;
