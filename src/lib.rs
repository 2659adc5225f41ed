//! pg-dataframe - load PostgreSQL query results into an in-memory table.
//!
//! Given an INI credential file and either literal SQL or a path to a SQL
//! file, [`build_dataframe`] opens one connection, runs the query, closes the
//! connection and returns a [`DataFrame`]. Windows-style paths such as
//! `C:\sql\report.sql` are accepted and mapped to `/mnt/c/sql/report.sql`.

pub mod config;
pub mod db;
pub mod error;
pub mod frame;
pub mod logging;
pub mod path;
pub mod query;

pub use error::{FrameError, QueryFileErrorKind, Result};
pub use frame::DataFrame;
pub use path::{normalize, DriveMapping, PathNormalizer};
pub use query::{build_dataframe, QueryExecutor, QuerySource};
