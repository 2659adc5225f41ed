//! Query resolution and execution.

mod executor;
mod source;

pub use executor::{build_dataframe, QueryExecutor};
pub use source::QuerySource;
