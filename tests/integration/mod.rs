//! Integration tests for pg-dataframe.
//!
//! The mock-driver tests always run. Tests against a real server need
//! PGFRAME_TEST_INI pointing at a credential file.

pub mod build_test;
pub mod connection_test;
