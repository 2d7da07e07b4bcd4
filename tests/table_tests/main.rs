//! Table integration tests
//!
//! Run with `cargo test --test table_tests`.

mod query_tests;
