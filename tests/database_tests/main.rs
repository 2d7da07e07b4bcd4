//! Database integration tests
//!
//! Run with `cargo test --test database_tests`.
//! The full million-row load runs with `cargo test --test database_tests -- --ignored`.
