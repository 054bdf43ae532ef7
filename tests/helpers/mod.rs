//! Shared test helpers for integration tests.
//!
//! Note: We use `helpers/mod.rs` instead of the modern `helpers.rs` + `helpers/` pattern
//! because Cargo auto-discovers top-level `.rs` files in `tests/` as integration tests.
//! A `tests/helpers.rs` file would be compiled as a standalone test, which we don't want.

#[cfg(unix)]
pub mod fake_java;
pub mod http_server;
