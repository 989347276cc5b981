//! Integration tests against a running server.
//!
//! Start the server with an `[admin]` account configured, then run
//! `cargo test -- --ignored`. The overdue tests also connect to the
//! server's database through the same configuration.

mod api_tests;
mod overdue_tests;
