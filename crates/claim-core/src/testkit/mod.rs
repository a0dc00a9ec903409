//! Test doubles shared by unit tests and downstream integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests in other crates).
//!
//! - [`wallet`]: scripted wallet handles and connectors.
//! - [`backend`]: in-memory [`ClaimBackend`](crate::ClaimBackend) with gates.

pub mod backend;
pub mod wallet;

pub use backend::StubBackend;
pub use wallet::{ScriptedConnector, ScriptedWallet};
