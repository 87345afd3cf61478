//! # gridsql-testing
//!
//! Test infrastructure for GridSQL driver development.
//!
//! Provides a scriptable mock server speaking the real thin-client wire
//! format, so negotiation and dispatch behavior can be tested without a
//! cluster. This crate is dev-only and never published.
//!
//! The integration tests that need both the client and the mock server live
//! in this crate's `tests/` directory, keeping the dependency graph free of
//! dev-dependency cycles.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod mock_server;

pub use mock_server::{HandshakePolicy, MockGridServer, MockServerError};
