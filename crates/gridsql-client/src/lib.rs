//! # gridsql-client
//!
//! Async client transport for the GridSQL thin protocol.
//!
//! This is the user-facing surface of the transport layer: it negotiates a
//! protocol version with the server (falling back gracefully across the
//! historical revisions), frames every request and response, and dispatches
//! synchronous, streaming, and cancellation traffic over one byte stream.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridsql_client::{connect_tcp, Connection, ConnectionConfig};
//! use gridsql_protocol::Request;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = connect_tcp("127.0.0.1:10800", Duration::from_secs(15)).await?;
//!     let conn = Connection::connect(stream, ConnectionConfig::new().lazy(true)).await?;
//!
//!     let req = Request::execute(None, "SELECT 1", 1024, 0, true);
//!     let resp = conn.send(&req, None).await?;
//!     assert!(resp.is_success());
//!
//!     conn.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Scope
//!
//! One byte stream equals one logical session equals one negotiated version.
//! Connection pooling, TLS, endpoint selection, and result materialization
//! all live above or beside this crate; the connection here is generic over
//! any `AsyncRead + AsyncWrite` transport.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod negotiate;
pub mod state;
pub mod statement;
pub mod transport;

pub use config::ConnectionConfig;
pub use connection::Connection;
pub use error::{Error, Result};
pub use state::ConnectionState;
pub use statement::StatementContext;
pub use transport::connect_tcp;

// The protocol vocabulary callers need to drive a connection.
pub use gridsql_protocol::{
    Capabilities, HandshakeOutcome, ProductVersion, ProtocolVersion, Request, Response,
};
