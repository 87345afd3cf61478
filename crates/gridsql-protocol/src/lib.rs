//! # gridsql-protocol
//!
//! Pure implementation of the GridSQL thin-client wire protocol.
//!
//! This crate defines the protocol version lattice, the capability matrix
//! derived from a negotiated version, the binary codec primitives used inside
//! message payloads, and the handshake/request/response envelopes.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no networking logic
//! and makes no assumptions about the async runtime. Higher-level crates
//! build upon this foundation to provide framing and connection management.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod capability;
pub mod codec;
pub mod error;
pub mod handshake;
pub mod request;
pub mod response;
pub mod version;

pub use capability::Capabilities;
pub use error::ProtocolError;
pub use handshake::{
    HandshakeOutcome, HandshakeReply, HandshakeRequest, ProductVersion, CLIENT_SQL, HANDSHAKE_MSG_SIZE,
    OP_HANDSHAKE,
};
pub use request::{Request, RequestOp, DYNAMIC_SIZE_MSG_CAP, MAX_BATCH_QUERY_COUNT};
pub use response::{AffinityVersion, Response, ERR_MSG_QUERY_CANCELLED, STATUS_QUERY_CANCELLED, STATUS_SUCCESS};
pub use version::ProtocolVersion;
