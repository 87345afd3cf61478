//! Client error types.

use gridsql_codec::CodecError;
use gridsql_protocol::{ProtocolError, ProtocolVersion};
use thiserror::Error;

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while establishing or driving a connection.
///
/// Transport and handshake failures abort connection establishment entirely;
/// no partial connection is ever returned. Once a connection is ready, a
/// failure on one request surfaces to that caller only; nothing is retried
/// internally.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error on the underlying byte stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error; fatal to the connection.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Malformed payload; fatal to the connection.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server refused every version the client was willing to fall back
    /// to, or advertised a version the client does not recognize.
    #[error("handshake failed [clientVersion={client}, serverVersion={server}]: {message}")]
    HandshakeRejected {
        /// Version the client started negotiation with.
        client: ProtocolVersion,
        /// Version the server advertised in its rejection.
        server: ProtocolVersion,
        /// Server-supplied error text.
        message: String,
    },

    /// Credentials were supplied but the server predates authentication
    /// support. Distinct from a generic rejection so callers can give an
    /// actionable message.
    #[error(
        "authentication not supported by server [clientVersion={client}, serverVersion={server}]: {message}"
    )]
    AuthenticationUnsupported {
        /// Version the client started negotiation with.
        client: ProtocolVersion,
        /// Version the server advertised in its rejection.
        server: ProtocolVersion,
        /// Server-supplied error text.
        message: String,
    },

    /// A feature was requested that the negotiated version does not carry.
    /// Fatal to that call only; the connection remains usable.
    #[error("{feature} not supported by server [negotiatedVersion={negotiated}]")]
    CapabilityUnsupported {
        /// Human-readable feature name.
        feature: &'static str,
        /// The version this connection negotiated.
        negotiated: ProtocolVersion,
    },

    /// Operation attempted on a closed connection.
    #[error("connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Whether this error arose during the handshake phase.
    #[must_use]
    pub fn is_handshake_failure(&self) -> bool {
        matches!(
            self,
            Self::HandshakeRejected { .. } | Self::AuthenticationUnsupported { .. }
        )
    }

    /// Whether the connection is still usable after this error.
    ///
    /// Only capability errors are local to a single call; everything else
    /// poisons the stream.
    #[must_use]
    pub fn connection_usable(&self) -> bool {
        matches!(self, Self::CapabilityUnsupported { .. })
    }
}
