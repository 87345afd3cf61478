//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding protocol payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload ended before a complete value could be read.
    #[error("payload truncated: expected {expected} more bytes, {available} available")]
    Truncated {
        /// Bytes required by the value being decoded.
        expected: usize,
        /// Bytes actually remaining in the payload.
        available: usize,
    },

    /// A string field did not contain valid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// A length prefix was negative (and not the null marker).
    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    /// An unknown request opcode was encountered.
    #[error("unknown request opcode: {0:#04x}")]
    InvalidRequestOp(u8),

    /// A tri-state byte held a value outside `{0, 1, 2}`.
    #[error("invalid tri-state byte: {0:#04x}")]
    InvalidTriState(u8),
}
