//! Codec error types.

use thiserror::Error;

/// Errors raised by the framing layer.
///
/// Every variant is fatal to the connection it occurred on: a half-read
/// frame cannot be recovered or resumed.
#[derive(Debug, Error)]
pub enum CodecError {
    /// IO error on the underlying byte stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame claimed a length beyond the configured maximum.
    #[error("frame of {size} bytes exceeds maximum of {max}")]
    FrameTooLarge {
        /// Claimed frame size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The stream ended in the middle of a frame.
    #[error("stream ended mid-frame with {buffered} bytes buffered")]
    TruncatedFrame {
        /// Bytes that had been buffered when the stream ended.
        buffered: usize,
    },

    /// The stream ended where a frame was expected.
    #[error("stream closed before a complete frame arrived")]
    UnexpectedEof,
}
