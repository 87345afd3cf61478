//! Response envelope.
//!
//! Every synchronous request is answered by one response frame: an `i32`
//! status, an optional affinity topology version (2.8.0+), then either the
//! operation payload (success) or an error string. The payload itself is
//! opaque to the transport; result decoding belongs to the layers above.

use bytes::{Buf, BufMut, Bytes};

use crate::codec;
use crate::error::ProtocolError;
use crate::version::ProtocolVersion;

/// Status of a successful operation.
pub const STATUS_SUCCESS: i32 = 0;

/// Status reported when a query was cancelled.
pub const STATUS_QUERY_CANCELLED: i32 = 3013;

/// Error text accompanying [`STATUS_QUERY_CANCELLED`].
pub const ERR_MSG_QUERY_CANCELLED: &str = "The query was cancelled while executing.";

/// Cluster affinity topology version, reported from 2.8.0 on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinityVersion {
    /// Major topology counter.
    pub topology: i64,
    /// Minor topology counter.
    pub minor: i32,
}

/// A server response, or a synthetic one produced by the dispatcher.
#[derive(Debug, Clone)]
pub struct Response {
    status: i32,
    error: Option<String>,
    affinity: Option<AffinityVersion>,
    payload: Bytes,
}

impl Response {
    /// Synthetic empty success response (cancelled close requests).
    #[must_use]
    pub fn empty() -> Self {
        Self::success(Bytes::new())
    }

    /// Success response carrying an opaque payload.
    #[must_use]
    pub fn success(payload: Bytes) -> Self {
        Self {
            status: STATUS_SUCCESS,
            error: None,
            affinity: None,
            payload,
        }
    }

    /// Error response with a status code and message.
    #[must_use]
    pub fn with_error(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(message.into()),
            affinity: None,
            payload: Bytes::new(),
        }
    }

    /// Synthetic response reported to a caller whose statement was cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::with_error(STATUS_QUERY_CANCELLED, ERR_MSG_QUERY_CANCELLED)
    }

    /// Decode a response frame against the negotiated `version`.
    pub fn decode(src: &mut impl Buf, version: ProtocolVersion) -> Result<Self, ProtocolError> {
        let status = codec::read_i32(src)?;

        let affinity = if version.at_least(ProtocolVersion::V2_8_0) && codec::read_bool(src)? {
            Some(AffinityVersion {
                topology: codec::read_i64(src)?,
                minor: codec::read_i32(src)?,
            })
        } else {
            None
        };

        if status == STATUS_SUCCESS {
            let payload = src.copy_to_bytes(src.remaining());
            Ok(Self {
                status,
                error: None,
                affinity,
                payload,
            })
        } else {
            let error = codec::read_string(src)?;
            Ok(Self {
                status,
                error,
                affinity,
                payload: Bytes::new(),
            })
        }
    }

    /// Encode this response for the negotiated `version`.
    ///
    /// The inverse of [`Response::decode`]; exists for test servers.
    pub fn encode(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        codec::write_i32(dst, self.status);

        if version.at_least(ProtocolVersion::V2_8_0) {
            match self.affinity {
                Some(aff) => {
                    codec::write_bool(dst, true);
                    codec::write_i64(dst, aff.topology);
                    codec::write_i32(dst, aff.minor);
                }
                None => codec::write_bool(dst, false),
            }
        }

        if self.status == STATUS_SUCCESS {
            dst.put_slice(&self.payload);
        } else {
            codec::write_string(dst, self.error.as_deref());
        }
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Error text, if the operation failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Affinity topology version, when the server reported one.
    #[must_use]
    pub fn affinity(&self) -> Option<AffinityVersion> {
        self.affinity
    }

    /// Opaque operation payload (empty unless the operation succeeded).
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Whether this is the cancelled outcome.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == STATUS_QUERY_CANCELLED
    }
}
