//! Request envelopes.
//!
//! Requests are a closed sum over the operations the thin protocol knows;
//! each variant carries its own capacity hint and serialization behavior,
//! selected by pattern match. Every request gets an id from a process-wide
//! counter; the id is application-level correlation state only, never
//! interpreted by the framer.

use std::sync::atomic::{AtomicI64, Ordering};

use bytes::BufMut;

use crate::codec;
use crate::error::ProtocolError;
use crate::version::ProtocolVersion;

/// Default encode-buffer capacity for requests of unpredictable size.
pub const DYNAMIC_SIZE_MSG_CAP: usize = 256;

/// Batch-size cap used by the capacity estimate.
pub const MAX_BATCH_QUERY_COUNT: usize = 32;

/// Encode-buffer capacity for a fetch request.
const QUERY_FETCH_MSG_SIZE: usize = 13;

/// Encode-buffer capacity for a metadata request.
const QUERY_META_MSG_SIZE: usize = 9;

/// Encode-buffer capacity for a close request.
const QUERY_CLOSE_MSG_SIZE: usize = 9;

static REQ_ID: AtomicI64 = AtomicI64::new(0);

fn next_request_id() -> i64 {
    REQ_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// Request opcode tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestOp {
    /// Execute a single statement.
    Execute = 2,
    /// Fetch the next page of an open cursor.
    Fetch = 3,
    /// Close an open cursor.
    Close = 4,
    /// Fetch result-set metadata for an open cursor.
    Metadata = 5,
    /// Execute a statement batch.
    Batch = 6,
    /// Execute an ordered batch on the streaming path.
    OrderedBatch = 7,
    /// Cancel an in-flight request.
    Cancel = 8,
}

impl RequestOp {
    /// Create a request opcode from a raw byte value.
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        match value {
            2 => Ok(Self::Execute),
            3 => Ok(Self::Fetch),
            4 => Ok(Self::Close),
            5 => Ok(Self::Metadata),
            6 => Ok(Self::Batch),
            7 => Ok(Self::OrderedBatch),
            8 => Ok(Self::Cancel),
            other => Err(ProtocolError::InvalidRequestOp(other)),
        }
    }
}

/// A client request.
#[derive(Debug, Clone)]
pub enum Request {
    /// Execute a single statement.
    Execute {
        /// Request id.
        id: i64,
        /// Schema to resolve unqualified names against.
        schema: Option<String>,
        /// Cursor page size.
        page_size: i32,
        /// Row limit, `0` for unlimited.
        max_rows: i32,
        /// Statement text.
        sql: String,
        /// Commit implicitly after execution (carried from 2.7.0 on).
        auto_commit: bool,
    },
    /// Fetch the next page of an open cursor.
    Fetch {
        /// Request id.
        id: i64,
        /// Server-side cursor id.
        cursor_id: i64,
        /// Page size for this fetch.
        page_size: i32,
    },
    /// Fetch result-set metadata for an open cursor.
    Metadata {
        /// Request id.
        id: i64,
        /// Server-side cursor id.
        cursor_id: i64,
    },
    /// Close an open cursor.
    Close {
        /// Request id.
        id: i64,
        /// Server-side cursor id.
        cursor_id: i64,
    },
    /// Execute a statement batch.
    Batch {
        /// Request id.
        id: i64,
        /// Schema to resolve unqualified names against.
        schema: Option<String>,
        /// Batched statement texts.
        queries: Vec<String>,
        /// Commit implicitly after the batch.
        auto_commit: bool,
        /// Whether this is the final batch of the logical statement.
        last_batch: bool,
    },
    /// Execute an ordered batch on the fire-and-forget streaming path.
    ///
    /// Responses are correlated out of band through `order`.
    OrderedBatch {
        /// Request id.
        id: i64,
        /// Schema to resolve unqualified names against.
        schema: Option<String>,
        /// Batched statement texts.
        queries: Vec<String>,
        /// Commit implicitly after the batch.
        auto_commit: bool,
        /// Whether this is the final batch of the logical statement.
        last_batch: bool,
        /// Ordering sequence number for out-of-band correlation.
        order: i64,
    },
    /// Cancel an in-flight request.
    Cancel {
        /// Request id.
        id: i64,
        /// Id of the request to cancel.
        target_id: i64,
    },
}

impl Request {
    /// Create an execute request.
    #[must_use]
    pub fn execute(
        schema: Option<String>,
        sql: impl Into<String>,
        page_size: i32,
        max_rows: i32,
        auto_commit: bool,
    ) -> Self {
        Self::Execute {
            id: next_request_id(),
            schema,
            page_size,
            max_rows,
            sql: sql.into(),
            auto_commit,
        }
    }

    /// Create a fetch request.
    #[must_use]
    pub fn fetch(cursor_id: i64, page_size: i32) -> Self {
        Self::Fetch {
            id: next_request_id(),
            cursor_id,
            page_size,
        }
    }

    /// Create a metadata request.
    #[must_use]
    pub fn metadata(cursor_id: i64) -> Self {
        Self::Metadata {
            id: next_request_id(),
            cursor_id,
        }
    }

    /// Create a close request.
    #[must_use]
    pub fn close(cursor_id: i64) -> Self {
        Self::Close {
            id: next_request_id(),
            cursor_id,
        }
    }

    /// Create a batch request.
    #[must_use]
    pub fn batch(
        schema: Option<String>,
        queries: Vec<String>,
        auto_commit: bool,
        last_batch: bool,
    ) -> Self {
        Self::Batch {
            id: next_request_id(),
            schema,
            queries,
            auto_commit,
            last_batch,
        }
    }

    /// Create an ordered batch request for the streaming path.
    #[must_use]
    pub fn ordered_batch(
        schema: Option<String>,
        queries: Vec<String>,
        auto_commit: bool,
        last_batch: bool,
        order: i64,
    ) -> Self {
        Self::OrderedBatch {
            id: next_request_id(),
            schema,
            queries,
            auto_commit,
            last_batch,
            order,
        }
    }

    /// Create a cancel request targeting `target_id`.
    #[must_use]
    pub fn cancel(target_id: i64) -> Self {
        Self::Cancel {
            id: next_request_id(),
            target_id,
        }
    }

    /// Request id.
    #[must_use]
    pub fn id(&self) -> i64 {
        match *self {
            Self::Execute { id, .. }
            | Self::Fetch { id, .. }
            | Self::Metadata { id, .. }
            | Self::Close { id, .. }
            | Self::Batch { id, .. }
            | Self::OrderedBatch { id, .. }
            | Self::Cancel { id, .. } => id,
        }
    }

    /// Opcode tag of this request.
    #[must_use]
    pub fn op(&self) -> RequestOp {
        match self {
            Self::Execute { .. } => RequestOp::Execute,
            Self::Fetch { .. } => RequestOp::Fetch,
            Self::Metadata { .. } => RequestOp::Metadata,
            Self::Close { .. } => RequestOp::Close,
            Self::Batch { .. } => RequestOp::Batch,
            Self::OrderedBatch { .. } => RequestOp::OrderedBatch,
            Self::Cancel { .. } => RequestOp::Cancel,
        }
    }

    /// Whether this is a close request (cancelled close requests succeed
    /// without touching the wire).
    #[must_use]
    pub fn is_close(&self) -> bool {
        matches!(self, Self::Close { .. })
    }

    /// Whether the dispatcher records this request on its statement context
    /// for out-of-band cancellation.
    #[must_use]
    pub fn tracks_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Execute { .. } | Self::Batch { .. } | Self::OrderedBatch { .. }
        )
    }

    /// Ordering sequence number, present on ordered batch requests only.
    #[must_use]
    pub fn order(&self) -> Option<i64> {
        match *self {
            Self::OrderedBatch { order, .. } => Some(order),
            _ => None,
        }
    }

    /// Estimate the encode-buffer capacity for this request.
    ///
    /// A performance optimization, not a correctness requirement: the
    /// estimate pre-sizes the buffer so typical requests serialize without
    /// reallocation.
    #[must_use]
    pub fn capacity_hint(&self) -> usize {
        match self {
            Self::Batch { queries, .. } | Self::OrderedBatch { queries, .. } => {
                // One extra byte each for the auto-commit and last-batch flags.
                queries.len().min(MAX_BATCH_QUERY_COUNT) * DYNAMIC_SIZE_MSG_CAP + 2
            }
            Self::Close { .. } => QUERY_CLOSE_MSG_SIZE,
            Self::Metadata { .. } => QUERY_META_MSG_SIZE,
            Self::Fetch { .. } => QUERY_FETCH_MSG_SIZE,
            _ => DYNAMIC_SIZE_MSG_CAP,
        }
    }

    /// Encode this request for the negotiated `version`.
    pub fn encode(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        codec::write_u8(dst, self.op() as u8);
        codec::write_i64(dst, self.id());

        match self {
            Self::Execute {
                schema,
                page_size,
                max_rows,
                sql,
                auto_commit,
                ..
            } => {
                codec::write_string(dst, schema.as_deref());
                codec::write_i32(dst, *page_size);
                codec::write_i32(dst, *max_rows);
                codec::write_string(dst, Some(sql));
                if version.at_least(ProtocolVersion::V2_7_0) {
                    codec::write_bool(dst, *auto_commit);
                }
            }
            Self::Fetch {
                cursor_id,
                page_size,
                ..
            } => {
                codec::write_i64(dst, *cursor_id);
                codec::write_i32(dst, *page_size);
            }
            Self::Metadata { cursor_id, .. } | Self::Close { cursor_id, .. } => {
                codec::write_i64(dst, *cursor_id);
            }
            Self::Batch {
                schema,
                queries,
                auto_commit,
                last_batch,
                ..
            } => {
                encode_batch_body(dst, schema.as_deref(), queries, *auto_commit, *last_batch);
            }
            Self::OrderedBatch {
                schema,
                queries,
                auto_commit,
                last_batch,
                order,
                ..
            } => {
                encode_batch_body(dst, schema.as_deref(), queries, *auto_commit, *last_batch);
                codec::write_i64(dst, *order);
            }
            Self::Cancel { target_id, .. } => {
                codec::write_i64(dst, *target_id);
            }
        }
    }
}

fn encode_batch_body(
    dst: &mut impl BufMut,
    schema: Option<&str>,
    queries: &[String],
    auto_commit: bool,
    last_batch: bool,
) {
    codec::write_string(dst, schema);
    codec::write_i32(dst, queries.len() as i32);
    for sql in queries {
        codec::write_string(dst, Some(sql));
    }
    codec::write_bool(dst, auto_commit);
    codec::write_bool(dst, last_batch);
}
