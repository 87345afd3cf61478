//! # gridsql-codec
//!
//! Async framing layer for the GridSQL thin protocol.
//!
//! Every message in both directions travels inside the same envelope: a
//! `u32` little-endian length prefix followed by exactly that many payload
//! bytes. This crate turns raw byte streams into whole frames, handling
//! reassembly across TCP segment boundaries in both directions.
//!
//! ## Architecture
//!
//! ```text
//! TCP stream → FrameCodec (length-prefixed framing) → Connection
//! ```
//!
//! The connection layer splits the stream into read and write halves
//! ([`FrameReader`] / [`FrameWriter`]) so that writes can be serialized
//! under a lock while a response read is in flight.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod frame_codec;
pub mod framed;

pub use error::CodecError;
pub use frame_codec::{FrameCodec, DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE};
pub use framed::{FrameReader, FrameWriter};
