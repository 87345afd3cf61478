//! Handshake request/reply payloads.
//!
//! The handshake is the first framed message on a fresh byte stream. The
//! client proposes a protocol version together with its negotiation-affecting
//! flags; the server either accepts (optionally reporting its build identity
//! and, from 2.8.0 on, its node id) or rejects while advertising the highest
//! version it speaks.
//!
//! Two request layouts exist:
//!
//! - the regular layout, used for every version from 2.1.5 upwards, whose
//!   tail fields are gated on the proposed version;
//! - the legacy 2.1.0 layout ([`HandshakeRequest::encode_legacy`]), which
//!   carries only the five base flags because the oldest servers cannot
//!   parse anything beyond them.

use bytes::{Buf, BufMut};
use core::fmt;
use uuid::Uuid;

use crate::codec;
use crate::error::ProtocolError;
use crate::version::ProtocolVersion;

/// Opcode tag of the handshake request.
pub const OP_HANDSHAKE: u8 = 1;

/// Client-kind tag identifying a SQL thin client.
pub const CLIENT_SQL: u8 = 1;

/// Initial buffer capacity for a handshake request.
pub const HANDSHAKE_MSG_SIZE: usize = 13;

/// Client handshake request payload.
///
/// Built from the connection configuration for one specific proposed version;
/// the negotiator constructs a fresh value for every fallback attempt.
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    /// Version proposed to the server.
    pub version: ProtocolVersion,
    /// Allow joins spanning multiple nodes.
    pub distributed_joins: bool,
    /// Do not reorder tables in joins.
    pub enforce_join_order: bool,
    /// Assume collocated data for joins.
    pub collocated: bool,
    /// Restrict queries to replicated tables.
    pub replicated_only: bool,
    /// Close server-side cursors automatically when the last page is fetched.
    pub auto_close_server_cursor: bool,
    /// Lazy result-set materialization (carried from 2.1.5 on).
    pub lazy: bool,
    /// Skip the reducer stage for update statements (carried from 2.1.5 on).
    pub skip_reducer_on_update: bool,
    /// Nested-transaction handling mode (carried from 2.7.0 on).
    pub nested_tx_mode: String,
    /// Data-page-scan hint, tri-state (carried from 2.8.0 on).
    pub data_page_scan: Option<bool>,
    /// Username; credentials are appended only when non-empty.
    pub username: Option<String>,
    /// Password accompanying the username.
    pub password: Option<String>,
}

impl HandshakeRequest {
    /// Whether this request would append credential fields.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        matches!(&self.username, Some(user) if !user.is_empty())
    }

    /// Encode the regular (2.1.5+) handshake layout.
    ///
    /// Tail fields are gated on the proposed version. Credentials are only
    /// legal from 2.5.0 on; the negotiator's rejection handling guarantees it
    /// never proposes an older version while credentials are configured, so
    /// this is an internal consistency check rather than a runtime condition.
    pub fn encode(&self, dst: &mut impl BufMut) {
        self.encode_header(dst);

        codec::write_bool(dst, self.distributed_joins);
        codec::write_bool(dst, self.enforce_join_order);
        codec::write_bool(dst, self.collocated);
        codec::write_bool(dst, self.replicated_only);
        codec::write_bool(dst, self.auto_close_server_cursor);

        if self.version.at_least(ProtocolVersion::V2_1_5) {
            codec::write_bool(dst, self.lazy);
            codec::write_bool(dst, self.skip_reducer_on_update);
        }

        if self.version.at_least(ProtocolVersion::V2_7_0) {
            codec::write_string(dst, Some(&self.nested_tx_mode));
        }

        if self.version.at_least(ProtocolVersion::V2_8_0) {
            codec::write_u8(dst, codec::nullable_bool_to_byte(self.data_page_scan));
        }

        if self.has_credentials() {
            debug_assert!(
                self.version.at_least(ProtocolVersion::V2_5_0),
                "authentication requires protocol 2.5.0 or newer"
            );

            codec::write_string(dst, self.username.as_deref());
            codec::write_string(dst, self.password.as_deref());
        }
    }

    /// Encode the legacy 2.1.0 handshake layout: header plus the five base
    /// flags, nothing else.
    pub fn encode_legacy(&self, dst: &mut impl BufMut) {
        self.encode_header_for(dst, ProtocolVersion::V2_1_0);

        codec::write_bool(dst, self.distributed_joins);
        codec::write_bool(dst, self.enforce_join_order);
        codec::write_bool(dst, self.collocated);
        codec::write_bool(dst, self.replicated_only);
        codec::write_bool(dst, self.auto_close_server_cursor);
    }

    fn encode_header(&self, dst: &mut impl BufMut) {
        self.encode_header_for(dst, self.version);
    }

    fn encode_header_for(&self, dst: &mut impl BufMut, version: ProtocolVersion) {
        codec::write_u8(dst, OP_HANDSHAKE);
        codec::write_u16(dst, version.major());
        codec::write_u16(dst, version.minor());
        codec::write_u16(dst, version.maintenance());
        codec::write_u8(dst, CLIENT_SQL);
    }
}

/// Server build identity reported in the accept payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductVersion {
    /// Major component of the server release.
    pub major: u8,
    /// Minor component of the server release.
    pub minor: u8,
    /// Maintenance component of the server release.
    pub maintenance: u8,
    /// Release stage string.
    pub stage: String,
    /// Build timestamp, milliseconds since the epoch.
    pub build_timestamp: i64,
    /// Revision hash of the server build, when reported.
    pub revision_hash: Option<Vec<u8>>,
}

impl ProductVersion {
    /// Placeholder identity for servers that do not report one.
    #[must_use]
    pub fn unknown(major: u8, minor: u8, maintenance: u8) -> Self {
        Self {
            major,
            minor,
            maintenance,
            stage: "Unknown".to_owned(),
            build_timestamp: 0,
            revision_hash: None,
        }
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.maintenance)?;
        if !self.stage.is_empty() {
            write!(f, " ({})", self.stage)?;
        }
        Ok(())
    }
}

/// Result of a completed negotiation, owned by the connection for its
/// lifetime.
#[derive(Debug, Clone)]
pub struct HandshakeOutcome {
    /// Server build identity.
    pub server_version: ProductVersion,
    /// The protocol version both sides agreed on.
    pub negotiated_version: ProtocolVersion,
    /// Server node id, reported from 2.8.0 on.
    pub node_id: Option<Uuid>,
}

/// Decoded server handshake reply.
#[derive(Debug, Clone)]
pub enum HandshakeReply {
    /// The server accepted the proposed version.
    Accepted {
        /// Server build identity; synthesized for servers that send an empty
        /// accept payload.
        server_version: ProductVersion,
        /// Server node id when the proposed version carries one.
        node_id: Option<Uuid>,
    },
    /// The server rejected the proposed version.
    Rejected {
        /// Highest version the server advertised.
        advertised: ProtocolVersion,
        /// Server-supplied error text.
        message: String,
    },
}

impl HandshakeReply {
    /// Decode a reply to the regular handshake proposed at `proposed`.
    ///
    /// The oldest servers accept with no payload beyond the leading boolean;
    /// their identity is synthesized as `2.0.0 (Unknown)`.
    pub fn decode(src: &mut impl Buf, proposed: ProtocolVersion) -> Result<Self, ProtocolError> {
        if codec::read_bool(src)? {
            if !src.has_remaining() {
                return Ok(Self::Accepted {
                    server_version: ProductVersion::unknown(2, 0, 0),
                    node_id: None,
                });
            }

            let major = codec::read_u8(src)?;
            let minor = codec::read_u8(src)?;
            let maintenance = codec::read_u8(src)?;
            let stage = codec::read_string(src)?.unwrap_or_else(|| "Unknown".to_owned());
            let build_timestamp = codec::read_i64(src)?;
            let revision_hash = codec::read_byte_array(src)?;

            let node_id = if proposed.at_least(ProtocolVersion::V2_8_0) {
                Some(codec::read_uuid(src)?)
            } else {
                None
            };

            Ok(Self::Accepted {
                server_version: ProductVersion {
                    major,
                    minor,
                    maintenance,
                    stage,
                    build_timestamp,
                    revision_hash,
                },
                node_id,
            })
        } else {
            Self::decode_rejection(src)
        }
    }

    /// Decode a reply to the legacy 2.1.0 handshake.
    ///
    /// The accepted branch never carries extra bytes; the server identity is
    /// hardcoded to `2.1.0 (Unknown)`. The rejection branch mirrors the
    /// regular layout.
    pub fn decode_legacy(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if codec::read_bool(src)? {
            Ok(Self::Accepted {
                server_version: ProductVersion::unknown(2, 1, 0),
                node_id: None,
            })
        } else {
            Self::decode_rejection(src)
        }
    }

    fn decode_rejection(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let major = codec::read_i16(src)?;
        let minor = codec::read_i16(src)?;
        let maintenance = codec::read_i16(src)?;
        let message = codec::read_string(src)?.unwrap_or_default();

        Ok(Self::Rejected {
            advertised: ProtocolVersion::new(major as u16, minor as u16, maintenance as u16),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn request(version: ProtocolVersion) -> HandshakeRequest {
        HandshakeRequest {
            version,
            distributed_joins: true,
            enforce_join_order: false,
            collocated: true,
            replicated_only: false,
            auto_close_server_cursor: true,
            lazy: true,
            skip_reducer_on_update: false,
            nested_tx_mode: "ERROR".to_owned(),
            data_page_scan: Some(true),
            username: None,
            password: None,
        }
    }

    #[test]
    fn test_encode_header_layout() {
        let mut buf = BytesMut::new();
        request(ProtocolVersion::V2_8_0).encode(&mut buf);

        assert_eq!(buf[0], OP_HANDSHAKE);
        // u16 LE version triple: 2.8.0
        assert_eq!(&buf[1..7], &[2, 0, 8, 0, 0, 0]);
        assert_eq!(buf[7], CLIENT_SQL);
        // five base flags
        assert_eq!(&buf[8..13], &[1, 0, 1, 0, 1]);
        // lazy + skip_reducer_on_update
        assert_eq!(&buf[13..15], &[1, 0]);
    }

    #[test]
    fn test_encode_tail_is_version_gated() {
        let mut v2_4 = BytesMut::new();
        request(ProtocolVersion::V2_4_0).encode(&mut v2_4);
        // header + 5 base flags + lazy/skip_reducer
        assert_eq!(v2_4.len(), 15);

        let mut v2_7 = BytesMut::new();
        request(ProtocolVersion::V2_7_0).encode(&mut v2_7);
        // + i32 length prefix + "ERROR"
        assert_eq!(v2_7.len(), 15 + 4 + 5);

        let mut v2_8 = BytesMut::new();
        request(ProtocolVersion::V2_8_0).encode(&mut v2_8);
        // + tri-state byte
        assert_eq!(v2_8.len(), 15 + 4 + 5 + 1);
        assert_eq!(v2_8[v2_8.len() - 1], 2); // Some(true)
    }

    #[test]
    fn test_encode_credentials_appended_when_username_set() {
        let mut req = request(ProtocolVersion::V2_5_0);
        req.username = Some("grid".to_owned());
        req.password = Some("s3cret".to_owned());
        assert!(req.has_credentials());

        let mut buf = BytesMut::new();
        req.encode(&mut buf);

        let tail = &buf[15..];
        let mut src = tail;
        assert_eq!(
            codec::read_string(&mut src).unwrap().as_deref(),
            Some("grid")
        );
        assert_eq!(
            codec::read_string(&mut src).unwrap().as_deref(),
            Some("s3cret")
        );
    }

    #[test]
    fn test_empty_username_is_not_credentials() {
        let mut req = request(ProtocolVersion::V2_8_0);
        req.username = Some(String::new());
        assert!(!req.has_credentials());
    }

    #[test]
    fn test_encode_legacy_is_base_flags_only() {
        let mut buf = BytesMut::new();
        request(ProtocolVersion::V2_8_0).encode_legacy(&mut buf);

        // header advertises 2.1.0 regardless of the configured version
        assert_eq!(&buf[1..7], &[2, 0, 1, 0, 0, 0]);
        assert_eq!(buf.len(), 13);
    }

    #[test]
    fn test_decode_accept_with_server_identity() {
        let mut buf = BytesMut::new();
        codec::write_bool(&mut buf, true);
        codec::write_u8(&mut buf, 2);
        codec::write_u8(&mut buf, 8);
        codec::write_u8(&mut buf, 1);
        codec::write_string(&mut buf, Some("1.0.0#20200101-sha"));
        codec::write_i64(&mut buf, 1_577_836_800_000);
        codec::write_byte_array(&mut buf, Some(&[0xAB, 0xCD]));
        let node = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
        codec::write_uuid(&mut buf, node);

        let mut src = buf.freeze();
        let reply = HandshakeReply::decode(&mut src, ProtocolVersion::V2_8_0).unwrap();
        match reply {
            HandshakeReply::Accepted {
                server_version,
                node_id,
            } => {
                assert_eq!(server_version.major, 2);
                assert_eq!(server_version.stage, "1.0.0#20200101-sha");
                assert_eq!(server_version.build_timestamp, 1_577_836_800_000);
                assert_eq!(server_version.revision_hash, Some(vec![0xAB, 0xCD]));
                assert_eq!(node_id, Some(node));
            }
            HandshakeReply::Rejected { .. } => panic!("expected acceptance"),
        }
    }

    #[test]
    fn test_decode_accept_without_node_id_below_2_8() {
        let mut buf = BytesMut::new();
        codec::write_bool(&mut buf, true);
        codec::write_u8(&mut buf, 2);
        codec::write_u8(&mut buf, 5);
        codec::write_u8(&mut buf, 3);
        codec::write_string(&mut buf, Some("GA"));
        codec::write_i64(&mut buf, 42);
        codec::write_byte_array(&mut buf, None);

        let mut src = buf.freeze();
        let reply = HandshakeReply::decode(&mut src, ProtocolVersion::V2_5_0).unwrap();
        match reply {
            HandshakeReply::Accepted { node_id, .. } => assert_eq!(node_id, None),
            HandshakeReply::Rejected { .. } => panic!("expected acceptance"),
        }
        assert!(!src.has_remaining());
    }

    #[test]
    fn test_decode_bare_accept_synthesizes_unknown_identity() {
        let mut src = &[1u8][..];
        let reply = HandshakeReply::decode(&mut src, ProtocolVersion::V2_8_0).unwrap();
        match reply {
            HandshakeReply::Accepted {
                server_version,
                node_id,
            } => {
                assert_eq!(server_version, ProductVersion::unknown(2, 0, 0));
                assert_eq!(node_id, None);
            }
            HandshakeReply::Rejected { .. } => panic!("expected acceptance"),
        }
    }

    #[test]
    fn test_decode_rejection() {
        let mut buf = BytesMut::new();
        codec::write_bool(&mut buf, false);
        codec::write_i16(&mut buf, 2);
        codec::write_i16(&mut buf, 5);
        codec::write_i16(&mut buf, 0);
        codec::write_string(&mut buf, Some("unsupported version"));

        let mut src = buf.freeze();
        let reply = HandshakeReply::decode(&mut src, ProtocolVersion::V2_8_0).unwrap();
        match reply {
            HandshakeReply::Rejected {
                advertised,
                message,
            } => {
                assert_eq!(advertised, ProtocolVersion::V2_5_0);
                assert_eq!(message, "unsupported version");
            }
            HandshakeReply::Accepted { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_decode_legacy_accept_ignores_extra_bytes() {
        // A 2.1.0 server never sends identity fields; any stray bytes after
        // the boolean are not interpreted.
        let mut src = &[1u8, 0xDE, 0xAD][..];
        let reply = HandshakeReply::decode_legacy(&mut src).unwrap();
        match reply {
            HandshakeReply::Accepted {
                server_version,
                node_id,
            } => {
                assert_eq!(server_version, ProductVersion::unknown(2, 1, 0));
                assert_eq!(node_id, None);
            }
            HandshakeReply::Rejected { .. } => panic!("expected acceptance"),
        }
    }
}
