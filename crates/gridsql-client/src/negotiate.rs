//! Handshake negotiation.
//!
//! The negotiator proposes [`ProtocolVersion::CURRENT`] and, on rejection,
//! walks the fixed fallback table until the server accepts or the table is
//! exhausted. The original recursion is expressed as a loop over
//! [`ProtocolVersion::FALLBACK_CHAIN`], which keeps the chain a first-class,
//! testable piece of data and bounds the number of round trips.
//!
//! An advertised version is matched by exact equality only. A version the
//! client never validated wire compatibility with (even one numerically
//! between two known revisions) terminates negotiation instead of being
//! silently assumed compatible.

use bytes::BytesMut;
use gridsql_codec::{FrameReader, FrameWriter};
use gridsql_protocol::{HandshakeOutcome, HandshakeReply, ProtocolVersion, HANDSHAKE_MSG_SIZE};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};

/// Drives the handshake over a freshly framed stream.
pub(crate) struct Negotiator<'a> {
    config: &'a ConnectionConfig,
}

impl<'a> Negotiator<'a> {
    pub(crate) fn new(config: &'a ConnectionConfig) -> Self {
        Self { config }
    }

    /// Negotiate starting from [`ProtocolVersion::CURRENT`].
    ///
    /// Returns the handshake outcome on acceptance. Any error aborts
    /// connection establishment; no degraded connection is ever produced.
    pub(crate) async fn run<R, W>(
        &self,
        reader: &mut FrameReader<R>,
        writer: &mut FrameWriter<W>,
    ) -> Result<HandshakeOutcome>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut proposed = ProtocolVersion::CURRENT;

        loop {
            tracing::debug!(version = %proposed, "proposing protocol version");

            let request = self.config.handshake_request(proposed);
            let mut buf = BytesMut::with_capacity(HANDSHAKE_MSG_SIZE);
            request.encode(&mut buf);
            writer.send(buf.freeze()).await?;

            let frame = reader.recv().await?;
            let mut src = frame.freeze();

            match HandshakeReply::decode(&mut src, proposed)? {
                HandshakeReply::Accepted {
                    server_version,
                    node_id,
                } => {
                    tracing::debug!(
                        negotiated = %proposed,
                        server = %server_version,
                        "handshake accepted"
                    );

                    return Ok(HandshakeOutcome {
                        server_version,
                        negotiated_version: proposed,
                        node_id,
                    });
                }
                HandshakeReply::Rejected {
                    advertised,
                    message,
                } => {
                    // A server below 2.5.0 can never carry credentials;
                    // retrying there would only fail later with a worse
                    // diagnostic.
                    if advertised < ProtocolVersion::V2_5_0 && request.has_credentials() {
                        return Err(Error::AuthenticationUnsupported {
                            client: ProtocolVersion::CURRENT,
                            server: advertised,
                            message,
                        });
                    }

                    // Strictly-decreasing fallback over a finite table bounds
                    // the number of round trips; a server advertising the
                    // version it just rejected cannot make progress.
                    if advertised.is_fallback_candidate() && advertised < proposed {
                        tracing::debug!(
                            rejected = %proposed,
                            advertised = %advertised,
                            "server rejected version, falling back"
                        );

                        proposed = advertised;
                        continue;
                    }

                    if advertised == ProtocolVersion::V2_1_0 {
                        return self.legacy_handshake(reader, writer).await;
                    }

                    return Err(Error::HandshakeRejected {
                        client: ProtocolVersion::CURRENT,
                        server: advertised,
                        message,
                    });
                }
            }
        }
    }

    /// Compatibility handshake for 2.1.0 servers.
    ///
    /// Carries only the five base flags; the oldest servers cannot parse
    /// anything beyond them. A rejection here is terminal: there is nothing
    /// older to fall back to.
    async fn legacy_handshake<R, W>(
        &self,
        reader: &mut FrameReader<R>,
        writer: &mut FrameWriter<W>,
    ) -> Result<HandshakeOutcome>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::debug!("attempting legacy 2.1.0 handshake");

        let request = self.config.handshake_request(ProtocolVersion::V2_1_0);
        let mut buf = BytesMut::with_capacity(HANDSHAKE_MSG_SIZE);
        request.encode_legacy(&mut buf);
        writer.send(buf.freeze()).await?;

        let frame = reader.recv().await?;
        let mut src = frame.freeze();

        match HandshakeReply::decode_legacy(&mut src)? {
            HandshakeReply::Accepted {
                server_version,
                node_id,
            } => {
                tracing::debug!(negotiated = %ProtocolVersion::V2_1_0, "legacy handshake accepted");

                Ok(HandshakeOutcome {
                    server_version,
                    negotiated_version: ProtocolVersion::V2_1_0,
                    node_id,
                })
            }
            HandshakeReply::Rejected {
                advertised,
                message,
            } => Err(Error::HandshakeRejected {
                client: ProtocolVersion::CURRENT,
                server: advertised,
                message,
            }),
        }
    }
}
