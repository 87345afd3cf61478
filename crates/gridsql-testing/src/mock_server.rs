//! Mock GridSQL server for unit testing.
//!
//! Speaks the genuine thin-client wire format over a loopback TCP listener:
//! length-prefixed frames, the handshake accept/reject payloads, and the
//! response envelope. The handshake behavior is scripted through
//! [`HandshakePolicy`], and every handshake round trip is counted so tests
//! can assert how many attempts a negotiation took.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridsql_testing::{HandshakePolicy, MockGridServer};
//! use gridsql_client::{Connection, ConnectionConfig};
//! use gridsql_protocol::ProtocolVersion;
//!
//! #[tokio::test]
//! async fn negotiates_downgrade() {
//!     let server = MockGridServer::builder()
//!         .policy(HandshakePolicy::AcceptUpTo(ProtocolVersion::V2_5_0))
//!         .start()
//!         .await
//!         .unwrap();
//!
//!     let stream = tokio::net::TcpStream::connect(server.addr()).await.unwrap();
//!     let conn = Connection::connect(stream, ConnectionConfig::new()).await.unwrap();
//!     assert_eq!(conn.negotiated_version(), ProtocolVersion::V2_5_0);
//! }
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use gridsql_codec::{CodecError, FrameReader, FrameWriter};
use gridsql_protocol::{codec, ProductVersion, ProtocolVersion, RequestOp, Response, OP_HANDSHAKE};
use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Error type for mock server operations.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Frame codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Scripted handshake behavior.
#[derive(Debug, Clone, Copy)]
pub enum HandshakePolicy {
    /// Accept whatever version the client proposes.
    AcceptProposed,
    /// Accept exactly this version; reject anything newer while advertising
    /// it. `AcceptUpTo(V2_1_0)` exercises the legacy handshake path.
    AcceptUpTo(ProtocolVersion),
    /// Reject every proposal, always advertising this version.
    AlwaysReject(ProtocolVersion),
}

/// Builder for [`MockGridServer`].
#[derive(Debug)]
pub struct MockGridServerBuilder {
    policy: HandshakePolicy,
    identity: Option<ProductVersion>,
    node_id: Option<Uuid>,
    payload: Bytes,
}

impl MockGridServerBuilder {
    /// Set the handshake policy (default: accept whatever is proposed).
    #[must_use]
    pub fn policy(mut self, policy: HandshakePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report this build identity in accept payloads. Without one the server
    /// answers with a bare acceptance, like the oldest production servers.
    #[must_use]
    pub fn identity(mut self, identity: ProductVersion) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Report this node id in accept payloads for 2.8.0+ proposals.
    #[must_use]
    pub fn node_id(mut self, node_id: Uuid) -> Self {
        self.node_id = Some(node_id);
        self
    }

    /// Payload returned in every successful response (default: empty).
    #[must_use]
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Bind a loopback listener and start serving connections.
    pub async fn start(self) -> Result<MockGridServer, MockServerError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            policy: self.policy,
            identity: self.identity,
            node_id: self.node_id,
            payload: self.payload,
            handshakes: AtomicUsize::new(0),
        });

        let accept_loop = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((stream, peer)) => {
                            tracing::debug!(%peer, "mock server accepted connection");
                            tokio::spawn(handle_connection(stream, Arc::clone(&shared)));
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "mock server accept failed");
                            return;
                        }
                    }
                }
            })
        };

        Ok(MockGridServer {
            addr,
            shared,
            accept_loop,
        })
    }
}

/// A scripted in-process GridSQL server.
#[derive(Debug)]
pub struct MockGridServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    accept_loop: JoinHandle<()>,
}

impl MockGridServer {
    /// Start building a mock server.
    #[must_use]
    pub fn builder() -> MockGridServerBuilder {
        MockGridServerBuilder {
            policy: HandshakePolicy::AcceptProposed,
            identity: None,
            node_id: None,
            payload: Bytes::new(),
        }
    }

    /// Address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of handshake round trips served so far, across connections.
    #[must_use]
    pub fn handshake_count(&self) -> usize {
        self.shared.handshakes.load(Ordering::SeqCst)
    }
}

impl Drop for MockGridServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

#[derive(Debug)]
struct Shared {
    policy: HandshakePolicy,
    identity: Option<ProductVersion>,
    node_id: Option<Uuid>,
    payload: Bytes,
    handshakes: AtomicUsize,
}

async fn handle_connection(stream: TcpStream, shared: Arc<Shared>) {
    let (rx, tx) = stream.into_split();
    let mut reader = FrameReader::new(rx);
    let mut writer = FrameWriter::new(tx);

    if let Err(err) = serve(&mut reader, &mut writer, &shared).await {
        tracing::debug!(error = %err, "mock connection ended");
    }
}

async fn serve(
    reader: &mut FrameReader<OwnedReadHalf>,
    writer: &mut FrameWriter<OwnedWriteHalf>,
    shared: &Shared,
) -> Result<(), MockServerError> {
    let mut negotiated: Option<ProtocolVersion> = None;

    loop {
        let frame = match reader.recv().await {
            Ok(frame) => frame,
            // Client hung up; a mock connection ends quietly.
            Err(_) => return Ok(()),
        };

        match negotiated {
            None => {
                shared.handshakes.fetch_add(1, Ordering::SeqCst);

                let Some(proposed) = parse_proposed_version(&frame) else {
                    tracing::warn!("malformed handshake frame");
                    return Ok(());
                };

                match decide(shared.policy, proposed) {
                    Verdict::Accept => {
                        writer.send(accept_frame(shared, proposed)).await?;
                        negotiated = Some(proposed);
                    }
                    Verdict::Reject(advertised) => {
                        writer.send(reject_frame(advertised)).await?;
                    }
                }
            }
            Some(version) => {
                let op = frame.first().copied().and_then(|b| RequestOp::from_u8(b).ok());

                match op {
                    // Fire-and-forget paths never get a response.
                    Some(RequestOp::OrderedBatch | RequestOp::Cancel) => {}
                    Some(_) => {
                        let mut buf = BytesMut::new();
                        Response::success(shared.payload.clone()).encode(&mut buf, version);
                        writer.send(buf.freeze()).await?;
                    }
                    None => {
                        tracing::warn!("unknown request opcode from client");
                        return Ok(());
                    }
                }
            }
        }
    }
}

enum Verdict {
    Accept,
    Reject(ProtocolVersion),
}

fn decide(policy: HandshakePolicy, proposed: ProtocolVersion) -> Verdict {
    match policy {
        HandshakePolicy::AcceptProposed => Verdict::Accept,
        HandshakePolicy::AcceptUpTo(supported) => {
            if proposed == supported {
                Verdict::Accept
            } else {
                Verdict::Reject(supported)
            }
        }
        HandshakePolicy::AlwaysReject(advertised) => Verdict::Reject(advertised),
    }
}

fn parse_proposed_version(frame: &[u8]) -> Option<ProtocolVersion> {
    let mut src = frame;
    if codec::read_u8(&mut src).ok()? != OP_HANDSHAKE {
        return None;
    }
    let major = codec::read_u16(&mut src).ok()?;
    let minor = codec::read_u16(&mut src).ok()?;
    let maintenance = codec::read_u16(&mut src).ok()?;
    Some(ProtocolVersion::new(major, minor, maintenance))
}

fn accept_frame(shared: &Shared, proposed: ProtocolVersion) -> Bytes {
    let mut buf = BytesMut::new();
    codec::write_bool(&mut buf, true);

    // Legacy acceptances and identity-less servers send the boolean alone.
    if proposed > ProtocolVersion::V2_1_0 {
        if let Some(identity) = &shared.identity {
            codec::write_u8(&mut buf, identity.major);
            codec::write_u8(&mut buf, identity.minor);
            codec::write_u8(&mut buf, identity.maintenance);
            codec::write_string(&mut buf, Some(&identity.stage));
            codec::write_i64(&mut buf, identity.build_timestamp);
            codec::write_byte_array(&mut buf, identity.revision_hash.as_deref());

            if proposed.at_least(ProtocolVersion::V2_8_0) {
                codec::write_uuid(&mut buf, shared.node_id.unwrap_or_else(Uuid::nil));
            }
        }
    }

    buf.freeze()
}

fn reject_frame(advertised: ProtocolVersion) -> Bytes {
    let mut buf = BytesMut::new();
    codec::write_bool(&mut buf, false);
    codec::write_i16(&mut buf, advertised.major() as i16);
    codec::write_i16(&mut buf, advertised.minor() as i16);
    codec::write_i16(&mut buf, advertised.maintenance() as i16);
    codec::write_string(
        &mut buf,
        Some("client version is not supported by this node"),
    );
    buf.freeze()
}
