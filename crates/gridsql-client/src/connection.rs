//! Connection handle and request dispatch.
//!
//! A connection owns one byte stream, the outcome of its handshake, and the
//! capability matrix derived from the negotiated version. The stream is split
//! into framed halves: the write half sits behind a connection-wide lock so
//! concurrent senders never interleave partial messages; the read half is
//! deliberately *not* covered by that lock, because the protocol allows at
//! most one outstanding synchronous request/response cycle per connection,
//! enforced by callers, not by this layer.

use bytes::BytesMut;
use gridsql_codec::{FrameReader, FrameWriter};
use gridsql_protocol::{
    Capabilities, HandshakeOutcome, ProductVersion, ProtocolVersion, Request, Response,
};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::negotiate::Negotiator;
use crate::state::ConnectionState;
use crate::statement::StatementContext;

/// A negotiated thin-client connection over a byte stream.
///
/// One connection equals one logical session equals one negotiated version.
/// The handle is shareable (`&self` methods); writes are serialized
/// internally, while the single-outstanding-synchronous-request contract is
/// the caller's responsibility.
pub struct Connection<T> {
    writer: Mutex<FrameWriter<WriteHalf<T>>>,
    reader: Mutex<FrameReader<ReadHalf<T>>>,
    state: parking_lot::Mutex<ConnectionState>,
    outcome: HandshakeOutcome,
    capabilities: Capabilities,
    config: ConnectionConfig,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite,
{
    /// Perform the handshake over `stream` and return a ready connection.
    ///
    /// The stream must be freshly established; the handshake is the first
    /// traffic on it in either direction. On any transport or negotiation
    /// failure the stream is dropped and no connection is returned.
    pub async fn connect(stream: T, config: ConnectionConfig) -> Result<Self> {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = FrameReader::new(read_half);
        let mut writer = FrameWriter::new(write_half);

        let outcome = Negotiator::new(&config).run(&mut reader, &mut writer).await?;
        let capabilities = Capabilities::for_version(outcome.negotiated_version);

        tracing::debug!(
            negotiated = %outcome.negotiated_version,
            server = %outcome.server_version,
            "connection ready"
        );

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            state: parking_lot::Mutex::new(ConnectionState::Ready),
            outcome,
            capabilities,
            config,
        })
    }

    /// Send a request and wait for its response.
    ///
    /// With an owning [`StatementContext`] the send is cancellation-aware:
    ///
    /// - a context already marked cancelled short-circuits without touching
    ///   the wire: a close request reports empty success, anything else the
    ///   synthetic cancelled response;
    /// - execute/batch requests are recorded on the context while its mutex
    ///   is held, so an out-of-band cancel can target them;
    /// - a cancellation observed after the send wins over a racing server
    ///   response: the real response is discarded.
    pub async fn send(
        &self,
        request: &Request,
        context: Option<&StatementContext>,
    ) -> Result<Response> {
        self.ensure_ready()?;

        let Some(ctx) = context else {
            self.send_raw(request).await?;
            return self.read_response().await;
        };

        {
            let _guard = ctx.lock().await;

            if ctx.is_cancelled() {
                return Ok(if request.is_close() {
                    Response::empty()
                } else {
                    Response::cancelled()
                });
            }

            self.send_raw(request).await?;

            if request.tracks_in_flight() {
                ctx.record_in_flight(request.id());
            }
        }

        let response = self.read_response().await?;

        if ctx.is_cancelled() {
            return Ok(Response::cancelled());
        }

        Ok(response)
    }

    /// Send a request on the fire-and-forget streaming path.
    ///
    /// No response is read; result correlation is the caller's business via
    /// the request's ordering sequence number. Fails with
    /// [`Error::CapabilityUnsupported`], before writing any bytes, when the
    /// negotiated version predates unordered streaming.
    pub async fn send_no_wait(&self, request: &Request) -> Result<()> {
        self.ensure_ready()?;

        if !self.capabilities.supports_unordered_stream() {
            return Err(Error::CapabilityUnsupported {
                feature: "streaming without response",
                negotiated: self.negotiated_version(),
            });
        }

        self.send_raw(request).await
    }

    /// Send a cancel notification.
    ///
    /// No response is read; the server correlates the cancellation with the
    /// targeted request asynchronously.
    pub async fn send_cancel(&self, request: &Request) -> Result<()> {
        self.ensure_ready()?;
        self.send_raw(request).await
    }

    /// Capability matrix of the negotiated version.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Outcome of the handshake that established this connection.
    #[must_use]
    pub fn handshake_outcome(&self) -> &HandshakeOutcome {
        &self.outcome
    }

    /// The protocol version both sides agreed on.
    #[must_use]
    pub fn negotiated_version(&self) -> ProtocolVersion {
        self.outcome.negotiated_version
    }

    /// Server build identity reported during the handshake.
    #[must_use]
    pub fn server_version(&self) -> &ProductVersion {
        &self.outcome.server_version
    }

    /// Server node id, reported by 2.8.0+ servers.
    #[must_use]
    pub fn node_id(&self) -> Option<Uuid> {
        self.outcome.node_id
    }

    /// Configuration this connection was established with.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Close the connection, releasing the byte stream.
    ///
    /// Idempotent; subsequent sends and reads fail with
    /// [`Error::ConnectionClosed`]. Shutdown errors on the transport are
    /// logged and swallowed.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.is_closed() {
                return;
            }
            *state = ConnectionState::Closed;
        }

        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.shutdown().await {
            tracing::debug!(error = %err, "transport shutdown failed");
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state.lock().is_ready() {
            Ok(())
        } else {
            Err(Error::ConnectionClosed)
        }
    }

    /// Encode and send one request under the connection-wide write lock.
    ///
    /// Framing, send, and flush happen while the lock is held, so messages
    /// from concurrent senders reach the server whole and in lock order.
    async fn send_raw(&self, request: &Request) -> Result<()> {
        let mut buf = BytesMut::with_capacity(request.capacity_hint());
        request.encode(&mut buf, self.negotiated_version());

        tracing::trace!(
            op = ?request.op(),
            request_id = request.id(),
            len = buf.len(),
            "sending request"
        );

        let mut writer = self.writer.lock().await;
        writer.send(buf.freeze()).await?;
        Ok(())
    }

    /// Read and decode one response frame.
    async fn read_response(&self) -> Result<Response> {
        let frame = {
            let mut reader = self.reader.lock().await;
            reader.recv().await?
        };

        let mut src = frame.freeze();
        let response = Response::decode(&mut src, self.negotiated_version())?;

        tracing::trace!(status = response.status(), "received response");

        Ok(response)
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &*self.state.lock())
            .field("negotiated_version", &self.outcome.negotiated_version)
            .finish_non_exhaustive()
    }
}
