//! Framed stream halves for async I/O.
//!
//! The connection layer splits its transport into a read half and a write
//! half so the write side can be serialized under a connection-wide lock
//! while a response read is in flight:
//!
//! - [`FrameReader`] - receives whole frames, never a short read
//! - [`FrameWriter`] - sends one frame per call and flushes every time
//!
//! Both types also implement `Stream`/`Sink` so they compose with the
//! `futures` combinators when needed.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::{Sink, SinkExt, StreamExt};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::CodecError;
use crate::frame_codec::FrameCodec;

pin_project! {
    /// The read half of a framed transport.
    pub struct FrameReader<T> {
        #[pin]
        inner: FramedRead<T, FrameCodec>,
    }
}

impl<T> FrameReader<T>
where
    T: AsyncRead,
{
    /// Create a frame reader over the given transport half.
    pub fn new(transport: T) -> Self {
        Self {
            inner: FramedRead::new(transport, FrameCodec::new()),
        }
    }

    /// Create a frame reader with a custom codec.
    pub fn with_codec(transport: T, codec: FrameCodec) -> Self {
        Self {
            inner: FramedRead::new(transport, codec),
        }
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.inner.get_ref()
    }

    /// Consume the reader and return the underlying transport.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> FrameReader<T>
where
    T: AsyncRead + Unpin,
{
    /// Receive the next whole frame.
    ///
    /// Blocks until the full length prefix and payload have arrived. An
    /// end-of-stream before a frame completes surfaces as
    /// [`CodecError::TruncatedFrame`]; end-of-stream where a frame was
    /// expected surfaces as [`CodecError::UnexpectedEof`].
    pub async fn recv(&mut self) -> Result<BytesMut, CodecError> {
        match self.inner.next().await {
            Some(frame) => frame,
            None => Err(CodecError::UnexpectedEof),
        }
    }
}

impl<T> Stream for FrameReader<T>
where
    T: AsyncRead + Unpin,
{
    type Item = Result<BytesMut, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

impl<T> std::fmt::Debug for FrameReader<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("transport", self.inner.get_ref())
            .finish()
    }
}

pin_project! {
    /// The write half of a framed transport.
    pub struct FrameWriter<T> {
        #[pin]
        inner: FramedWrite<T, FrameCodec>,
    }
}

impl<T> FrameWriter<T>
where
    T: AsyncWrite,
{
    /// Create a frame writer over the given transport half.
    pub fn new(transport: T) -> Self {
        Self {
            inner: FramedWrite::new(transport, FrameCodec::new()),
        }
    }

    /// Create a frame writer with a custom codec.
    pub fn with_codec(transport: T, codec: FrameCodec) -> Self {
        Self {
            inner: FramedWrite::new(transport, codec),
        }
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.inner.get_ref()
    }

    /// Consume the writer and return the underlying transport.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> FrameWriter<T>
where
    T: AsyncWrite + Unpin,
{
    /// Frame and send one payload, flushing the underlying stream.
    ///
    /// One flush per logical message: the server observes complete messages
    /// without client-side buffering delay.
    pub async fn send(&mut self, frame: Bytes) -> Result<(), CodecError> {
        SinkExt::send(&mut self.inner, frame).await
    }

    /// Flush and shut down the write half.
    pub async fn shutdown(&mut self) -> Result<(), CodecError> {
        self.inner.close().await
    }
}

impl<T> Sink<Bytes> for FrameWriter<T>
where
    T: AsyncWrite + Unpin,
{
    type Error = CodecError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        self.project().inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx)
    }
}

impl<T> std::fmt::Debug for FrameWriter<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("transport", self.inner.get_ref())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_recv_roundtrip() {
        let (client, server) = tokio::io::duplex(1024);
        let (server_rx, _server_tx) = tokio::io::split(server);
        let (_client_rx, client_tx) = tokio::io::split(client);

        let mut writer = FrameWriter::new(client_tx);
        let mut reader = FrameReader::new(server_rx);

        writer.send(Bytes::from_static(b"hello")).await.unwrap();
        writer.send(Bytes::from_static(b"")).await.unwrap();

        assert_eq!(&reader.recv().await.unwrap()[..], b"hello");
        assert!(reader.recv().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recv_on_closed_stream_is_eof() {
        let (client, server) = tokio::io::duplex(64);
        let (server_rx, _server_tx) = tokio::io::split(server);
        drop(client);

        let mut reader = FrameReader::new(server_rx);
        let err = reader.recv().await.unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_recv_mid_frame_eof_is_truncated() {
        use tokio::io::AsyncWriteExt;

        let (mut client, server) = tokio::io::duplex(64);
        let (server_rx, _server_tx) = tokio::io::split(server);

        // Header promises 8 bytes, only 2 arrive before the close.
        client.write_all(&[8, 0, 0, 0, 1, 2]).await.unwrap();
        client.shutdown().await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server_rx);
        let err = reader.recv().await.unwrap_err();
        assert!(matches!(err, CodecError::TruncatedFrame { buffered: 6 }));
    }
}
