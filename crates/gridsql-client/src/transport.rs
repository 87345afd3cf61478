//! Plain TCP transport helper.
//!
//! Establishing the byte stream is a collaborator concern, not part of the
//! protocol core: [`Connection::connect`](crate::Connection::connect) accepts
//! any `AsyncRead + AsyncWrite` transport. This helper covers the common
//! case of a plain TCP stream with a connect timeout. TLS and endpoint
//! selection belong to the layers above.

use std::io;
use std::time::Duration;

use tokio::net::{TcpStream, ToSocketAddrs};

/// Open a TCP stream suitable for a thin-client connection.
///
/// Applies `connect_timeout` to connection establishment and disables
/// Nagle's algorithm: the framer flushes once per logical message and
/// expects it to leave promptly. Read/write timeouts, if desired, should
/// wrap the individual operations on the returned stream.
pub async fn connect_tcp(addr: impl ToSocketAddrs, connect_timeout: Duration) -> io::Result<TcpStream> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TCP connect timed out"))??;

    stream.set_nodelay(true)?;

    Ok(stream)
}
