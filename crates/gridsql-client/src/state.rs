//! Connection lifecycle states.

use core::fmt;

/// Lifecycle state of a connection.
///
/// ```text
/// Disconnected -> Handshaking (transport stream handed over)
/// Handshaking  -> Ready       (negotiation succeeded)
/// Ready        -> Closed      (close(); terminal, idempotent)
/// ```
///
/// `Disconnected` and `Handshaking` are the phases
/// [`Connection::connect`](crate::Connection::connect) passes through before
/// a connection value exists; a constructed connection is observed as `Ready`
/// or `Closed`. A closed connection rejects every further send and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport stream yet.
    Disconnected,
    /// Version negotiation in progress.
    Handshaking,
    /// Negotiation complete; the negotiated version is fixed for the
    /// connection's lifetime.
    Ready,
    /// Terminal; the byte stream has been released.
    Closed,
}

impl ConnectionState {
    /// Whether requests may be dispatched in this state.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether this is the terminal state.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Handshaking => "handshaking",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
