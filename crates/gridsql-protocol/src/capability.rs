//! Capability matrix derived from a negotiated protocol version.
//!
//! Optional behaviors are pure functions of the negotiated version. Callers
//! must consult the matrix instead of assuming support; the dispatcher and
//! the handshake writer both gate on it.

use crate::version::ProtocolVersion;

/// Feature gates computed from the negotiated protocol version.
///
/// Created once per connection after the handshake completes and immutable
/// thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    version: ProtocolVersion,
}

impl Capabilities {
    /// Derive the capability matrix for a negotiated version.
    #[must_use]
    pub const fn for_version(version: ProtocolVersion) -> Self {
        Self { version }
    }

    /// The version this matrix was derived from.
    #[must_use]
    pub const fn version(self) -> ProtocolVersion {
        self.version
    }

    /// Whether username/password fields can be carried in the handshake.
    #[must_use]
    pub const fn supports_authentication(self) -> bool {
        self.version.at_least(ProtocolVersion::V2_5_0)
    }

    /// Whether the fire-and-forget streaming send path is available.
    #[must_use]
    pub const fn supports_unordered_stream(self) -> bool {
        self.version.at_least(ProtocolVersion::V2_5_0)
    }

    /// Whether in-flight queries can be cancelled out of band.
    #[must_use]
    pub const fn supports_query_cancellation(self) -> bool {
        self.version.at_least(ProtocolVersion::V2_8_0)
    }

    /// Whether the server reports partition affinity information.
    #[must_use]
    pub const fn supports_affinity_awareness(self) -> bool {
        self.version.at_least(ProtocolVersion::V2_8_0)
    }

    /// Whether the handshake carries the `lazy` and `skip_reducer_on_update`
    /// flags.
    #[must_use]
    pub const fn supports_lazy_flag(self) -> bool {
        self.version.at_least(ProtocolVersion::V2_1_5)
    }

    /// Whether the handshake carries the nested-transaction mode string.
    #[must_use]
    pub const fn supports_nested_tx_mode(self) -> bool {
        self.version.at_least(ProtocolVersion::V2_7_0)
    }

    /// Whether the handshake carries the data-page-scan tri-state byte.
    #[must_use]
    pub const fn supports_data_page_scan(self) -> bool {
        self.version.at_least(ProtocolVersion::V2_8_0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_and_streaming_gate_at_2_5_0() {
        let old = Capabilities::for_version(ProtocolVersion::V2_4_0);
        assert!(!old.supports_authentication());
        assert!(!old.supports_unordered_stream());

        let new = Capabilities::for_version(ProtocolVersion::V2_5_0);
        assert!(new.supports_authentication());
        assert!(new.supports_unordered_stream());
    }

    #[test]
    fn test_cancellation_and_affinity_gate_at_2_8_0() {
        let old = Capabilities::for_version(ProtocolVersion::V2_7_0);
        assert!(!old.supports_query_cancellation());
        assert!(!old.supports_affinity_awareness());
        assert!(!old.supports_data_page_scan());

        let new = Capabilities::for_version(ProtocolVersion::V2_8_0);
        assert!(new.supports_query_cancellation());
        assert!(new.supports_affinity_awareness());
        assert!(new.supports_data_page_scan());
    }

    #[test]
    fn test_wire_gates_for_older_handshakes() {
        let base = Capabilities::for_version(ProtocolVersion::V2_1_0);
        assert!(!base.supports_lazy_flag());
        assert!(!base.supports_nested_tx_mode());

        assert!(Capabilities::for_version(ProtocolVersion::V2_1_5).supports_lazy_flag());
        assert!(Capabilities::for_version(ProtocolVersion::V2_7_0).supports_nested_tx_mode());
    }
}
