//! Thin-client protocol version definitions.
//!
//! Every connection negotiates exactly one protocol version during the
//! handshake and keeps it for the connection's lifetime. The known versions
//! form a totally ordered set; each revision only ever *adds* wire fields on
//! top of the previous one (with the 2.1.0 legacy handshake as the sole
//! exception, see [`crate::handshake`]).

use core::fmt;

/// Thin-client protocol version.
///
/// A `(major, minor, maintenance)` triple with lexicographic total order.
/// The derived `Ord` relies on the field declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    major: u16,
    minor: u16,
    maintenance: u16,
}

impl ProtocolVersion {
    /// Version 2.1.0: base handshake (join/order/collocated/replicated/auto-close flags only).
    pub const V2_1_0: Self = Self::new(2, 1, 0);

    /// Version 2.1.5: added the `lazy` flag.
    pub const V2_1_5: Self = Self::new(2, 1, 5);

    /// Version 2.3.0: protocol bump only, same handshake shape as 2.1.5.
    pub const V2_3_0: Self = Self::new(2, 3, 0);

    /// Version 2.4.0: protocol bump only.
    pub const V2_4_0: Self = Self::new(2, 4, 0);

    /// Version 2.5.0: added authentication fields (username/password).
    pub const V2_5_0: Self = Self::new(2, 5, 0);

    /// Version 2.7.0: added the `nested_tx_mode` string.
    pub const V2_7_0: Self = Self::new(2, 7, 0);

    /// Version 2.8.0: added the nullable data-page-scan byte; the accept
    /// payload gains the server node id.
    pub const V2_8_0: Self = Self::new(2, 8, 0);

    /// The version the client always proposes first.
    pub const CURRENT: Self = Self::V2_8_0;

    /// Versions the client is willing to fall back to after a rejection,
    /// newest first.
    ///
    /// Membership is checked by *exact equality*: an advertised version that
    /// is not in this table is never auto-negotiated, even if it sits
    /// numerically between known versions, because wire compatibility with it
    /// was never validated. Version 2.1.0 is deliberately absent; it is
    /// reachable only through the legacy handshake.
    pub const FALLBACK_CHAIN: [Self; 5] = [
        Self::V2_7_0,
        Self::V2_5_0,
        Self::V2_4_0,
        Self::V2_3_0,
        Self::V2_1_5,
    ];

    /// Create a version from its parts.
    #[must_use]
    pub const fn new(major: u16, minor: u16, maintenance: u16) -> Self {
        Self {
            major,
            minor,
            maintenance,
        }
    }

    /// Major component.
    #[must_use]
    pub const fn major(self) -> u16 {
        self.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(self) -> u16 {
        self.minor
    }

    /// Maintenance component.
    #[must_use]
    pub const fn maintenance(self) -> u16 {
        self.maintenance
    }

    /// Const-friendly `self >= other` under the lexicographic order.
    ///
    /// Used by the capability predicates, which are `const fn`.
    #[must_use]
    pub const fn at_least(self, other: Self) -> bool {
        if self.major != other.major {
            return self.major > other.major;
        }
        if self.minor != other.minor {
            return self.minor > other.minor;
        }
        self.maintenance >= other.maintenance
    }

    /// Whether this version is an acceptable fallback target.
    #[must_use]
    pub fn is_fallback_candidate(self) -> bool {
        Self::FALLBACK_CHAIN.contains(&self)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.maintenance)
    }
}
