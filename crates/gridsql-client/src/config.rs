//! Connection configuration.

use gridsql_protocol::{HandshakeRequest, ProtocolVersion};

/// Read-only bag of negotiation-affecting connection flags.
///
/// The configuration is captured when the connection is established; the
/// negotiator re-reads it for every fallback attempt, so one config value
/// describes the connection for its whole lifetime.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    distributed_joins: bool,
    enforce_join_order: bool,
    collocated: bool,
    replicated_only: bool,
    auto_close_server_cursor: bool,
    lazy: bool,
    skip_reducer_on_update: bool,
    nested_tx_mode: String,
    data_page_scan: Option<bool>,
    username: Option<String>,
    password: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            distributed_joins: false,
            enforce_join_order: false,
            collocated: false,
            replicated_only: false,
            auto_close_server_cursor: false,
            lazy: false,
            skip_reducer_on_update: false,
            nested_tx_mode: "ERROR".to_owned(),
            data_page_scan: None,
            username: None,
            password: None,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow joins spanning multiple nodes.
    #[must_use]
    pub fn distributed_joins(mut self, enabled: bool) -> Self {
        self.distributed_joins = enabled;
        self
    }

    /// Do not reorder tables in joins.
    #[must_use]
    pub fn enforce_join_order(mut self, enabled: bool) -> Self {
        self.enforce_join_order = enabled;
        self
    }

    /// Assume collocated data for joins.
    #[must_use]
    pub fn collocated(mut self, enabled: bool) -> Self {
        self.collocated = enabled;
        self
    }

    /// Restrict queries to replicated tables.
    #[must_use]
    pub fn replicated_only(mut self, enabled: bool) -> Self {
        self.replicated_only = enabled;
        self
    }

    /// Close server-side cursors automatically on the last fetched page.
    #[must_use]
    pub fn auto_close_server_cursor(mut self, enabled: bool) -> Self {
        self.auto_close_server_cursor = enabled;
        self
    }

    /// Lazy result-set materialization on the server.
    #[must_use]
    pub fn lazy(mut self, enabled: bool) -> Self {
        self.lazy = enabled;
        self
    }

    /// Skip the reducer stage for update statements.
    #[must_use]
    pub fn skip_reducer_on_update(mut self, enabled: bool) -> Self {
        self.skip_reducer_on_update = enabled;
        self
    }

    /// Nested-transaction handling mode.
    #[must_use]
    pub fn nested_tx_mode(mut self, mode: impl Into<String>) -> Self {
        self.nested_tx_mode = mode.into();
        self
    }

    /// Data-page-scan hint; `None` leaves the decision to the server.
    #[must_use]
    pub fn data_page_scan(mut self, enabled: Option<bool>) -> Self {
        self.data_page_scan = enabled;
        self
    }

    /// Credentials for servers that require authentication.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Whether a non-empty username is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        matches!(&self.username, Some(user) if !user.is_empty())
    }

    /// Build the handshake request proposing `version`.
    #[must_use]
    pub fn handshake_request(&self, version: ProtocolVersion) -> HandshakeRequest {
        HandshakeRequest {
            version,
            distributed_joins: self.distributed_joins,
            enforce_join_order: self.enforce_join_order,
            collocated: self.collocated,
            replicated_only: self.replicated_only,
            auto_close_server_cursor: self.auto_close_server_cursor,
            lazy: self.lazy,
            skip_reducer_on_update: self.skip_reducer_on_update,
            nested_tx_mode: self.nested_tx_mode.clone(),
            data_page_scan: self.data_page_scan,
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_no_credentials() {
        let config = ConnectionConfig::new();
        assert!(!config.has_credentials());
        assert!(!config.handshake_request(ProtocolVersion::CURRENT).has_credentials());
    }

    #[test]
    fn test_builder_flags_flow_into_request() {
        let config = ConnectionConfig::new()
            .distributed_joins(true)
            .lazy(true)
            .nested_tx_mode("COMMIT")
            .data_page_scan(Some(false))
            .credentials("grid", "s3cret");

        let req = config.handshake_request(ProtocolVersion::CURRENT);
        assert!(req.distributed_joins);
        assert!(req.lazy);
        assert_eq!(req.nested_tx_mode, "COMMIT");
        assert_eq!(req.data_page_scan, Some(false));
        assert!(req.has_credentials());
    }

    #[test]
    fn test_empty_username_is_anonymous() {
        let config = ConnectionConfig::new().credentials("", "ignored");
        assert!(!config.has_credentials());
    }
}
