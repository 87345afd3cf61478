//! Handshake negotiation against the scripted mock server.

#![allow(clippy::unwrap_used)]

use gridsql_client::{Connection, ConnectionConfig, Error};
use gridsql_protocol::{ProductVersion, ProtocolVersion};
use gridsql_testing::{HandshakePolicy, MockGridServer};
use tokio::net::TcpStream;
use uuid::Uuid;

async fn connect(
    server: &MockGridServer,
    config: ConnectionConfig,
) -> Result<Connection<TcpStream>, Error> {
    let stream = TcpStream::connect(server.addr()).await.unwrap();
    Connection::connect(stream, config).await
}

#[tokio::test]
async fn accepts_current_version_with_full_identity() {
    let node_id = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
    let identity = ProductVersion {
        major: 2,
        minor: 8,
        maintenance: 0,
        stage: "1.0.0#20200101-sha".to_owned(),
        build_timestamp: 1_577_836_800_000,
        revision_hash: Some(vec![0xAB, 0xCD]),
    };

    let server = MockGridServer::builder()
        .identity(identity.clone())
        .node_id(node_id)
        .start()
        .await
        .unwrap();

    let conn = connect(&server, ConnectionConfig::new()).await.unwrap();

    assert_eq!(conn.negotiated_version(), ProtocolVersion::V2_8_0);
    assert_eq!(conn.server_version(), &identity);
    assert_eq!(conn.node_id(), Some(node_id));
    assert_eq!(server.handshake_count(), 1);
}

#[tokio::test]
async fn falls_back_to_advertised_version_in_two_round_trips() {
    let server = MockGridServer::builder()
        .policy(HandshakePolicy::AcceptUpTo(ProtocolVersion::V2_5_0))
        .start()
        .await
        .unwrap();

    let conn = connect(&server, ConnectionConfig::new()).await.unwrap();

    assert_eq!(conn.negotiated_version(), ProtocolVersion::V2_5_0);
    assert_eq!(server.handshake_count(), 2);

    let caps = conn.capabilities();
    assert!(caps.supports_authentication());
    assert!(caps.supports_unordered_stream());
    assert!(!caps.supports_query_cancellation());
    assert!(!caps.supports_affinity_awareness());
}

#[tokio::test]
async fn walks_the_chain_to_the_oldest_regular_version() {
    let server = MockGridServer::builder()
        .policy(HandshakePolicy::AcceptUpTo(ProtocolVersion::V2_1_5))
        .start()
        .await
        .unwrap();

    let conn = connect(&server, ConnectionConfig::new()).await.unwrap();

    assert_eq!(conn.negotiated_version(), ProtocolVersion::V2_1_5);
    assert_eq!(server.handshake_count(), 2);
    assert!(!conn.capabilities().supports_unordered_stream());
}

#[tokio::test]
async fn unknown_advertised_version_fails_after_one_round_trip() {
    let server = MockGridServer::builder()
        .policy(HandshakePolicy::AlwaysReject(ProtocolVersion::new(2, 6, 0)))
        .start()
        .await
        .unwrap();

    let err = connect(&server, ConnectionConfig::new()).await.unwrap_err();

    assert!(
        matches!(
            &err,
            Error::HandshakeRejected { server, .. } if *server == ProtocolVersion::new(2, 6, 0)
        ),
        "unexpected error: {err}"
    );
    assert!(err.is_handshake_failure());
    assert_eq!(server.handshake_count(), 1);
}

#[tokio::test]
async fn credentials_against_pre_auth_server_fail_without_retry() {
    let server = MockGridServer::builder()
        .policy(HandshakePolicy::AlwaysReject(ProtocolVersion::V2_4_0))
        .start()
        .await
        .unwrap();

    let config = ConnectionConfig::new().credentials("grid", "s3cret");
    let err = connect(&server, config).await.unwrap_err();

    assert!(
        matches!(
            &err,
            Error::AuthenticationUnsupported { server, .. } if *server == ProtocolVersion::V2_4_0
        ),
        "unexpected error: {err}"
    );
    assert_eq!(server.handshake_count(), 1);
}

#[tokio::test]
async fn credentials_at_supported_version_negotiate_normally() {
    let server = MockGridServer::builder()
        .policy(HandshakePolicy::AcceptUpTo(ProtocolVersion::V2_5_0))
        .start()
        .await
        .unwrap();

    let config = ConnectionConfig::new().credentials("grid", "s3cret");
    let conn = connect(&server, config).await.unwrap();

    assert_eq!(conn.negotiated_version(), ProtocolVersion::V2_5_0);
}

#[tokio::test]
async fn legacy_server_is_reached_through_compatibility_handshake() {
    let server = MockGridServer::builder()
        .policy(HandshakePolicy::AcceptUpTo(ProtocolVersion::V2_1_0))
        .start()
        .await
        .unwrap();

    let conn = connect(&server, ConnectionConfig::new()).await.unwrap();

    assert_eq!(conn.negotiated_version(), ProtocolVersion::V2_1_0);
    assert_eq!(conn.server_version(), &ProductVersion::unknown(2, 1, 0));
    assert_eq!(conn.node_id(), None);
    assert_eq!(server.handshake_count(), 2);
}

#[tokio::test]
async fn legacy_rejection_is_terminal() {
    let server = MockGridServer::builder()
        .policy(HandshakePolicy::AlwaysReject(ProtocolVersion::V2_1_0))
        .start()
        .await
        .unwrap();

    let err = connect(&server, ConnectionConfig::new()).await.unwrap_err();

    assert!(matches!(err, Error::HandshakeRejected { .. }));
    // One regular attempt, one legacy attempt, nothing further.
    assert_eq!(server.handshake_count(), 2);
}
