//! Connect to a GridSQL node, run one statement, and print the outcome.
//!
//! Run against a local node:
//!
//! ```text
//! cargo run --example basic -- 127.0.0.1:10800
//! ```

use std::time::Duration;

use gridsql_client::{connect_tcp, Connection, ConnectionConfig, Request};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:10800".to_owned());

    let stream = connect_tcp(addr.as_str(), Duration::from_secs(10)).await?;
    let conn = Connection::connect(stream, ConnectionConfig::new().lazy(true)).await?;

    println!(
        "connected: protocol {}, server {}",
        conn.negotiated_version(),
        conn.server_version()
    );

    let caps = conn.capabilities();
    println!(
        "capabilities: streaming={}, cancellation={}, affinity={}",
        caps.supports_unordered_stream(),
        caps.supports_query_cancellation(),
        caps.supports_affinity_awareness()
    );

    let request = Request::execute(Some("PUBLIC".to_owned()), "SELECT 1", 1024, 0, true);
    let response = conn.send(&request, None).await?;

    match response.error() {
        None => println!("statement ok, {} payload bytes", response.payload().len()),
        Some(err) => println!("statement failed ({}): {err}", response.status()),
    }

    conn.close().await;
    Ok(())
}
