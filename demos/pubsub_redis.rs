//! Publish/subscribe example over a Redis broker.
//!
//! Demonstrates the same connector API as the in-memory examples running
//! against a real broker. Exact channels map to Redis `SUBSCRIBE` and
//! pattern channels to `PSUBSCRIBE`.
//!
//! Run with: cargo run --example pubsub_redis --features backend_redis
//!
//! Requires:
//! - A Redis server (default redis://127.0.0.1:6379, override with REDIS_URL)

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::panic_in_result_fn
)]

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use mom_pubsub::{
    // ---
    ConnectorBuilder,
    PublisherOptions,
    Result,
    SubscriberOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_ansi(false)
        .with_line_number(true)
        .init();

    let redis_uri =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    let connector = ConnectorBuilder::new()
        .uri(redis_uri)
        .connector_id("demo-redis")
        .build()
        .await?;
    connector.connect().await?;

    let subscriber = connector
        .create_subscriber(SubscriberOptions::channels(["jobs/*"]))
        .await?;

    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
    subscriber.on_message(Arc::new(move |message| {
        // ---
        let event: serde_json::Value =
            serde_json::from_slice(&message.payload).expect("payload is not JSON");
        println!("{}: {}", message.channel, event["status"]);
        let _ = seen_tx.send(());
    }));

    let publisher = connector.create_publisher(PublisherOptions::default()).await?;

    for (channel, status) in [
        ("jobs/build-17", "started"),
        ("jobs/build-17", "finished"),
        ("jobs/deploy-4", "started"),
    ] {
        publisher
            .publish(
                &channel.into(),
                Bytes::from(json!({ "status": status }).to_string()),
            )
            .await?;
    }

    for _ in 0..3 {
        seen_rx.recv().await.expect("delivery channel closed");
    }

    // Clean shutdown
    subscriber.close().await?;
    publisher.close().await?;
    connector.disconnect().await?;
    Ok(())
}
