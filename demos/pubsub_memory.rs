//! Publish/subscribe example using the in-memory broker.
//!
//! Demonstrates publisher and subscriber roles sharing a single connector
//! in one process. This is useful for tests, simulations, and
//! single-process applications.
//!
//! Run with: cargo run --example pubsub_memory

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
        .with_line_number(true)
        .init();

    let connector = ConnectorBuilder::new().connector_id("demo-memory").build().await?;
    connector.connect().await?;

    let subscriber = connector
        .create_subscriber(SubscriberOptions::channels([
            "sensor/temperature",
            "sensor/humidity",
        ]))
        .await?;

    // The handler signals the main task once per delivery so we know when
    // every published reading has been seen.
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
    subscriber.on_message(Arc::new(move |message| {
        // ---
        let reading: serde_json::Value =
            serde_json::from_slice(&message.payload).expect("payload is not JSON");
        println!(
            "{}: {} {}",
            message.channel, reading["value"], reading["unit"]
        );
        let _ = seen_tx.send(());
    }));

    let publisher = connector.create_publisher(PublisherOptions::default()).await?;

    let temperature = json!({ "value": 22.5, "unit": "C" });
    publisher
        .publish(
            &"sensor/temperature".into(),
            Bytes::from(temperature.to_string()),
        )
        .await?;

    let humidity = json!({ "value": 48.0, "unit": "%" });
    publisher
        .publish(&"sensor/humidity".into(), Bytes::from(humidity.to_string()))
        .await?;

    for _ in 0..2 {
        seen_rx.recv().await.expect("delivery channel closed");
    }

    // Clean shutdown
    subscriber.close().await?;
    publisher.close().await?;
    connector.disconnect().await?;
    Ok(())
}
