//! Wildcard subscription example using the in-memory broker.
//!
//! One subscriber watches `sensor/*` and receives every sensor reading
//! without naming the concrete channels up front. A second connector is
//! built with wildcard support disabled to show the capability check
//! rejecting pattern channels.
//!
//! Run with: cargo run --example pubsub_wildcard

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

    let connector = ConnectorBuilder::new().connector_id("demo-wildcard").build().await?;
    connector.connect().await?;

    let subscriber = connector
        .create_subscriber(SubscriberOptions::channels(["sensor/*"]))
        .await?;

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

    for (channel, reading) in [
        ("sensor/temperature", json!({ "value": 22.5, "unit": "C" })),
        ("sensor/humidity", json!({ "value": 48.0, "unit": "%" })),
        ("sensor/pressure", json!({ "value": 101.3, "unit": "kPa" })),
    ] {
        publisher
            .publish(&channel.into(), Bytes::from(reading.to_string()))
            .await?;
    }

    // This channel does not match sensor/* and is never delivered here.
    publisher
        .publish(
            &"audit/event".into(),
            Bytes::from(json!({ "value": "login", "unit": "-" }).to_string()),
        )
        .await?;

    for _ in 0..3 {
        seen_rx.recv().await.expect("delivery channel closed");
    }

    // A connector built without wildcard support rejects pattern channels
    // before any subscription state exists.
    let exact_only = ConnectorBuilder::new()
        .connector_id("demo-exact-only")
        .wildcard(false)
        .build()
        .await?;
    exact_only.connect().await?;

    match exact_only
        .create_subscriber(SubscriberOptions::channels(["sensor/*"]))
        .await
    {
        Ok(_) => println!("unexpected: pattern channel accepted"),
        Err(err) => println!("pattern rejected as expected: {err}"),
    }

    // Clean shutdown
    exact_only.disconnect().await?;
    subscriber.close().await?;
    publisher.close().await?;
    connector.disconnect().await?;
    Ok(())
}
