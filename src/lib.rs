//! Provider-agnostic publish/subscribe messaging over swappable backends.
//!
//! This library separates pub/sub semantics from broker specifics. A
//! [`PubSubConnector`] owns one primary backend session and hands out
//! [`Publisher`]s and [`Subscriber`]s, each backed by a dedicated
//! connection duplicated from the primary, tracked in a shared pool, and
//! released either individually via `close()` or in bulk via
//! `disconnect()`.
//!
//! Two backends ship with the crate:
//!
//! - an in-memory broker (always available) that defines the reference
//!   delivery semantics and supports isolated parallel testing
//! - Redis Pub/Sub (feature `backend_redis`)
//!
//! Delivery is best-effort and non-durable: no persistence, no replay, no
//! cross-channel ordering. Pattern channels (`*`, `?`, `[...]`) are
//! honored where the connector reports wildcard support.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use mom_pubsub::{ConnectorBuilder, Message, PublisherOptions, SubscriberOptions};
//!
//! # async fn example() -> mom_pubsub::Result<()> {
//! let connector = ConnectorBuilder::new()
//!     .connector_id("worker-7")
//!     .build()
//!     .await?;
//!
//! connector.connect().await?;
//!
//! let subscriber = connector
//!     .create_subscriber(SubscriberOptions::channels(["jobs/*"]))
//!     .await?;
//! subscriber.on_message(Arc::new(|message: Message| {
//!     println!("{}: {} byte(s)", message.channel, message.payload.len());
//! }));
//!
//! let publisher = connector.create_publisher(PublisherOptions::default()).await?;
//! publisher
//!     .publish(&"jobs/started".into(), Bytes::from("build #1"))
//!     .await?;
//!
//! publisher.close().await?;
//! subscriber.close().await?;
//! connector.disconnect().await?;
//! # Ok(())
//! # }
//! ```

// Import all sub modules once...
mod backend;
mod config;
mod connector;
mod connector_builder;
mod domain;
mod error;
mod macros;
mod pool;
mod publisher;
mod subscriber;

pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use config::{ConnectorConfig, DEFAULT_INBOX_CAPACITY};
pub use connector::PooledConnector;
pub use connector_builder::ConnectorBuilder;
pub use error::{PubSubError, Result};

pub use backend::{
    //
    create_memory_connector,
    create_memory_connector_with_broker,
    create_redis_connector,
    MemoryBroker,
};

// --- public re-exports
pub use domain::{
    //
    Channel,
    ConnectorPtr,
    HandleId,
    HandlePtr,
    Inbox,
    Message,
    MessageHandler,
    PubSubConnector,
    Publisher,
    PublisherOptions,
    PublisherPtr,
    Subscriber,
    SubscriberOptions,
    SubscriberPtr,
    TransportHandle,
};
