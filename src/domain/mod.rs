//! Domain layer public interface.
//!
//! This module defines the provider-agnostic pub/sub contracts that are
//! independent of any concrete backend, protocol, or client library.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod handle;
mod pubsub;

// --- Pub/sub domain re-exports ---

pub use handle::{
    //
    HandleId,
    HandlePtr,
    Inbox,
    TransportHandle,
};

pub use pubsub::{
    //
    Channel,
    ConnectorPtr,
    Message,
    MessageHandler,
    PubSubConnector,
    Publisher,
    PublisherOptions,
    PublisherPtr,
    Subscriber,
    SubscriberOptions,
    SubscriberPtr,
};
