// src/domain/pubsub.rs

//! Pub/sub domain abstractions.
//!
//! This module defines the three capability roles of the pub/sub contract:
//! a [`PubSubConnector`] owns the backend session and hands out
//! [`Publisher`]s and [`Subscriber`]s, each backed by its own dedicated
//! transport handle. The roles are expressed as object-safe traits so that
//! every backend can provide conforming implementations without sharing a
//! base type.
//!
//! The contract intentionally avoids any reference to concrete brokers or
//! client libraries. Delivery guarantees are best-effort: no cross-channel
//! ordering, no persistence, no replay. Backends may offer more, but the
//! abstraction does not promise it.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::Result;

/// A channel name or, where the backend supports wildcards, a channel
/// pattern.
///
/// Channels are opaque identifiers: equality is exact string match. A name
/// containing `*`, `?`, or `[` is treated as a pattern and may match
/// multiple concrete channels, but only on connectors whose
/// [`supports_wildcard`](PubSubConnector::supports_wildcard) is `true`.
///
/// Channels are immutable, cheap to clone, and safe to share across
/// threads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Channel(pub Arc<str>);

impl Channel {
    /// The channel name as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name is a pattern rather than an exact channel.
    ///
    /// Pattern syntax is glob-style: `*` (any sequence), `?` (one
    /// character), `[...]` (character class).
    pub fn is_pattern(&self) -> bool {
        self.0.contains(['*', '?', '['])
    }
}

impl<T> From<T> for Channel
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        Channel(value.into())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One delivered message: an opaque payload and the concrete channel it was
/// published to.
///
/// For pattern subscriptions the channel is always the concrete publish
/// channel, never the pattern that matched it.
#[derive(Clone, Debug)]
pub struct Message {
    /// Channel the message was published to.
    pub channel: Channel,
    /// Opaque payload bytes. The core never interprets them.
    pub payload: Bytes,
}

impl Message {
    /// Create a message.
    pub fn new(channel: impl Into<Channel>, payload: impl Into<Bytes>) -> Self {
        // ---
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Caller-supplied message callback.
///
/// Handlers are invoked synchronously inside the subscriber's delivery
/// dispatch, once per message, in registration order. A slow handler delays
/// delivery of subsequent messages on the same subscriber, so long-running
/// work should be handed off to a task.
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// Options for [`PubSubConnector::create_publisher`].
///
/// Reserved for backend-specific tuning; the core contract ignores its
/// contents.
#[derive(Clone, Copy, Debug, Default)]
pub struct PublisherOptions;

/// Options for [`PubSubConnector::create_subscriber`].
#[derive(Clone, Debug, Default)]
pub struct SubscriberOptions {
    /// Channels this subscriber receives. Fixed at creation, must be
    /// non-empty, and cannot be altered afterwards.
    pub channels: Vec<Channel>,
}

impl SubscriberOptions {
    /// Options for a subscriber over the given channels.
    pub fn channels<I>(channels: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Channel>,
    {
        // ---
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Entry point of the pub/sub contract.
///
/// A connector owns the primary backend session, tracks every transport
/// handle it hands out, and releases them all on [`disconnect`]. Publishers
/// and subscribers never share a handle: each one is backed by a dedicated
/// connection duplicated from the primary session, so closing one can never
/// disrupt another's subscription.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show
/// explicit lifetimes and a boxed `Future`. This is an implementation
/// detail — consumers should treat methods as normal `async fn`s.
///
/// [`disconnect`]: PubSubConnector::disconnect
#[async_trait::async_trait]
pub trait PubSubConnector: Send + Sync {
    // ---
    /// Identifier of this connector instance, used for logging.
    fn connector_id(&self) -> &str;

    /// Establish the primary session. Must complete before any
    /// publish/subscribe activity; operations issued earlier fail with
    /// [`NotConnected`](crate::PubSubError::NotConnected).
    async fn connect(&self) -> Result<()>;

    /// Release every tracked handle, including handles held by still-open
    /// publishers and subscribers, then close the primary session.
    ///
    /// Safe to call when some handles were already individually released.
    /// A genuine transport failure during teardown is reported after all
    /// handles have been untracked.
    async fn disconnect(&self) -> Result<()>;

    /// Whether pattern channels are honored for subscription matching.
    ///
    /// Pure capability query with no side effects. The core never emulates
    /// pattern matching over a backend lacking it.
    fn supports_wildcard(&self) -> bool;

    /// Acquire a dedicated transport handle and wrap it in a publisher.
    async fn create_publisher(&self, options: PublisherOptions) -> Result<PublisherPtr>;

    /// Acquire a dedicated transport handle, subscribe it to
    /// `options.channels`, and wrap it in a subscriber.
    ///
    /// Fails with [`Subscription`](crate::PubSubError::Subscription) if the
    /// channel set is empty or the backend rejects any channel, and with
    /// [`UnsupportedCapability`](crate::PubSubError::UnsupportedCapability)
    /// if a pattern channel is requested while [`supports_wildcard`] is
    /// false; in that case no handle is acquired at all.
    ///
    /// [`supports_wildcard`]: PubSubConnector::supports_wildcard
    async fn create_subscriber(&self, options: SubscriberOptions) -> Result<SubscriberPtr>;
}

/// Sends messages to arbitrary channels over one dedicated handle.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    // ---
    /// Publish `payload` to `channel`.
    ///
    /// Resolves once the backend has accepted the message for delivery,
    /// not once subscribers have received it. No retry on failure; a
    /// transport error surfaces as
    /// [`Publish`](crate::PubSubError::Publish).
    async fn publish(&self, channel: &Channel, payload: Bytes) -> Result<()>;

    /// Release the underlying handle. Idempotent.
    ///
    /// An unclosed publisher's handle is still released by
    /// [`PubSubConnector::disconnect`].
    async fn close(&self) -> Result<()>;
}

/// Receives messages for a fixed channel set over one dedicated handle.
#[async_trait::async_trait]
pub trait Subscriber: Send + Sync {
    // ---
    /// The channels this subscriber was created with.
    fn channels(&self) -> &[Channel];

    /// Register a handler invoked once per received message.
    ///
    /// Every registered handler is invoked for every message (fan-out), in
    /// registration order. There is no unregistration except [`close`].
    ///
    /// [`close`]: Subscriber::close
    fn on_message(&self, handler: MessageHandler);

    /// Whether [`close`](Subscriber::close) has completed or is in
    /// progress.
    fn is_closed(&self) -> bool;

    /// Unsubscribe from all bound channels and release the handle.
    ///
    /// Once `close()` resolves, no handler is invoked for any message
    /// published afterwards. Messages already in flight at close time may
    /// still be delivered while the teardown drains. Idempotent: a second
    /// call is a no-op and never double-releases the handle.
    async fn close(&self) -> Result<()>;
}

/// Shared connector pointer.
///
/// This is an `Arc<dyn PubSubConnector>`, which means:
/// - `.clone()` is cheap (only increments a reference count)
/// - Multiple clones share the same session and handle pool
/// - Used to erase concrete backends behind a stable domain interface.
pub type ConnectorPtr = Arc<dyn PubSubConnector>;

/// Shared publisher pointer.
pub type PublisherPtr = Arc<dyn Publisher>;

/// Shared subscriber pointer.
pub type SubscriberPtr = Arc<dyn Subscriber>;

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names_are_not_patterns() {
        // ---
        assert!(!Channel::from("orders").is_pattern());
        assert!(!Channel::from("orders/created").is_pattern());
        assert!(!Channel::from("{braced}").is_pattern());
    }

    #[test]
    fn glob_metacharacters_mark_patterns() {
        // ---
        assert!(Channel::from("orders/*").is_pattern());
        assert!(Channel::from("order-?").is_pattern());
        assert!(Channel::from("order-[0-9]").is_pattern());
    }

    #[test]
    fn channel_displays_its_name() {
        // ---
        let channel = Channel::from("sensors/temp");
        assert_eq!(channel.to_string(), "sensors/temp");
        assert_eq!(channel.as_str(), "sensors/temp");
    }

    #[test]
    fn subscriber_options_collects_channels() {
        // ---
        let options = SubscriberOptions::channels(["a", "b"]);
        assert_eq!(options.channels.len(), 2);
        assert_eq!(options.channels[0], Channel::from("a"));
    }
}
