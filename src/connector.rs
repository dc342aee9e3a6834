// src/connector.rs

//! Pooled connector.
//!
//! [`PooledConnector`] is the one implementation of the
//! [`PubSubConnector`] role shared by every backend: backends supply a
//! primary [`TransportHandle`](crate::TransportHandle) and the connector
//! provides the lifecycle around it: duplicating the primary session for
//! each publisher/subscriber, tracking every handle in the
//! [`ConnectionPool`], gating operations on the connected flag, and
//! negotiating the wildcard capability.
//!
//! ## Handle acquisition
//!
//! Publishers and subscribers never share a connection with each other or
//! with the primary session: every `create_*` call duplicates the primary
//! handle, so publish traffic cannot contend with subscribe traffic on the
//! same physical connection, and closing one role object cannot disrupt
//! another's subscription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pool::ConnectionPool;
use crate::publisher::PooledPublisher;
use crate::subscriber::PooledSubscriber;
use crate::{
    // ---
    log_debug,
    log_info,
    log_warn,
    HandlePtr,
    PubSubConnector,
    PubSubError,
    Publisher,
    PublisherOptions,
    PublisherPtr,
    Result,
    SubscriberOptions,
    SubscriberPtr,
};

/// Backend-independent connector over a primary transport handle.
///
/// Built by the backend factories (`create_memory_connector`,
/// `create_redis_connector`); also usable directly with any other
/// [`TransportHandle`](crate::TransportHandle) implementation.
pub struct PooledConnector {
    // ---
    connector_id: String,
    primary: HandlePtr,
    pool: Arc<ConnectionPool>,
    connected: AtomicBool,
    wildcard: bool,
}

impl PooledConnector {
    /// Create a connector over `primary`, not yet connected.
    ///
    /// The primary handle is tracked in the pool from the start so that
    /// `disconnect()` terminates it together with every acquired handle.
    /// `wildcard` declares whether pattern channels are honored; the
    /// connector never emulates matching the handle cannot provide.
    pub fn new(connector_id: impl Into<String>, primary: HandlePtr, wildcard: bool) -> Self {
        // ---
        let connector_id = connector_id.into();
        let pool = Arc::new(ConnectionPool::new(connector_id.clone()));
        pool.track(primary.clone());

        Self {
            connector_id,
            primary,
            pool,
            connected: AtomicBool::new(false),
            wildcard,
        }
    }

    /// Number of transport handles currently tracked, the primary
    /// included.
    pub fn tracked_handles(&self) -> usize {
        self.pool.len()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(PubSubError::NotConnected)
        }
    }

    /// Duplicate the primary session into a fresh handle and track it.
    async fn acquire(&self) -> Result<HandlePtr> {
        // ---
        let handle = self.primary.duplicate().await?;
        self.pool.track(handle.clone());
        log_debug!("{}: acquired handle {}", self.connector_id, handle.id());
        Ok(handle)
    }
}

#[async_trait::async_trait]
impl PubSubConnector for PooledConnector {
    // ---
    fn connector_id(&self) -> &str {
        &self.connector_id
    }

    async fn connect(&self) -> Result<()> {
        // ---
        self.primary.connect().await?;

        // Re-track in case an earlier disconnect() drained the pool.
        self.pool.track(self.primary.clone());
        self.connected.store(true, Ordering::Release);

        log_info!("{}: connected", self.connector_id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        // ---
        // Flip the flag first so publishes racing the teardown fail fast
        // instead of landing on a handle mid-termination.
        self.connected.store(false, Ordering::Release);

        log_info!(
            "{}: disconnecting, releasing {} handle(s)",
            self.connector_id,
            self.pool.len()
        );
        self.pool.drain().await
    }

    fn supports_wildcard(&self) -> bool {
        self.wildcard
    }

    async fn create_publisher(&self, _options: PublisherOptions) -> Result<PublisherPtr> {
        // ---
        self.ensure_connected()?;

        let handle = self.acquire().await?;
        let publisher = PooledPublisher::new(handle, Arc::clone(&self.pool));
        Ok(Arc::new(publisher) as Arc<dyn Publisher>)
    }

    async fn create_subscriber(&self, options: SubscriberOptions) -> Result<SubscriberPtr> {
        // ---
        self.ensure_connected()?;

        if options.channels.is_empty() {
            return Err(PubSubError::Subscription(
                "subscriber requires at least one channel".into(),
            ));
        }

        // Capability check runs before any handle is acquired: a rejected
        // pattern request must leave no pool entry behind.
        if !self.wildcard {
            if let Some(channel) = options.channels.iter().find(|c| c.is_pattern()) {
                return Err(PubSubError::UnsupportedCapability(format!(
                    "pattern channel {channel} requires wildcard support"
                )));
            }
        }

        let handle = self.acquire().await?;

        let inbox = match handle.subscribe(&options.channels).await {
            Ok(inbox) => inbox,
            Err(err) => {
                // The handle was acquired but never attached; putting it
                // back through the pool keeps the membership invariant.
                if let Err(_release_err) = self.pool.release(handle.id()).await {
                    log_warn!(
                        "{}: failed to release handle {} after subscribe rejection: {_release_err}",
                        self.connector_id,
                        handle.id()
                    );
                }
                return Err(err.into_subscription());
            }
        };

        Ok(PooledSubscriber::spawn(
            options.channels,
            handle,
            Arc::clone(&self.pool),
            inbox,
        ))
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, HandleId, Inbox, TransportHandle};
    use bytes::Bytes;
    use tokio::sync::mpsc;

    /// Handle stub that tracks an open/closed flag and spawns already-open
    /// duplicates, like a backend session would. Unsubscribes can be made
    /// to fail; duplicates inherit the failure mode.
    struct LoopbackHandle {
        id: HandleId,
        open: AtomicBool,
        fail_unsubscribe: bool,
    }

    impl LoopbackHandle {
        fn new(fail_unsubscribe: bool) -> Arc<Self> {
            Arc::new(Self {
                id: HandleId::next(),
                open: AtomicBool::new(false),
                fail_unsubscribe,
            })
        }

        fn ensure_open(&self) -> Result<()> {
            if self.open.load(Ordering::Acquire) {
                Ok(())
            } else {
                Err(PubSubError::NotConnected)
            }
        }
    }

    #[async_trait::async_trait]
    impl TransportHandle for LoopbackHandle {
        fn id(&self) -> HandleId {
            self.id
        }

        async fn connect(&self) -> Result<()> {
            self.open.store(true, Ordering::Release);
            Ok(())
        }

        async fn quit(&self) -> Result<()> {
            self.open.store(false, Ordering::Release);
            Ok(())
        }

        async fn duplicate(&self) -> Result<HandlePtr> {
            self.ensure_open()?;
            Ok(Arc::new(Self {
                id: HandleId::next(),
                open: AtomicBool::new(true),
                fail_unsubscribe: self.fail_unsubscribe,
            }))
        }

        async fn publish(&self, _channel: &Channel, _payload: Bytes) -> Result<()> {
            self.ensure_open()
        }

        async fn subscribe(&self, _channels: &[Channel]) -> Result<Inbox> {
            self.ensure_open()?;
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn unsubscribe(&self, _channels: &[Channel]) -> Result<()> {
            if self.fail_unsubscribe {
                Err(PubSubError::Transport("stub unsubscribe failure".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn role_creation_is_rejected_before_connect() {
        // ---
        let connector = PooledConnector::new("gate", LoopbackHandle::new(false), true);

        let publisher = connector.create_publisher(PublisherOptions).await;
        assert!(matches!(publisher, Err(PubSubError::NotConnected)));

        let subscriber = connector
            .create_subscriber(SubscriberOptions::channels(["a"]))
            .await;
        assert!(matches!(subscriber, Err(PubSubError::NotConnected)));

        // Only the primary is tracked.
        assert_eq!(connector.tracked_handles(), 1);
    }

    #[tokio::test]
    async fn pattern_rejection_acquires_no_handle() {
        // ---
        let connector = PooledConnector::new("no-wildcard", LoopbackHandle::new(false), false);
        connector.connect().await.unwrap();
        assert!(!connector.supports_wildcard());

        let rejected = connector
            .create_subscriber(SubscriberOptions::channels(["exact", "logs/*"]))
            .await;

        assert!(matches!(
            rejected,
            Err(PubSubError::UnsupportedCapability(_))
        ));
        assert_eq!(connector.tracked_handles(), 1);
    }

    #[tokio::test]
    async fn empty_channel_sets_are_rejected() {
        // ---
        let connector = PooledConnector::new("empty", LoopbackHandle::new(false), true);
        connector.connect().await.unwrap();

        let rejected = connector.create_subscriber(SubscriberOptions::default()).await;

        assert!(matches!(rejected, Err(PubSubError::Subscription(_))));
        assert_eq!(connector.tracked_handles(), 1);
    }

    #[tokio::test]
    async fn close_propagates_unsubscribe_failure_but_still_releases() {
        // ---
        let connector = PooledConnector::new("bad-unsub", LoopbackHandle::new(true), true);
        connector.connect().await.unwrap();

        let subscriber = connector
            .create_subscriber(SubscriberOptions::channels(["x"]))
            .await
            .unwrap();
        assert_eq!(connector.tracked_handles(), 2);

        let closed = subscriber.close().await;
        assert!(matches!(closed, Err(PubSubError::Subscription(_))));

        // The handle left the pool despite the failed unsubscribe.
        assert_eq!(connector.tracked_handles(), 1);
        assert!(subscriber.is_closed());

        subscriber.close().await.expect("second close must be a no-op");
    }

    #[tokio::test]
    async fn disconnect_releases_every_acquired_handle() {
        // ---
        let connector = PooledConnector::new("teardown", LoopbackHandle::new(false), true);
        connector.connect().await.unwrap();

        let publisher_a = connector.create_publisher(PublisherOptions).await.unwrap();
        let _publisher_b = connector.create_publisher(PublisherOptions).await.unwrap();
        let _subscriber = connector
            .create_subscriber(SubscriberOptions::channels(["x"]))
            .await
            .unwrap();
        assert_eq!(connector.tracked_handles(), 4);

        connector.disconnect().await.unwrap();
        assert_eq!(connector.tracked_handles(), 0);

        // Roles left open by the caller lost their sessions.
        let publish = publisher_a
            .publish(&Channel::from("x"), Bytes::from_static(b"late"))
            .await;
        assert!(matches!(publish, Err(PubSubError::NotConnected)));

        let create = connector.create_publisher(PublisherOptions).await;
        assert!(matches!(create, Err(PubSubError::NotConnected)));
    }

    #[tokio::test]
    async fn reconnect_restores_service() {
        // ---
        let connector = PooledConnector::new("rebound", LoopbackHandle::new(false), true);
        connector.connect().await.unwrap();
        connector.disconnect().await.unwrap();

        connector.connect().await.unwrap();
        assert_eq!(connector.tracked_handles(), 1);

        let publisher = connector.create_publisher(PublisherOptions).await.unwrap();
        publisher
            .publish(&Channel::from("back"), Bytes::from_static(b"up"))
            .await
            .expect("publish after reconnect failed");
        assert_eq!(connector.tracked_handles(), 2);
    }
}
