// src/backend/memory/handle.rs

//! In-memory transport handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use super::MemoryBroker;
use crate::backend::SessionState;
use crate::{
    // ---
    log_debug,
    Channel,
    HandleId,
    HandlePtr,
    Inbox,
    PubSubError,
    Result,
    TransportHandle,
};

/// One logical connection to a [`MemoryBroker`].
///
/// Routes publishes and subscriptions through the shared broker. The
/// session state mirrors what a networked handle would track: operations
/// before `connect()` and after `quit()` fail with `NotConnected`.
pub(crate) struct MemoryHandle {
    // ---
    id: HandleId,
    broker: Arc<MemoryBroker>,
    inbox_capacity: usize,
    state: SessionState,
    attached: AtomicBool,
}

impl MemoryHandle {
    /// New handle on `broker`, not yet connected.
    pub(crate) fn new(broker: Arc<MemoryBroker>, inbox_capacity: usize) -> Self {
        // ---
        Self {
            id: HandleId::next(),
            broker,
            inbox_capacity,
            state: SessionState::new(),
            attached: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl TransportHandle for MemoryHandle {
    // ---
    fn id(&self) -> HandleId {
        self.id
    }

    async fn connect(&self) -> Result<()> {
        // ---
        self.state.connect();
        log_debug!("{}: connected to memory broker", self.id);
        Ok(())
    }

    /// Terminate the session, dropping any broker registrations this
    /// handle still holds.
    async fn quit(&self) -> Result<()> {
        // ---
        if !self.state.close() {
            return Ok(());
        }

        self.broker.drop_handle(self.id).await;
        self.attached.store(false, Ordering::Release);
        log_debug!("{}: session terminated", self.id);
        Ok(())
    }

    async fn duplicate(&self) -> Result<HandlePtr> {
        // ---
        self.state.ensure_connected()?;

        let duplicate = MemoryHandle {
            id: HandleId::next(),
            broker: Arc::clone(&self.broker),
            inbox_capacity: self.inbox_capacity,
            state: SessionState::connected(),
            attached: AtomicBool::new(false),
        };

        log_debug!("{}: duplicated as {}", self.id, duplicate.id);
        Ok(Arc::new(duplicate))
    }

    async fn publish(&self, channel: &Channel, payload: Bytes) -> Result<()> {
        // ---
        self.state.ensure_connected()?;

        let _delivered = self.broker.publish(self.id, channel, payload).await;
        log_debug!("{}: delivered to {_delivered} inbox(es)", self.id);
        Ok(())
    }

    async fn subscribe(&self, channels: &[Channel]) -> Result<Inbox> {
        // ---
        self.state.ensure_connected()?;

        if self.attached.swap(true, Ordering::AcqRel) {
            return Err(PubSubError::Subscription(
                "handle already has an active subscription".into(),
            ));
        }

        match self
            .broker
            .subscribe(self.id, channels, self.inbox_capacity)
            .await
        {
            Ok(inbox) => Ok(inbox),
            Err(err) => {
                // Nothing was registered, so the handle stays attachable.
                self.attached.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    async fn unsubscribe(&self, channels: &[Channel]) -> Result<()> {
        // ---
        // Subscriber teardown can race disconnect(); a terminated
        // session is not an error here.
        if !self.state.is_connected() {
            return Ok(());
        }

        self.broker.unsubscribe(self.id, channels).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(names: &[&str]) -> Vec<Channel> {
        names.iter().map(|&n| Channel::from(n)).collect()
    }

    #[tokio::test]
    async fn operations_require_a_connected_session() {
        // ---
        let handle = MemoryHandle::new(MemoryBroker::new(), 4);

        let publish = handle
            .publish(&Channel::from("c"), Bytes::from_static(b"x"))
            .await;
        assert!(matches!(publish, Err(PubSubError::NotConnected)));

        let subscribe = handle.subscribe(&channels(&["c"])).await;
        assert!(matches!(subscribe, Err(PubSubError::NotConnected)));

        let duplicate = handle.duplicate().await;
        assert!(matches!(duplicate, Err(PubSubError::NotConnected)));
    }

    #[tokio::test]
    async fn subscribe_attaches_at_most_once() {
        // ---
        let handle = MemoryHandle::new(MemoryBroker::new(), 4);
        handle.connect().await.unwrap();

        let _inbox = handle.subscribe(&channels(&["a"])).await.unwrap();
        let again = handle.subscribe(&channels(&["b"])).await;
        assert!(matches!(again, Err(PubSubError::Subscription(_))));
    }

    #[tokio::test]
    async fn rejected_subscribe_leaves_the_handle_attachable() {
        // ---
        let handle = MemoryHandle::new(MemoryBroker::new(), 4);
        handle.connect().await.unwrap();

        let rejected = handle.subscribe(&channels(&["[oops["])).await;
        assert!(rejected.is_err());

        let _inbox = handle
            .subscribe(&channels(&["recovered"]))
            .await
            .expect("handle should accept a valid subscribe after a rejection");
    }

    #[tokio::test]
    async fn quit_is_idempotent_and_clears_registrations() {
        // ---
        let broker = MemoryBroker::new();
        let handle = MemoryHandle::new(broker.clone(), 4);
        handle.connect().await.unwrap();

        let _inbox = handle.subscribe(&channels(&["a", "b/*"])).await.unwrap();
        assert_eq!(broker.registration_count().await, 2);

        handle.quit().await.unwrap();
        handle.quit().await.unwrap();
        assert_eq!(broker.registration_count().await, 0);
    }

    #[tokio::test]
    async fn connect_revives_a_terminated_session() {
        // ---
        let handle = MemoryHandle::new(MemoryBroker::new(), 4);
        handle.connect().await.unwrap();
        handle.quit().await.unwrap();

        handle.connect().await.unwrap();
        handle
            .publish(&Channel::from("still-works"), Bytes::from_static(b"ok"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicates_start_connected_and_share_the_broker() {
        // ---
        let broker = MemoryBroker::new();
        let primary = MemoryHandle::new(broker.clone(), 4);
        primary.connect().await.unwrap();

        let duplicate = primary.duplicate().await.unwrap();
        assert_ne!(duplicate.id(), primary.id());

        let mut inbox = duplicate.subscribe(&channels(&["wired"])).await.unwrap();
        primary
            .publish(&Channel::from("wired"), Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let message = inbox.recv().await.unwrap();
        assert_eq!(message.payload, &b"hello"[..]);
    }
}
