// src/subscriber.rs

//! Pooled subscriber.
//!
//! A subscriber binds one attached transport handle to a fixed channel set
//! and fans every received message out to its registered handlers. A
//! background dispatch task drains the handle's inbox; teardown makes the
//! backend stop feeding that inbox, waits for the task to finish, and only
//! then resolves, so a completed `close()` means no handler will run for
//! anything published later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::pool::{lock_ignore_poison, ConnectionPool};
use crate::{
    // ---
    log_debug,
    log_error,
    Channel,
    HandlePtr,
    Inbox,
    MessageHandler,
    Result,
    Subscriber,
    SubscriberPtr,
};

/// Registered handlers, in registration order.
type HandlerList = Arc<Mutex<Vec<MessageHandler>>>;

/// Subscriber over one attached transport handle.
///
/// Dropping a subscriber without `close()` leaves its handle in the pool;
/// the connector's `disconnect()` terminates it, which also ends the
/// dispatch task through the closing inbox.
pub(crate) struct PooledSubscriber {
    // ---
    channels: Vec<Channel>,
    handle: HandlePtr,
    pool: Arc<ConnectionPool>,
    handlers: HandlerList,
    closed: AtomicBool,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl PooledSubscriber {
    /// Wrap an attached handle and start draining its inbox.
    pub(crate) fn spawn(
        channels: Vec<Channel>,
        handle: HandlePtr,
        pool: Arc<ConnectionPool>,
        inbox: Inbox,
    ) -> SubscriberPtr {
        // ---
        let handlers: HandlerList = Arc::new(Mutex::new(Vec::new()));
        let dispatch = tokio::spawn(dispatch_loop(inbox, Arc::clone(&handlers)));

        Arc::new(Self {
            channels,
            handle,
            pool,
            handlers,
            closed: AtomicBool::new(false),
            dispatch: Mutex::new(Some(dispatch)),
        })
    }
}

/// Delivery dispatch: drains the inbox and invokes every registered
/// handler, in registration order, once per message.
///
/// The loop ends when the backend drops its side of the inbox
/// (unsubscribe or quit) and every in-flight send has drained.
async fn dispatch_loop(mut inbox: Inbox, handlers: HandlerList) {
    // ---
    while let Some(msg) = inbox.recv().await {
        // Snapshot under the lock, invoke outside it, so a handler that
        // registers further handlers cannot deadlock the dispatch.
        let snapshot: Vec<MessageHandler> = lock_ignore_poison(&handlers).clone();
        for handler in snapshot {
            handler(msg.clone());
        }
    }

    log_debug!("subscriber dispatch finished");
}

#[async_trait::async_trait]
impl Subscriber for PooledSubscriber {
    // ---
    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn on_message(&self, handler: MessageHandler) {
        lock_ignore_poison(&self.handlers).push(handler);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) -> Result<()> {
        // ---
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // Unsubscribe must complete before the handle is released so no
        // message arriving afterwards is attributed to these channels.
        let unsubscribed = self.handle.unsubscribe(&self.channels).await;

        // The handle leaves the pool even when the unsubscribe failed;
        // the failure itself is reported below.
        let released = self.pool.release(self.handle.id()).await;

        // With the backend side gone the inbox closes; waiting for the
        // dispatch task to drain it is what makes post-close silence hold.
        let dispatch = lock_ignore_poison(&self.dispatch).take();
        if let Some(task) = dispatch {
            let _ = task.await;
        }

        unsubscribed.map_err(|err| {
            log_error!("subscriber close: unsubscribe failed: {err}");
            err.into_subscription()
        })?;
        released
    }
}

// ---------------------------------------------------------------------------
