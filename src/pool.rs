// src/pool.rs

//! Connection pool.
//!
//! The pool is the connector's tracking set of live transport handles,
//! keyed by handle identity rather than by channel. Every handle created
//! through the connector's acquisition path stays in the pool until
//! explicitly released, so `disconnect()` can uniformly terminate whatever
//! is still open.
//!
//! Membership mutation happens under a non-async mutex: the critical
//! section contains no suspension point, so a release observed by one task
//! is complete before any other task can touch the same entry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::{log_debug, log_error, HandleId, HandlePtr, Result};

/// Acquire mutex guard, ignoring poisoning
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Tracking set of live transport handles.
///
/// The pool holds a non-owning reference to each handle: the publisher or
/// subscriber that acquired it remains the exclusive user, the pool only
/// guarantees that every handle can be terminated on shutdown.
pub(crate) struct ConnectionPool {
    // ---
    connector_id: String,
    handles: Mutex<HashMap<HandleId, HandlePtr>>,
}

impl ConnectionPool {
    /// Create an empty pool for the given connector.
    pub(crate) fn new(connector_id: impl Into<String>) -> Self {
        // ---
        Self {
            connector_id: connector_id.into(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Register a handle. Re-tracking the same handle replaces its entry.
    pub(crate) fn track(&self, handle: HandlePtr) {
        // ---
        let id = handle.id();
        lock_ignore_poison(&self.handles).insert(id, handle);
        log_debug!("{}: tracking handle {id}", self.connector_id);
    }

    /// Number of handles currently tracked.
    pub(crate) fn len(&self) -> usize {
        lock_ignore_poison(&self.handles).len()
    }

    /// Terminate and deregister one handle.
    ///
    /// The entry is removed before the handle's `quit()` runs, so a quit
    /// failure propagates without leaking a pool entry. Releasing an
    /// already-released handle is a no-op.
    pub(crate) async fn release(&self, id: HandleId) -> Result<()> {
        // ---
        let handle = lock_ignore_poison(&self.handles).remove(&id);

        let Some(handle) = handle else {
            log_debug!("{}: handle {id} already released", self.connector_id);
            return Ok(());
        };

        log_debug!("{}: releasing handle {id}", self.connector_id);
        handle.quit().await.map_err(|err| {
            log_error!("{}: failed to quit handle {id}: {err}", self.connector_id);
            err
        })
    }

    /// Terminate and deregister every tracked handle.
    ///
    /// All handles are released even when some fail; the first failure is
    /// reported after the pool is empty.
    pub(crate) async fn drain(&self) -> Result<()> {
        // ---
        let handles: Vec<(HandleId, HandlePtr)> = {
            let mut map = lock_ignore_poison(&self.handles);
            map.drain().collect()
        };

        let mut first_err = None;
        for (id, handle) in handles {
            if let Err(err) = handle.quit().await {
                log_error!("{}: failed to quit handle {id}: {err}", self.connector_id);
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, Inbox, PubSubError, TransportHandle};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Handle stub that counts quits and can be made to fail them.
    struct StubHandle {
        id: HandleId,
        quits: AtomicUsize,
        fail_quit: bool,
    }

    impl StubHandle {
        fn new(fail_quit: bool) -> Arc<Self> {
            Arc::new(Self {
                id: HandleId::next(),
                quits: AtomicUsize::new(0),
                fail_quit,
            })
        }

        fn quit_count(&self) -> usize {
            self.quits.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TransportHandle for StubHandle {
        fn id(&self) -> HandleId {
            self.id
        }

        async fn connect(&self) -> Result<()> {
            Ok(())
        }

        async fn quit(&self) -> Result<()> {
            self.quits.fetch_add(1, Ordering::SeqCst);
            if self.fail_quit {
                Err(PubSubError::Transport("stub quit failure".into()))
            } else {
                Ok(())
            }
        }

        async fn duplicate(&self) -> Result<HandlePtr> {
            Err(PubSubError::Transport("stub cannot duplicate".into()))
        }

        async fn publish(&self, _channel: &Channel, _payload: Bytes) -> Result<()> {
            Ok(())
        }

        async fn subscribe(&self, _channels: &[Channel]) -> Result<Inbox> {
            Err(PubSubError::Transport("stub cannot subscribe".into()))
        }

        async fn unsubscribe(&self, _channels: &[Channel]) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn release_terminates_the_handle_exactly_once() {
        // ---
        let pool = ConnectionPool::new("pool-test");
        let handle = StubHandle::new(false);
        pool.track(handle.clone());
        assert_eq!(pool.len(), 1);

        pool.release(handle.id()).await.expect("first release failed");
        pool.release(handle.id())
            .await
            .expect("double release must be a no-op");

        assert_eq!(handle.quit_count(), 1);
        assert_eq!(pool.len(), 0);
    }

    #[tokio::test]
    async fn release_propagates_quit_failure_but_still_untracks() {
        // ---
        let pool = ConnectionPool::new("pool-test");
        let handle = StubHandle::new(true);
        pool.track(handle.clone());

        let err = pool.release(handle.id()).await.unwrap_err();
        assert!(matches!(err, PubSubError::Transport(_)));

        // The entry is gone despite the failed quit.
        assert_eq!(pool.len(), 0);
        pool.release(handle.id())
            .await
            .expect("released handle must not be retried");
        assert_eq!(handle.quit_count(), 1);
    }

    #[tokio::test]
    async fn retracking_a_handle_keeps_a_single_entry() {
        // ---
        let pool = ConnectionPool::new("pool-test");
        let handle = StubHandle::new(false);
        pool.track(handle.clone());
        pool.track(handle.clone());
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn drain_releases_everything_and_reports_the_first_failure() {
        // ---
        let pool = ConnectionPool::new("pool-test");
        let ok = StubHandle::new(false);
        let failing = StubHandle::new(true);
        pool.track(ok.clone());
        pool.track(failing.clone());

        let err = pool.drain().await.unwrap_err();
        assert!(matches!(err, PubSubError::Transport(_)));

        // Both handles were terminated even though one failed.
        assert_eq!(ok.quit_count(), 1);
        assert_eq!(failing.quit_count(), 1);
        assert_eq!(pool.len(), 0);

        pool.drain().await.expect("draining an empty pool succeeds");
    }
}
