// src/publisher.rs

//! Pooled publisher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::pool::ConnectionPool;
use crate::{log_error, Channel, HandlePtr, Publisher, Result};

/// Publisher over one dedicated transport handle.
///
/// Stateless apart from the closed flag: every publish goes straight to
/// the bound handle, and failures surface to the caller without retry.
pub(crate) struct PooledPublisher {
    // ---
    handle: HandlePtr,
    pool: Arc<ConnectionPool>,
    closed: AtomicBool,
}

impl PooledPublisher {
    pub(crate) fn new(handle: HandlePtr, pool: Arc<ConnectionPool>) -> Self {
        // ---
        Self {
            handle,
            pool,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl Publisher for PooledPublisher {
    // ---
    async fn publish(&self, channel: &Channel, payload: Bytes) -> Result<()> {
        self.handle.publish(channel, payload).await.map_err(|err| {
            log_error!("publish to {channel} failed: {err}");
            err.into_publish()
        })
    }

    async fn close(&self) -> Result<()> {
        // ---
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.pool.release(self.handle.id()).await
    }
}
