// src/domain/handle.rs

//! Transport handle contract.
//!
//! A [`TransportHandle`] is one logical connection to the message bus: the
//! collaborator interface the core requires from every backend. The core
//! never owns wire-level concerns; it only sequences calls on handles and
//! tracks them for bulk release.
//!
//! A handle is either *unattached* (freshly duplicated, no subscriptions)
//! or *attached* (subscribed to a fixed, non-empty channel set), and
//! attachment happens at most once over its lifetime. Each handle is
//! exclusively owned by the publisher or subscriber that acquired it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{Channel, Message, Result};

/// Receiver side of a handle's incoming-message stream.
///
/// The backend pushes received messages into the inbox for as long as the
/// handle remains subscribed; the stream ends when the handle unsubscribes
/// or quits.
pub type Inbox = mpsc::Receiver<Message>;

/// Process-unique handle identity, used as the pool key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Allocate the next identity.
    pub fn next() -> Self {
        // ---
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One logical backend connection.
///
/// Implementations must ensure that:
/// - `quit()` is idempotent and safe to call on an already-terminated
///   handle.
/// - `subscribe()` attaches the handle at most once; a second call fails.
/// - After `unsubscribe()` or `quit()` resolves, no further message enters
///   the inbox.
///
/// Errors are reported in the transport taxonomy
/// ([`Transport`](crate::PubSubError::Transport) for backend failures);
/// the core maps them into the publish/subscription taxonomy at the role
/// boundary.
#[async_trait::async_trait]
pub trait TransportHandle: Send + Sync {
    // ---
    /// Identity of this handle.
    fn id(&self) -> HandleId;

    /// Establish the backend session.
    async fn connect(&self) -> Result<()>;

    /// Terminate the session and drop any subscriptions. Idempotent.
    async fn quit(&self) -> Result<()>;

    /// Produce a new, unattached handle sharing this handle's backend
    /// target and credentials. The source must be connected; the duplicate
    /// starts ready for use.
    async fn duplicate(&self) -> Result<HandlePtr>;

    /// Send `payload` to `channel`.
    async fn publish(&self, channel: &Channel, payload: Bytes) -> Result<()>;

    /// Attach this handle to `channels` and return the delivery inbox.
    async fn subscribe(&self, channels: &[Channel]) -> Result<Inbox>;

    /// Detach the given channels. A no-op on a handle whose session is
    /// already terminated.
    async fn unsubscribe(&self, channels: &[Channel]) -> Result<()>;
}

/// Shared handle pointer.
pub type HandlePtr = Arc<dyn TransportHandle>;

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_ids_are_unique_and_ordered() {
        // ---
        let a = HandleId::next();
        let b = HandleId::next();
        assert_ne!(a, b);
        assert!(a < b);
    }
}
