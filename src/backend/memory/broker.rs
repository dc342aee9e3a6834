// src/backend/memory/broker.rs

//! Shared message broker for the in-memory backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use globset::{Glob, GlobMatcher};
use tokio::sync::{mpsc, RwLock};

use crate::{
    // ---
    log_debug,
    log_info,
    Channel,
    HandleId,
    Message,
    PubSubError,
    Result,
};

/// One delivery target: the sender half of a handle's inbox.
struct Registration {
    // ---
    handle: HandleId,
    tx: mpsc::Sender<Message>,
}

/// Pattern registrations share the matcher compiled at subscribe time,
/// keyed by the original pattern string.
struct PatternEntry {
    // ---
    matcher: GlobMatcher,
    registrations: Vec<Registration>,
}

#[derive(Default)]
struct BrokerState {
    // ---
    channels: HashMap<Arc<str>, Vec<Registration>>,
    patterns: HashMap<Arc<str>, PatternEntry>,
}

/// Shared message broker for the in-memory backend.
///
/// Simulates a pub/sub broker within a single process. All in-memory
/// handles that share a `MemoryBroker` can publish and receive each
/// other's messages, exactly as clients connected to a real broker would.
///
/// # ⚠️  Testing Only - Subject to Change
///
/// **This type is exposed only for `mom-pubsub`'s own integration tests.**
/// It may change or be removed in future versions without a deprecation cycle.
/// **Production code should use [`ConnectorBuilder`](crate::ConnectorBuilder)** instead.
///
/// # Usage in Integration Tests
///
/// For integration tests that need isolation between parallel test cases,
/// construct a broker explicitly and pass it to
/// [`create_memory_connector_with_broker`](crate::create_memory_connector_with_broker):
///
/// ```
/// # use mom_pubsub::{ConnectorConfig, MemoryBroker};
/// # async fn example() -> mom_pubsub::Result<()> {
/// let broker = MemoryBroker::new();
///
/// let producer = mom_pubsub::create_memory_connector_with_broker(
///     ConnectorConfig::memory("producer"),
///     broker.clone(),
/// )
/// .await?;
/// let consumer = mom_pubsub::create_memory_connector_with_broker(
///     ConnectorConfig::memory("consumer"),
///     broker.clone(),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct MemoryBroker {
    // ---
    state: RwLock<BrokerState>,
    publish_count: AtomicUsize,
    send_error_count: AtomicUsize,
}

impl MemoryBroker {
    /// Create a new, empty broker.
    pub fn new() -> Arc<Self> {
        // ---
        Arc::new(Self {
            state: RwLock::new(BrokerState::default()),
            publish_count: AtomicUsize::new(0),
            send_error_count: AtomicUsize::new(0),
        })
    }

    /// Register `handle` for `channels` and return the receiving end of
    /// its inbox, buffering up to `capacity` undelivered messages.
    ///
    /// Exact names and patterns land in separate registries; a name that
    /// appears more than once in `channels` collapses to a single
    /// registration.
    pub(crate) async fn subscribe(
        &self,
        handle: HandleId,
        channels: &[Channel],
        capacity: usize,
    ) -> Result<mpsc::Receiver<Message>> {
        // ---
        // Compile every pattern before touching the registry so a rejected
        // glob leaves no partial registrations behind.
        let mut exact: Vec<Arc<str>> = Vec::new();
        let mut patterns: Vec<(Arc<str>, GlobMatcher)> = Vec::new();

        for channel in channels {
            if channel.is_pattern() {
                let glob = Glob::new(channel.as_str()).map_err(|err| {
                    PubSubError::Subscription(format!("invalid pattern \"{channel}\": {err}"))
                })?;
                patterns.push((channel.0.clone(), glob.compile_matcher()));
            } else {
                exact.push(channel.0.clone());
            }
        }

        log_debug!("{handle}: subscribe to {} channel(s)", channels.len());

        let (tx, rx) = mpsc::channel(capacity);

        let mut state = self.state.write().await;
        for name in exact {
            let registrations = state.channels.entry(name).or_insert_with(Vec::new);
            if !registrations.iter().any(|r| r.handle == handle) {
                registrations.push(Registration {
                    handle,
                    tx: tx.clone(),
                });
            }
        }
        for (name, matcher) in patterns {
            let entry = state.patterns.entry(name).or_insert_with(|| PatternEntry {
                matcher,
                registrations: Vec::new(),
            });
            if !entry.registrations.iter().any(|r| r.handle == handle) {
                entry.registrations.push(Registration {
                    handle,
                    tx: tx.clone(),
                });
            }
        }

        Ok(rx)
    }

    /// Deliver `payload` to every registration matching `channel` and
    /// return how many inboxes accepted it.
    ///
    /// A handle registered for both an exact name and a pattern matching
    /// it is counted once per registration.
    pub(crate) async fn publish(
        &self,
        _handle: HandleId,
        channel: &Channel,
        payload: Bytes,
    ) -> usize {
        // ---
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        // Snapshot the matching senders under the read lock and send after
        // releasing it, so a full inbox cannot block the registry.
        let senders: Vec<mpsc::Sender<Message>> = {
            let state = self.state.read().await;
            let mut senders = Vec::new();

            if let Some(registrations) = state.channels.get(channel.as_str()) {
                senders.extend(registrations.iter().map(|r| r.tx.clone()));
            }
            for entry in state.patterns.values() {
                if entry.matcher.is_match(channel.as_str()) {
                    senders.extend(entry.registrations.iter().map(|r| r.tx.clone()));
                }
            }
            senders
        };

        log_debug!(
            "{_handle}: publish to {channel}, {} receiver(s)",
            senders.len()
        );

        let message = Message::new(channel.clone(), payload);
        let mut delivered = 0;
        for sender in senders {
            // A failed send means the receiving handle dropped its inbox
            // without unsubscribing.
            match sender.send(message.clone()).await {
                Ok(()) => delivered += 1,
                Err(_err) => {
                    self.send_error_count.fetch_add(1, Ordering::Relaxed);
                    log_info!("publish to {channel} lost a receiver: {_err}");
                }
            }
        }

        delivered
    }

    /// Remove `handle`'s registrations for the given channels, dropping
    /// registry entries that become empty. Unknown names are ignored.
    pub(crate) async fn unsubscribe(&self, handle: HandleId, channels: &[Channel]) {
        // ---
        log_debug!("{handle}: unsubscribe from {} channel(s)", channels.len());

        let mut state = self.state.write().await;
        for channel in channels {
            let name = channel.as_str();
            if channel.is_pattern() {
                let emptied = match state.patterns.get_mut(name) {
                    Some(entry) => {
                        entry.registrations.retain(|r| r.handle != handle);
                        entry.registrations.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.patterns.remove(name);
                }
            } else {
                let emptied = match state.channels.get_mut(name) {
                    Some(registrations) => {
                        registrations.retain(|r| r.handle != handle);
                        registrations.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.channels.remove(name);
                }
            }
        }
    }

    /// Remove every registration owned by `handle`, across all channels
    /// and patterns. Used when a handle terminates without unsubscribing.
    pub(crate) async fn drop_handle(&self, handle: HandleId) {
        // ---
        let mut state = self.state.write().await;
        state.channels.retain(|_, registrations| {
            registrations.retain(|r| r.handle != handle);
            !registrations.is_empty()
        });
        state.patterns.retain(|_, entry| {
            entry.registrations.retain(|r| r.handle != handle);
            !entry.registrations.is_empty()
        });
    }

    /// Total number of live registrations, exact and pattern combined.
    pub async fn registration_count(&self) -> usize {
        // ---
        let state = self.state.read().await;
        let exact: usize = state.channels.values().map(Vec::len).sum();
        let patterns: usize = state
            .patterns
            .values()
            .map(|entry| entry.registrations.len())
            .sum();
        exact + patterns
    }

    /// Number of publish calls accepted by this broker.
    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }

    /// Number of deliveries that failed because the receiving inbox was
    /// gone.
    pub fn send_error_count(&self) -> usize {
        self.send_error_count.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
