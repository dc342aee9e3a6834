// src/backend/redis/handle.rs

//! Redis transport handle.
//!
//! ## Two connections required
//!
//! Redis mandates a dedicated connection for Pub/Sub; a connection in
//! Pub/Sub mode cannot issue regular commands like `PUBLISH`. Each handle
//! therefore maintains up to two async connections:
//!
//! - `publish_conn`, a `MultiplexedConnection` used only for `PUBLISH`,
//!   opened by `connect()` and reopened on demand for duplicated handles
//! - a sink/stream pair split from `aio::PubSub`, created when the handle
//!   attaches via `subscribe()`
//!
//! `split()` is used so that the sink can issue unsubscribes concurrently
//! with the stream being polled by the reader task.
//!
//! ## Reader task
//!
//! `subscribe()` spawns one reader task per attached handle. It forwards
//! every incoming `Msg` into the handle's inbox and stops when the stream
//! ends or `quit()` signals shutdown. Because each subscriber owns its own
//! connection, a slow subscriber backpressures only itself.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use redis::aio::{MultiplexedConnection, PubSubSink, PubSubStream};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;

use crate::backend::SessionState;
use crate::{
    // ---
    log_debug,
    log_error,
    log_info,
    Channel,
    HandleId,
    HandlePtr,
    Inbox,
    Message,
    PubSubError,
    Result,
    TransportHandle,
};

/// State of an attached handle: the subscription sink plus the reader
/// task draining the matching stream.
struct RedisSubscription {
    // ---
    sink: PubSubSink,
    reader: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

/// One logical connection pair to a Redis broker.
pub(crate) struct RedisHandle {
    // ---
    id: HandleId,
    client: redis::Client,
    inbox_capacity: usize,
    state: SessionState,
    publish_conn: Mutex<Option<MultiplexedConnection>>,
    subscription: Mutex<Option<RedisSubscription>>,
}

impl RedisHandle {
    /// New handle for `client`, not yet connected.
    pub(crate) fn new(client: redis::Client, inbox_capacity: usize) -> Self {
        // ---
        Self {
            id: HandleId::next(),
            client,
            inbox_capacity,
            state: SessionState::new(),
            publish_conn: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    /// The publish connection, opened on first use.
    ///
    /// Duplicated handles start without one; handles that only ever
    /// subscribe never open one.
    async fn publish_conn(&self) -> Result<MultiplexedConnection> {
        // ---
        let mut guard = self.publish_conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| {
                let msg = format!("{}: failed to open redis publish connection: {err}", self.id);
                log_error!("{msg}");
                PubSubError::Transport(msg)
            })?;

        *guard = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait::async_trait]
impl TransportHandle for RedisHandle {
    // ---
    fn id(&self) -> HandleId {
        self.id
    }

    /// Establish the session, failing fast when the broker is
    /// unreachable.
    async fn connect(&self) -> Result<()> {
        // ---
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| {
                let msg = format!("{}: failed to connect to redis broker: {err}", self.id);
                log_error!("{msg}");
                PubSubError::Transport(msg)
            })?;

        *self.publish_conn.lock().await = Some(conn);
        self.state.connect();

        log_info!("{}: connected to redis broker", self.id);
        Ok(())
    }

    /// Terminate the session: stop the reader task and drop both
    /// connections. The broker cleans up server-side subscriptions when
    /// the Pub/Sub connection closes.
    async fn quit(&self) -> Result<()> {
        // ---
        if !self.state.close() {
            return Ok(());
        }

        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.shutdown.notify_one();
            let _ = subscription.reader.await;
            drop(subscription.sink);
        }

        *self.publish_conn.lock().await = None;
        log_debug!("{}: session terminated", self.id);
        Ok(())
    }

    async fn duplicate(&self) -> Result<HandlePtr> {
        // ---
        self.state.ensure_connected()?;

        let duplicate = RedisHandle {
            id: HandleId::next(),
            client: self.client.clone(),
            inbox_capacity: self.inbox_capacity,
            state: SessionState::connected(),
            publish_conn: Mutex::new(None),
            subscription: Mutex::new(None),
        };

        log_debug!("{}: duplicated as {}", self.id, duplicate.id);
        Ok(Arc::new(duplicate))
    }

    async fn publish(&self, channel: &Channel, payload: Bytes) -> Result<()> {
        // ---
        self.state.ensure_connected()?;

        let mut conn = self.publish_conn().await?;

        redis::cmd("PUBLISH")
            .arg(channel.as_str())
            .arg(payload.as_ref())
            .query_async::<i64>(&mut conn)
            .await
            .map(|_receivers| ())
            .map_err(|err| {
                let msg = format!("{}: publish failed for channel {channel}: {err}", self.id);
                log_error!("{msg}");
                PubSubError::Transport(msg)
            })
    }

    async fn subscribe(&self, channels: &[Channel]) -> Result<Inbox> {
        // ---
        self.state.ensure_connected()?;

        // The lock is held across the whole attach so concurrent calls
        // cannot both pass the attached check.
        let mut guard = self.subscription.lock().await;
        if guard.is_some() {
            return Err(PubSubError::Subscription(
                "handle already has an active subscription".into(),
            ));
        }

        let (mut sink, stream) = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|err| {
                let msg = format!("{}: failed to open redis pubsub connection: {err}", self.id);
                log_error!("{msg}");
                PubSubError::Transport(msg)
            })?
            .split();

        // On a rejected channel the sink and stream are dropped here,
        // which closes the connection and discards the partial
        // registrations with it.
        for channel in channels {
            let registered = if channel.is_pattern() {
                sink.psubscribe(channel.as_str()).await
            } else {
                sink.subscribe(channel.as_str()).await
            };
            registered.map_err(|err| {
                let msg = format!("{}: failed to subscribe to {channel}: {err}", self.id);
                log_error!("{msg}");
                PubSubError::Transport(msg)
            })?;
        }

        log_info!("{}: subscribed to {} channel(s)", self.id, channels.len());

        let (tx, rx) = mpsc::channel(self.inbox_capacity);
        let shutdown = Arc::new(Notify::new());
        let reader = tokio::spawn(read_loop(self.id, stream, tx, Arc::clone(&shutdown)));

        *guard = Some(RedisSubscription {
            sink,
            reader,
            shutdown,
        });

        Ok(rx)
    }

    async fn unsubscribe(&self, channels: &[Channel]) -> Result<()> {
        // ---
        // Subscriber teardown can race disconnect(); a terminated
        // session is not an error here.
        if !self.state.is_connected() {
            return Ok(());
        }

        let mut guard = self.subscription.lock().await;
        let Some(subscription) = guard.as_mut() else {
            return Ok(());
        };

        for channel in channels {
            let detached = if channel.is_pattern() {
                subscription.sink.punsubscribe(channel.as_str()).await
            } else {
                subscription.sink.unsubscribe(channel.as_str()).await
            };
            detached.map_err(|err| {
                let msg = format!("{}: failed to unsubscribe from {channel}: {err}", self.id);
                log_error!("{msg}");
                PubSubError::Transport(msg)
            })?;
        }

        Ok(())
    }
}

/// Forwards incoming messages into the handle's inbox until the stream
/// ends or shutdown is signaled.
async fn read_loop(
    handle: HandleId,
    mut stream: PubSubStream,
    tx: mpsc::Sender<Message>,
    shutdown: Arc<Notify>,
) {
    // ---
    loop {
        tokio::select! {
            maybe_msg = stream.next() => {
                match maybe_msg {
                    Some(msg) => {
                        // For pattern deliveries get_channel_name() is the
                        // concrete channel, not the pattern that matched.
                        let channel = Channel::from(msg.get_channel_name());
                        let payload = Bytes::copy_from_slice(msg.get_payload_bytes());

                        if tx.send(Message::new(channel, payload)).await.is_err() {
                            // Inbox dropped; the subscriber is gone.
                            break;
                        }
                    }
                    None => {
                        log_error!("{handle}: pubsub stream ended");
                        break;
                    }
                }
            }

            _ = shutdown.notified() => {
                break;
            }
        }
    }

    log_debug!("{handle}: reader task finished");
}
