// src/backend/memory/connector.rs

//! Factory functions for in-memory connectors.

use std::sync::{Arc, OnceLock};

use super::handle::MemoryHandle;
use super::MemoryBroker;
use crate::{
    // ---
    log_debug,
    ConnectorConfig,
    ConnectorPtr,
    PooledConnector,
    PubSubError,
    Result,
};

/// Process-global broker used by [`create_memory_connector`].
static GLOBAL_BROKER: OnceLock<Arc<MemoryBroker>> = OnceLock::new();

fn global_broker() -> Arc<MemoryBroker> {
    GLOBAL_BROKER.get_or_init(MemoryBroker::new).clone()
}

/// Create a new in-memory connector using the process-global broker.
///
/// All connectors created with this function share a single message bus,
/// matching the semantics of clients connected to a real broker. Suitable
/// for production use and simple single-test scenarios.
///
/// For isolated parallel testing, use
/// [`create_memory_connector_with_broker`].
///
/// # Errors
///
/// Fails with [`InvalidConfig`](PubSubError::InvalidConfig) when
/// `config.inbox_capacity` is zero.
pub async fn create_memory_connector(config: ConnectorConfig) -> Result<ConnectorPtr> {
    // ---
    create_memory_connector_with_broker(config, global_broker()).await
}

/// Create a new in-memory connector using the provided broker.
///
/// # ⚠️  Testing Only - Subject to Change
///
/// **This function is exposed only for `mom-pubsub`'s own integration tests.**
/// It may change or be removed in future versions without a deprecation cycle.
/// **Production code should use [`ConnectorBuilder`](crate::ConnectorBuilder)** instead.
///
/// # Purpose
///
/// Allows multiple connectors to share an explicitly constructed
/// [`MemoryBroker`], providing isolation between test cases running in
/// parallel.
///
/// # Errors
///
/// Fails with [`InvalidConfig`](PubSubError::InvalidConfig) when
/// `config.inbox_capacity` is zero.
pub async fn create_memory_connector_with_broker(
    config: ConnectorConfig,
    broker: Arc<MemoryBroker>,
) -> Result<ConnectorPtr> {
    // ---
    if config.inbox_capacity == 0 {
        return Err(PubSubError::InvalidConfig(
            "inbox_capacity must be at least 1".into(),
        ));
    }

    log_debug!("{}: create memory connector", config.connector_id);

    let primary = Arc::new(MemoryHandle::new(broker, config.inbox_capacity));

    Ok(Arc::new(PooledConnector::new(
        config.connector_id,
        primary,
        config.wildcard,
    )))
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_inbox_capacity_is_rejected() {
        // ---
        let config = ConnectorConfig::memory("zero-capacity").with_inbox_capacity(0);
        let result = create_memory_connector(config).await;
        assert!(matches!(result, Err(PubSubError::InvalidConfig(_))));
    }
}
