//! Backend implementations.
//!
//! This module provides concrete implementations of the domain-level
//! [`TransportHandle`](crate::TransportHandle) trait, wrapped into
//! connectors by [`PooledConnector`](crate::PooledConnector). Optional
//! backends are hidden behind feature flags and exposed only through
//! constructor functions.
//!
//! Domain code must not depend on backend-specific types.

mod memory;
mod session;

#[cfg(feature = "backend_redis")]
mod redis;

pub use memory::{
    // ---
    create_memory_connector,
    create_memory_connector_with_broker,
    MemoryBroker,
};

pub(crate) use session::SessionState;

#[cfg(feature = "backend_redis")]
pub use redis::create_redis_connector;

#[cfg(not(feature = "backend_redis"))]
pub async fn create_redis_connector(
    _config: crate::ConnectorConfig,
) -> crate::Result<crate::ConnectorPtr> {
    Err(crate::PubSubError::Transport(
        "backend_redis feature is not enabled".into(),
    ))
}
