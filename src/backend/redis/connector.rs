// src/backend/redis/connector.rs

//! Factory function for Redis connectors.

use std::sync::Arc;

use super::handle::RedisHandle;
use crate::{
    // ---
    log_debug,
    log_error,
    ConnectorConfig,
    ConnectorPtr,
    PooledConnector,
    PubSubError,
    Result,
};

/// Create a new Redis connector for the broker named by `config.uri`.
///
/// Opening the client only parses the URI; no network traffic happens
/// until the connector's `connect()` establishes the primary session.
///
/// # Errors
///
/// Returns an error if:
/// - `config.uri` is missing
/// - `config.inbox_capacity` is zero
/// - the URI cannot be parsed as a Redis connection string
pub async fn create_redis_connector(config: ConnectorConfig) -> Result<ConnectorPtr> {
    // ---
    if config.inbox_capacity == 0 {
        return Err(PubSubError::InvalidConfig(
            "inbox_capacity must be at least 1".into(),
        ));
    }

    let uri = config
        .uri
        .as_deref()
        .ok_or_else(|| PubSubError::MissingConfig("uri".into()))?;

    let client = redis::Client::open(uri).map_err(|err| {
        let msg = format!("redis: failed to open client for URI {uri}: {err}");
        log_error!("{msg}");
        PubSubError::Transport(msg)
    })?;

    log_debug!("{}: create redis connector for {uri}", config.connector_id);

    let primary = Arc::new(RedisHandle::new(client, config.inbox_capacity));

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
    async fn a_uri_is_required() {
        // ---
        let result = create_redis_connector(ConnectorConfig::memory("no-uri")).await;
        assert!(matches!(
            result,
            Err(PubSubError::MissingConfig(field)) if field == "uri"
        ));
    }

    #[tokio::test]
    async fn malformed_uris_are_rejected_without_io() {
        // ---
        let config = ConnectorConfig::with_uri("not a redis uri", "bad-uri");
        let result = create_redis_connector(config).await;
        assert!(matches!(result, Err(PubSubError::Transport(_))));
    }

    #[tokio::test]
    async fn zero_inbox_capacity_is_rejected() {
        // ---
        let config =
            ConnectorConfig::with_uri("redis://127.0.0.1:6379", "zero").with_inbox_capacity(0);
        let result = create_redis_connector(config).await;
        assert!(matches!(result, Err(PubSubError::InvalidConfig(_))));
    }
}
