// src/connector_builder.rs

//! Connector builder.
//!
//! Provides a fluent builder API for constructing connectors with clear
//! separation between required and optional configuration, and backend
//! selection driven by the URI scheme.

use crate::{
    // ---
    ConnectorConfig,
    ConnectorPtr,
    PubSubError,
    Result,
    DEFAULT_INBOX_CAPACITY,
};

/// Builder for connector instances.
///
/// The backend is normally inferred from the URI scheme (`memory://`,
/// `redis://`); with no URI the in-memory broker is used. An explicit
/// [`backend`](ConnectorBuilder::backend) override is validated against
/// the scheme at build time.
///
/// # Examples
///
/// ## In-memory connector
/// ```no_run
/// use mom_pubsub::ConnectorBuilder;
///
/// # async fn example() -> mom_pubsub::Result<()> {
/// let connector = ConnectorBuilder::new()
///     .connector_id("worker-7")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// ## Redis connector
/// ```no_run
/// use mom_pubsub::ConnectorBuilder;
///
/// # async fn example() -> mom_pubsub::Result<()> {
/// let connector = ConnectorBuilder::new()
///     .uri("redis://localhost:6379")
///     .connector_id("worker-7")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectorBuilder {
    // ---
    uri: Option<String>,
    connector_id: Option<String>,
    inbox_capacity: Option<usize>,
    wildcard: Option<bool>,
    backend: Option<String>,
}

impl ConnectorBuilder {
    /// Create a new connector builder.
    pub fn new() -> Self {
        Self {
            uri: None,
            connector_id: None,
            inbox_capacity: None,
            wildcard: None,
            backend: None,
        }
    }

    /// Set the backend URI.
    ///
    /// Examples:
    /// - `"memory://"`
    /// - `"redis://localhost:6379"`
    /// - `"rediss://broker.example.com:6380"` (TLS)
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the connector ID (required).
    pub fn connector_id(mut self, id: impl Into<String>) -> Self {
        self.connector_id = Some(id.into());
        self
    }

    /// Set the per-subscription delivery-buffer capacity.
    ///
    /// If not specified, uses [`DEFAULT_INBOX_CAPACITY`].
    pub fn inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = Some(capacity);
        self
    }

    /// Enable or disable wildcard subscription support (default: enabled).
    pub fn wildcard(mut self, enabled: bool) -> Self {
        self.wildcard = Some(enabled);
        self
    }

    /// Set an explicit backend, overriding URI-scheme inference.
    ///
    /// Valid values: `"memory"`, `"redis"`. Conflicts with a URI whose
    /// scheme names a different backend.
    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Build the connector (consumes self).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `connector_id` is missing
    /// - the explicit backend conflicts with the URI scheme
    /// - a backend requiring a URI has none (`redis`)
    /// - the backend name is unrecognized
    /// - connector creation fails
    pub async fn build(self) -> Result<ConnectorPtr> {
        // ---
        let connector_id = self
            .connector_id
            .ok_or_else(|| PubSubError::MissingConfig("connector_id".into()))?;

        // Scheme of the URI, normalized onto backend names.
        let scheme = self.uri.as_deref().and_then(|uri| {
            uri.split_once("://").map(|(scheme, _)| match scheme {
                "rediss" => "redis",
                other => other,
            })
        });

        let backend = match (self.backend, scheme) {
            (Some(backend), Some(scheme)) if backend != scheme => {
                return Err(PubSubError::ConfigConflict(format!(
                    "backend \"{backend}\" conflicts with uri scheme \"{scheme}\""
                )));
            }
            (Some(backend), _) => backend,
            (None, Some(scheme)) => scheme.to_string(),
            (None, None) => "memory".to_string(),
        };

        if backend == "redis" && self.uri.is_none() {
            return Err(PubSubError::MissingConfig("uri".into()));
        }

        let config = ConnectorConfig {
            uri: self.uri,
            connector_id,
            inbox_capacity: self.inbox_capacity.unwrap_or(DEFAULT_INBOX_CAPACITY),
            wildcard: self.wildcard.unwrap_or(true),
        };

        // Dispatch to the backend factory. A backend compiled out by its
        // feature flag returns Err from its Null Object stub.
        match backend.as_str() {
            "memory" => crate::create_memory_connector(config).await,
            "redis" => crate::create_redis_connector(config).await,
            other => Err(PubSubError::InvalidConfig(format!(
                "unrecognized backend: {other}, valid values: memory, redis"
            ))),
        }
    }
}

impl Default for ConnectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connector_id_is_required() {
        // ---
        let result = ConnectorBuilder::new().build().await;
        assert!(matches!(
            result,
            Err(PubSubError::MissingConfig(field)) if field == "connector_id"
        ));
    }

    #[tokio::test]
    async fn explicit_backend_must_match_uri_scheme() {
        // ---
        let result = ConnectorBuilder::new()
            .connector_id("b")
            .uri("redis://localhost:6379")
            .backend("memory")
            .build()
            .await;
        assert!(matches!(result, Err(PubSubError::ConfigConflict(_))));
    }

    #[tokio::test]
    async fn redis_backend_requires_a_uri() {
        // ---
        let result = ConnectorBuilder::new()
            .connector_id("b")
            .backend("redis")
            .build()
            .await;
        assert!(matches!(result, Err(PubSubError::MissingConfig(field)) if field == "uri"));
    }

    #[tokio::test]
    async fn unrecognized_backend_is_rejected() {
        // ---
        let result = ConnectorBuilder::new()
            .connector_id("b")
            .backend("carrier-pigeon")
            .build()
            .await;
        assert!(matches!(result, Err(PubSubError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn unknown_uri_scheme_is_rejected() {
        // ---
        let result = ConnectorBuilder::new()
            .connector_id("b")
            .uri("kafka://localhost:9092")
            .build()
            .await;
        assert!(matches!(result, Err(PubSubError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn defaults_build_a_memory_connector() {
        // ---
        let connector = ConnectorBuilder::new()
            .connector_id("builder-defaults")
            .build()
            .await
            .expect("memory connector should build");
        assert!(connector.supports_wildcard());
        assert_eq!(connector.connector_id(), "builder-defaults");
    }

    #[tokio::test]
    async fn memory_scheme_selects_the_memory_backend() {
        // ---
        let connector = ConnectorBuilder::new()
            .connector_id("builder-scheme")
            .uri("memory://")
            .wildcard(false)
            .build()
            .await
            .expect("memory connector should build");
        assert!(!connector.supports_wildcard());
    }
}
