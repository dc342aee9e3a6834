// src/config.rs

//! Public, backend-agnostic connector configuration.
//!
//! This type intentionally contains no backend-specific concepts (e.g.
//! client options of a particular driver). Backend factories are
//! responsible for interpreting this config into concrete connection
//! settings.

/// Default capacity of a subscriber's delivery buffer.
pub const DEFAULT_INBOX_CAPACITY: usize = 16;

/// Connector configuration and connection parameters.
#[derive(Clone, Debug)]
pub struct ConnectorConfig {
    // ---
    /// Backend connection URI (e.g. `"redis://localhost:6379"`).
    ///
    /// `None` selects the in-memory broker; brokerless backends ignore it.
    pub uri: Option<String>,

    /// Unique identifier for this connector instance, used for logging.
    pub connector_id: String,

    /// Capacity of each subscription's delivery buffer, in messages.
    ///
    /// Must be at least 1. Applies to backends that buffer incoming
    /// messages per handle before dispatch.
    pub inbox_capacity: usize,

    /// Whether pattern channels are honored for subscriptions.
    ///
    /// Both built-in backends support patterns natively; disabling this
    /// makes the connector report `supports_wildcard() == false` and
    /// reject pattern channels, modeling an exact-match-only delivery
    /// contract.
    pub wildcard: bool,
}

impl ConnectorConfig {
    /// Create an in-memory connector config (no broker URI).
    pub fn memory(connector_id: impl Into<String>) -> Self {
        // ---
        Self {
            uri: None,
            connector_id: connector_id.into(),
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            wildcard: true,
        }
    }

    /// Create a config with the given backend URI.
    pub fn with_uri(uri: impl Into<String>, connector_id: impl Into<String>) -> Self {
        // ---
        Self {
            uri: Some(uri.into()),
            connector_id: connector_id.into(),
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            wildcard: true,
        }
    }

    /// Set an explicit delivery-buffer capacity.
    pub fn with_inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = capacity;
        self
    }

    /// Enable or disable wildcard subscription support.
    pub fn with_wildcard(mut self, enabled: bool) -> Self {
        self.wildcard = enabled;
        self
    }
}
