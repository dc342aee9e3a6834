// src/error.rs

use thiserror::Error;

/// Errors surfaced by connectors, publishers, and subscribers.
///
/// The first five variants form the operational taxonomy; `MissingConfig`,
/// `ConfigConflict`, and `InvalidConfig` are reported by [`ConnectorBuilder`]
/// and the backend factories before any connection is attempted.
///
/// [`ConnectorBuilder`]: crate::ConnectorBuilder
#[derive(Error, Debug)]
pub enum PubSubError {
    /// Operation attempted before `connect()` completed, or after
    /// `disconnect()` tore the session down.
    #[error("connector is not connected")]
    NotConnected,

    /// The transport rejected or failed to send a published message.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The transport rejected a subscribe or unsubscribe.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// A pattern channel was requested from a connector that does not honor
    /// wildcard subscriptions.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Generic backend failure, wrapped rather than swallowed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A required configuration field was not provided.
    #[error("missing required config: {0}")]
    MissingConfig(String),

    /// Mutually exclusive configuration options were combined.
    #[error("conflicting config: {0}")]
    ConfigConflict(String),

    /// A configuration value is outside its valid range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl PubSubError {
    /// Fold a transport-level failure into the publish taxonomy.
    ///
    /// `NotConnected` passes through untouched so a dead session is
    /// reported as such rather than as a generic publish failure.
    pub(crate) fn into_publish(self) -> Self {
        match self {
            err @ (Self::NotConnected | Self::Publish(_)) => err,
            other => Self::Publish(other.to_string()),
        }
    }

    /// Fold a transport-level failure into the subscription taxonomy.
    pub(crate) fn into_subscription(self) -> Self {
        match self {
            err @ (Self::NotConnected
            | Self::Subscription(_)
            | Self::UnsupportedCapability(_)) => err,
            other => Self::Subscription(other.to_string()),
        }
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, PubSubError>;
