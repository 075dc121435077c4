//! Configuration for the peer-to-peer messaging layer.

use {crate::protocol::ProtocolId, std::net::SocketAddr};

/// Per-call options for sends and handler registrations.
///
/// The same value must be passed on both ends of an exchange for their
/// candidate lists to line up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendRecvConfig {
    /// Additional protocol identifier to offer ahead of the basic one,
    /// bound to delimited framing. `None` keeps the exchange on the basic
    /// identifier with raw framing only.
    pub delimited_protocol: Option<ProtocolId>,
}

impl SendRecvConfig {
    /// Options that prefer `id` with delimited framing while still
    /// answering the basic identifier.
    pub fn with_delimited_protocol(id: ProtocolId) -> Self {
        Self {
            delimited_protocol: Some(id),
        }
    }
}

/// Configuration for a transport [`Host`](crate::host::Host).
///
/// Controls the listener address, message size bounds, and the timeouts
/// that keep a slow or hostile peer from parking a task forever.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Local address to bind the stream listener on.
    /// Default: `0.0.0.0:9732`
    pub bind_addr: SocketAddr,

    /// Maximum size of a single serialized message in bytes.
    /// Duty messages are small, but aggregate payloads can approach 1 MB.
    pub max_message_size: usize,

    /// How long an outbound dial may take before it is abandoned (ms).
    pub dial_timeout_ms: u64,

    /// Bound on the protocol negotiation exchange on a fresh stream (ms).
    /// Applied on both ends; a peer that connects and goes silent is cut
    /// off here, before any handler is involved.
    pub negotiation_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9732".parse().expect("valid default bind addr"),
            max_message_size: 1_048_576, // 1 MB
            dial_timeout_ms: 5_000,
            negotiation_timeout_ms: 5_000,
        }
    }
}

impl HostConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_size == 0 {
            return Err(ConfigError::InvalidMaxMessageSize);
        }
        if self.dial_timeout_ms == 0 {
            return Err(ConfigError::InvalidDialTimeout);
        }
        if self.negotiation_timeout_ms == 0 {
            return Err(ConfigError::InvalidNegotiationTimeout);
        }
        Ok(())
    }

    /// Create a config suitable for local testing with shorter timeouts.
    #[cfg(any(test, feature = "dev-context-only-utils"))]
    pub fn dev_default() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".parse().expect("valid dev bind addr"),
            max_message_size: 1_048_576,
            dial_timeout_ms: 1_000,
            negotiation_timeout_ms: 1_000,
        }
    }
}

/// Errors in host configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("max_message_size must be > 0")]
    InvalidMaxMessageSize,
    #[error("dial_timeout_ms must be > 0")]
    InvalidDialTimeout,
    #[error("negotiation_timeout_ms must be > 0")]
    InvalidNegotiationTimeout,
}
