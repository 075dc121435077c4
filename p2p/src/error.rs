//! Error types for the peer-to-peer messaging layer.

use {
    crate::{peer::PeerId, protocol::ProtocolId},
    thiserror::Error,
};

/// Errors that can occur while sending, receiving, or dispatching requests.
#[derive(Error, Debug)]
pub enum P2pError {
    /// The remote peer supports none of the offered protocol identifiers.
    ///
    /// The rendering is stable: downstream callers match on the
    /// `"protocols not supported"` substring to tell a capability mismatch
    /// apart from a transient transport failure.
    #[error("protocols not supported by peer {peer}: offered {offered:?}")]
    ProtocolsNotSupported {
        /// The peer that rejected the offer.
        peer: PeerId,
        /// The identifiers offered, most preferred first.
        offered: Vec<ProtocolId>,
    },

    /// Transport-level I/O error. `op` names the phase that failed.
    #[error("{op}: {source}")]
    Io {
        /// The operation that failed (e.g. `"dial"`, `"read frame header"`).
        op: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A bounded operation did not complete in time.
    #[error("{op} timed out after {ms}ms")]
    Timeout {
        /// The operation that timed out.
        op: &'static str,
        /// The configured bound.
        ms: u64,
    },

    /// Failed to serialize or deserialize a message.
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The stream closed before a declared frame length was consumed.
    #[error("stream closed mid-frame (expected {expected} bytes)")]
    TruncatedFrame {
        /// Bytes the length prefix promised.
        expected: usize,
    },

    /// Message exceeds the maximum allowed size.
    #[error("message too large: {size} bytes (max {max} bytes)")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The peer has no entry in the address book.
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// A handler is already installed for this protocol identifier.
    ///
    /// Registration is setup-time configuration; colliding registrations
    /// are a bug in the caller, not a runtime condition.
    #[error("handler already registered for protocol {0}")]
    HandlerExists(ProtocolId),

    /// The negotiation exchange itself was malformed.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// The host configuration is invalid.
    #[error("invalid host configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl P2pError {
    /// Wrap an I/O error with the phase that produced it.
    pub(crate) fn io(op: &'static str, source: std::io::Error) -> Self {
        Self::Io { op, source }
    }
}

/// Convenience result type for messaging-layer operations.
pub type Result<T> = std::result::Result<T, P2pError>;
