//! Peer identities.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Opaque 32-byte identity of a peer on the network.
///
/// Serves as the address-book key for outbound streams and names the remote
/// end of every inbound request. The identity is self-reported during
/// protocol negotiation; authenticating it against transport credentials is
/// the job of the layer that owns the keys, not this one.
///
/// Rendered as base58 in logs, like any other validator identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId([u8; 32]);

impl PeerId {
    /// Wraps raw identity bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrows the raw identity bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns a process-unique identity. Test setup only; the identities
    /// produced here are trivially forgeable.
    pub fn new_unique() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        Self(bytes)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(bs58::encode(self.0).into_string().as_str())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
