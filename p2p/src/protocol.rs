//! Protocol identifiers, framing modes, and candidate resolution.
//!
//! A logical exchange can be reachable under more than one protocol
//! identifier at once, each identifier bound to its own wire framing. That
//! is how framing upgrades roll out across a fleet that is never restarted
//! in lockstep: new nodes register and prefer the delimited identifier
//! while still answering the original one, and negotiation picks the best
//! identifier both ends share.

use {
    crate::config::SendRecvConfig,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Versioned name of one negotiable wire variant of an exchange, e.g.
/// `/quorate/duty/1.0.0`. Opaque to this layer; only equality matters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolId(String);

impl ProtocolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Wire framing bound to a protocol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// `[u32-le payload length][payload]`. Message boundaries are explicit,
    /// so a stream can carry a reply without being closed first.
    Delimited,
    /// Bare payload terminated by the writer closing its write side.
    /// Predates the length prefix; kept for peers that never upgraded.
    Raw,
}

/// A protocol identifier paired with the framing its streams use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolCandidate {
    pub id: ProtocolId,
    pub framing: FramingMode,
}

/// Builds the ordered candidate list for one send or registration.
///
/// The basic identifier always uses raw framing. When `config` names a
/// delimited identifier it is preferred, so it sorts first. When the
/// delimited identifier equals the basic one the caller has opted the
/// legacy name itself into delimited framing, and the list collapses to
/// that single candidate. An empty delimited identifier is treated as
/// absent.
///
/// Pure function of its inputs; negotiation happens elsewhere.
pub fn candidate_protocols(basic: &ProtocolId, config: &SendRecvConfig) -> Vec<ProtocolCandidate> {
    // An empty identifier cannot be negotiated.
    let delimited = config
        .delimited_protocol
        .as_ref()
        .filter(|id| !id.as_str().is_empty());
    match delimited {
        Some(delimited) if delimited == basic => vec![ProtocolCandidate {
            id: delimited.clone(),
            framing: FramingMode::Delimited,
        }],
        Some(delimited) => vec![
            ProtocolCandidate {
                id: delimited.clone(),
                framing: FramingMode::Delimited,
            },
            ProtocolCandidate {
                id: basic.clone(),
                framing: FramingMode::Raw,
            },
        ],
        None => vec![ProtocolCandidate {
            id: basic.clone(),
            framing: FramingMode::Raw,
        }],
    }
}
