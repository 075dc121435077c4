//! Quorate Peer-to-Peer Messaging Layer
//!
//! This crate provides the request/response messaging between the nodes of
//! a Quorate cluster. Duty coordination traffic is low-rate but
//! correctness-critical, so the layer is built around one-shot exchanges
//! with explicit acknowledgements rather than fire-and-forget streams:
//!
//! - **Typed exchanges**: requests and responses are plain serde types,
//!   serialized with bincode.
//! - **Per-stream protocol negotiation**: a logical exchange can be
//!   published under several protocol identifiers at once, each bound to
//!   its own wire framing, and every fresh stream picks the best
//!   identifier both ends share. That is how the delimited framing rolled
//!   out without flag-day upgrades, and how the next framing will too.
//! - **Uniform acknowledgements**: every request a handler processes is
//!   answered on the wire, so senders distinguish "the peer handled it"
//!   from "the peer never saw it" without heuristics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Application (duty engines, cluster ops)     │
//! │   sender::send / send_receive    handlers    │
//! └───────────────┬──────────────────────┬───────┘
//!                 │                      │
//! ┌───────────────▼──────────┐  ┌────────▼───────────────┐
//! │  sender (round trips)    │  │  dispatch (registry,   │
//! │                          │  │  decode, ack contract) │
//! └───────────────┬──────────┘  └────────┬───────────────┘
//!                 │                      │
//! ┌───────────────▼──────────────────────▼───────┐
//! │  host (listener, address book, negotiation)  │
//! │  codec (delimited and raw framings)          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]    | `HostConfig` and per-exchange `SendRecvConfig` |
//! | [`peer`]      | `PeerId` identities |
//! | [`protocol`]  | Protocol identifiers, framings, candidate resolution |
//! | [`codec`]     | Delimited and raw wire framings, bincode helpers |
//! | [`host`]      | TCP listener, address book, stream negotiation |
//! | [`dispatch`]  | Handler registration and inbound dispatch |
//! | [`sender`]    | One-shot request/response round trips |
//! | [`metrics`]   | Host counters |
//! | [`error`]     | Crate-wide error enum |

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod metrics;
mod negotiate;
pub mod peer;
pub mod protocol;
pub mod sender;

// Re-exports for convenience
pub use config::{HostConfig, SendRecvConfig};
pub use dispatch::{register_handler, HandlerReply};
pub use error::{P2pError, Result};
pub use host::{Host, InboundStream, NegotiatedStream, StreamHandler};
pub use metrics::{HostMetrics, MetricsSnapshot};
pub use peer::PeerId;
pub use protocol::{candidate_protocols, FramingMode, ProtocolCandidate, ProtocolId};
pub use sender::{send, send_receive};
