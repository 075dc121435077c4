//! Shared test utilities for Quorate p2p end-to-end tests.
//!
//! Provides host construction over loopback TCP, the duty message types
//! used across the exchange tests, and logging setup.

use {
    quorate_p2p::{Host, HostConfig, PeerId},
    serde::{Deserialize, Serialize},
};

// ─────────────────────────────────────────────────────────────────────────────
// Protocol identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Basic duty identifier, raw framing. The wire name predates delimited
/// framing, hence no suffix.
pub const DUTY_PROTOCOL: &str = "/quorate/duty/1.0.0";

/// Delimited duty identifier.
pub const DUTY_PROTOCOL_DELIMITED: &str = "/quorate/duty_delimited/1.0.0";

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Request naming one duty slot. Signed slots mirror production duty
/// payloads, where a negative slot is representable but never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRequest {
    pub slot: i64,
}

/// Typed response for the round-trip tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub slot: i64,
    pub accepted: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Hosts
// ─────────────────────────────────────────────────────────────────────────────

/// Spin up a listening host on an ephemeral loopback port.
pub async fn spawn_host() -> Host {
    Host::bind(HostConfig::dev_default(), PeerId::new_unique())
        .await
        .expect("bind host")
}

/// Server plus client, with the client able to dial the server.
pub async fn host_pair() -> (Host, Host) {
    let server = spawn_host().await;
    let client = spawn_host().await;
    client.add_peer_addr(server.identity(), server.local_addr());
    (server, client)
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Initialize env_logger once for test output.
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
