// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code distribution, redesigned as a version-check handshake.
//!
//! A portable coordinator cannot push compiled bytecode to peers the way
//! the original cluster-sampling design did. `distribute_code` degenerates
//! into asking every connected peer to confirm it is running a compatible
//! build; mismatches and failures are logged but never abort startup.
//! `unload` is a best-effort retirement notice with no retries.
//!
//! This runs *before* `init_all` populates the roster (the startup
//! chain is `check_meshed -> distribute_code -> init_all`), so it takes the
//! externally-discovered set of connected peers directly rather than the
//! (still empty) roster.

use std::net::SocketAddr;

use muster_wire::{PeerMessage, PeerRequest};
use tracing::{info, warn};

use crate::peer::PeerTransport;
use crate::roster::PeerId;

pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Send a `CheckVersion` request to every currently-connected peer.
pub async fn distribute_code(peers: &[(PeerId, SocketAddr)], transport: &dyn PeerTransport) {
    for (id, addr) in peers {
        let request = PeerRequest::CheckVersion { expected: PROTOCOL_VERSION.to_string() };
        match transport.send(*id, *addr, request).await {
            Ok(PeerMessage::Ack(muster_wire::Outcome::Ok)) => {
                info!(node = %id, "peer confirmed compatible version");
            }
            Ok(PeerMessage::Ack(muster_wire::Outcome::Error(reason))) => {
                warn!(node = %id, reason, "peer reported a version mismatch");
            }
            Ok(other) => {
                warn!(node = %id, ?other, "unexpected reply to version check");
            }
            Err(err) => {
                warn!(node = %id, error = %err, "version check failed");
            }
        }
    }
}

/// Best-effort retirement notice for a peer being removed from the roster.
pub async fn unload(id: crate::roster::PeerId, addr: std::net::SocketAddr, transport: &dyn PeerTransport) {
    if let Err(err) = transport.send(id, addr, PeerRequest::Quit).await {
        warn!(node = %id, error = %err, "best-effort quit notice failed");
    }
}

#[cfg(test)]
#[path = "distribute_tests.rs"]
mod tests;
