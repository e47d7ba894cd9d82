// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoordinatorError;

/// Resolve the pull-destination root: MUSTER_HOME > the platform state
/// directory (XDG_STATE_HOME on Linux) > $HOME/.local/state, each with a
/// `muster` subdirectory.
pub fn muster_home() -> Result<PathBuf, CoordinatorError> {
    if let Ok(dir) = std::env::var("MUSTER_HOME") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .map(|base| base.join("muster"))
        .ok_or(CoordinatorError::NoHome)
}

/// Peer control-connection i/o timeout.
pub fn peer_timeout() -> Duration {
    std::env::var("MUSTER_PEER_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Mesh probe retry spacing.
pub fn mesh_probe_interval() -> Duration {
    std::env::var("MUSTER_MESH_PROBE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Spacing between liveness pings sent to each live peer.
pub fn heartbeat_interval() -> Duration {
    std::env::var("MUSTER_HEARTBEAT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}

/// How long the coordinator waits, after sending `quit` to every peer, for
/// them to drain before unloading their collector module.
pub fn shutdown_drain() -> Duration {
    std::env::var("MUSTER_SHUTDOWN_DRAIN_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(3))
}

/// Stagger between successive peers when fanning out `stop_collect` or `quit`.
pub fn fan_out_stagger() -> Duration {
    std::env::var("MUSTER_FAN_OUT_STAGGER_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(100))
}

/// Settle time between opening a pull listener and replying with `trans_req`,
/// giving the receiver task time to start accepting.
pub fn pull_listener_settle() -> Duration {
    std::env::var("MUSTER_PULL_SETTLE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(500))
}

/// How long a per-file transfer listener waits for the peer to connect
/// before the file is abandoned (default 5s, scoped to that file only).
pub fn pull_accept_timeout() -> Duration {
    std::env::var("MUSTER_PULL_ACCEPT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Identity this coordinator presents to peers in `pull` requests.
pub fn coordinator_identity() -> String {
    std::env::var("MUSTER_COORDINATOR_ID").unwrap_or_else(|_| format!("coordinator-{}", std::process::id()))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
