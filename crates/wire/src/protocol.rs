// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message types exchanged on the per-peer control connection.
//!
//! [`PeerRequest`] is sent coordinator → collector; [`PeerMessage`] is sent
//! collector → coordinator (both acknowledgements and unsolicited reports).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Whether a collector is being started for the first time or recovering
/// from a crash. Peers use this to decide whether to discard stale local
/// state before applying `config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootMode {
    Boot,
    Reboot,
}

/// Parameters handed to a collector at `init` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitConfig {
    pub interval_ms: u64,
    pub topn: u32,
    pub smp: bool,
}

/// Outcome reported back for a request that can fail in a known way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Ok,
    Error(String),
}

/// Requests the coordinator sends down a peer control connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PeerRequest {
    /// Handshake replacing dynamic code push: ask the peer to confirm it is
    /// running a compatible build.
    CheckVersion { expected: String },
    /// Boot (or reboot) the collector with the given configuration and mode.
    Init { config: InitConfig, mode: BootMode },
    /// Resume sampling on an already-initialized collector. Fire-and-forget.
    StartCollect,
    /// Suspend sampling without tearing the collector down.
    StopCollect,
    /// Ask the peer to announce the files it has accumulated, naming this
    /// coordinator so the peer knows who to address `PullAck`s to.
    Pull { coordinator: String },
    /// Ask the collector to open the given address and stream `file` as raw
    /// bytes, then close. Sent once per file the peer announced via `PullAck`.
    TransReq { addr: SocketAddr, file: String },
    /// Liveness check, sent on a fixed interval to a live peer; any reply
    /// (including a version mismatch) counts as a sign of life.
    Ping,
    /// Best-effort notice that this coordinator is retiring the peer.
    Quit,
}

/// Messages the coordinator receives from a peer control connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PeerMessage {
    /// Reply to any request that either succeeds or fails cleanly.
    Ack(Outcome),
    /// One file this peer has accumulated and would like pulled. A peer may
    /// send zero, one, or several of these in reply to a single `Pull`.
    PullAck { file: String },
}
