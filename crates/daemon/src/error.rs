// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error hierarchy for the coordinator.

use crate::roster::PeerId;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("cluster can not be meshed")]
    NotMeshed,
}

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("peer {0} not found in roster")]
    NotFound(PeerId),
    #[error("i/o error talking to peer {node}: {source}")]
    Io { node: PeerId, #[source] source: std::io::Error },
    #[error("peer {0} timed out")]
    Timeout(PeerId),
    #[error("protocol error: {0}")]
    Protocol(#[from] muster_wire::WireError),
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error("initial boot of peer {0} failed or timed out")]
    InitFailed(PeerId),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not determine a home directory for pulled files (set MUSTER_HOME or HOME)")]
    NoHome,
}
