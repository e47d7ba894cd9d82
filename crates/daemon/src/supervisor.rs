// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness supervision: react to a peer's connection loss by rebooting it,
//! then deciding whether to resume sampling on it.
//!
//! The reboot-then-maybe-start decision is deliberately sequential, not
//! raced: a peer is only sent `start_collect` after its reboot is
//! acknowledged, and only if the cluster is still collecting at that later
//! point in time (checked by the state core when the ack arrives, not when
//! the reboot was issued).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use muster_wire::{BootMode, Outcome, PeerMessage, PeerRequest};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::Config;
use crate::env::peer_timeout;
use crate::peer::PeerTransport;
use crate::roster::{MonitorToken, PeerId};

/// Send an `Init` request in reboot mode to bring a crashed peer back up.
/// Bounded by the per-peer timeout; a timeout counts as a
/// failure, shrinking the roster exactly like an explicit `fail` reply.
/// Returns whether the peer acknowledged successfully.
pub async fn reboot(transport: &dyn PeerTransport, id: PeerId, addr: SocketAddr, config: Config) -> bool {
    let request = PeerRequest::Init { config: config.into(), mode: BootMode::Reboot };
    match tokio::time::timeout(peer_timeout(), transport.send(id, addr, request)).await {
        Ok(Ok(PeerMessage::Ack(Outcome::Ok))) => {
            info!(node = %id, "peer rebooted");
            true
        }
        Ok(Ok(PeerMessage::Ack(Outcome::Error(reason)))) => {
            warn!(node = %id, reason, "peer reboot rejected");
            false
        }
        Ok(Ok(other)) => {
            warn!(node = %id, ?other, "unexpected reply to reboot request");
            false
        }
        Ok(Err(err)) => {
            warn!(node = %id, error = %err, "peer reboot failed");
            false
        }
        Err(_) => {
            warn!(node = %id, "peer reboot timed out, collector goes home");
            false
        }
    }
}

/// Resume sampling on a freshly-rebooted peer. Only called once the reboot
/// ack has been observed and the cluster is still collecting.
pub async fn resume_collecting(transport: &dyn PeerTransport, id: PeerId, addr: SocketAddr, _config: Config) -> bool {
    match transport.send(id, addr, PeerRequest::StartCollect).await {
        Ok(PeerMessage::Ack(Outcome::Ok)) => {
            info!(node = %id, "peer resumed collecting after reboot");
            true
        }
        Ok(PeerMessage::Ack(Outcome::Error(reason))) => {
            warn!(node = %id, reason, "peer refused to resume collecting");
            false
        }
        Ok(other) => {
            warn!(node = %id, ?other, "unexpected reply to resume request");
            false
        }
        Err(err) => {
            warn!(node = %id, error = %err, "resume after reboot failed");
            false
        }
    }
}

/// Spawn the liveness-detection task for one roster slot.
///
/// A portable coordinator has no built-in process monitor, so connection
/// loss is synthesized here: ping the peer on a fixed interval, and the
/// first send that fails is treated as the death notice the liveness supervisor
/// reacts to. The returned sender cancels the task (dropping a
/// [`crate::roster::CollectorHandle`] drops it too, since the handle owns
/// the paired receiver).
pub fn spawn_heartbeat(
    self_tx: mpsc::Sender<crate::core::Command>,
    transport: Arc<dyn PeerTransport>,
    id: PeerId,
    addr: SocketAddr,
    token: MonitorToken,
    interval: Duration,
) -> oneshot::Sender<()> {
    let (cancel_tx, mut cancel_rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick is immediate; skip it so we don't ping right after boot
        loop {
            tokio::select! {
                _ = &mut cancel_rx => return,
                _ = ticker.tick() => {
                    if transport.send(id, addr, PeerRequest::Ping).await.is_err() {
                        warn!(node = %id, "heartbeat ping failed, reporting death");
                        let _ = self_tx.send(crate::core::Command::DeathNotice { id, token }).await;
                        return;
                    }
                }
            }
        }
    });
    cancel_tx
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
