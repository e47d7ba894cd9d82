// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state core: a single task owning all coordinator state, serializing
//! every transition through one mailbox.
//!
//! Anything that can suspend beyond a short bounded sleep — a peer RPC, a
//! file transfer, the startup mesh probe — runs in an ephemeral
//! [`tokio::spawn`]ed task that reports its outcome back into this same
//! channel. The core task itself never awaits anything but the channel.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use muster_wire::{BootMode, Outcome, PeerMessage, PeerRequest};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::{guard_pull, guard_start_collect, guard_stop_collect, GuardError};
use crate::mesh::MeshFlag;
use crate::peer::PeerTransport;
use crate::roster::{CollectorHandle, MonitorToken, PeerId, Roster};
use crate::state::CoordinatorState;
use crate::{distribute, mesh, pull, supervisor};

const STARTUP_STEP_DELAY: std::time::Duration = std::time::Duration::from_millis(300);

#[derive(Debug)]
pub enum Command {
    /// A collector has joined the cluster and should be added to the roster.
    EnrollPeer { id: PeerId, addr: SocketAddr },
    StartCollect,
    StopCollect,
    Pull,
    Status(oneshot::Sender<CoordinatorState>),
    Terminate,
    /// The control connection to a peer was lost.
    DeathNotice { id: PeerId, token: MonitorToken },
    /// A spawned reboot task observed an ack (or failure) for `id`.
    RebootAcked { id: PeerId, token: MonitorToken, ok: bool },
    /// A spawned pull task finished transferring one file.
    TransDone { id: PeerId, file: String, ok: bool },
}

/// Cheap, `Clone`-able handle to a running coordinator.
#[derive(Clone)]
pub struct Coordinator {
    tx: mpsc::Sender<Command>,
}

impl Coordinator {
    /// Spawn the state core task and run the startup chain. Returns once
    /// the core is ready to accept commands; the startup chain itself
    /// (`check_meshed -> distribute_code -> init_all`) runs inside the task.
    pub fn spawn(
        config: Config,
        home: PathBuf,
        transport: Arc<dyn PeerTransport>,
        mesh_flag: Arc<dyn MeshFlag>,
        initial_peers: Vec<(PeerId, SocketAddr)>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let core = CoordinatorCore {
            roster: Roster::new(),
            rebirths: std::collections::HashMap::new(),
            collecting: false,
            config,
            home,
            transport,
            started_at: Instant::now(),
            pull_target: None,
            pull_reported: 0,
            repo: None,
            start_clct_time: None,
            end_clct_time: None,
            self_tx: tx.clone(),
        };
        tokio::spawn(core.run(rx, mesh_flag, initial_peers));
        Self { tx }
    }

    async fn send(&self, command: Command) {
        if self.tx.send(command).await.is_err() {
            error!("coordinator mailbox closed");
        }
    }

    pub async fn enroll_peer(&self, id: PeerId, addr: SocketAddr) {
        self.send(Command::EnrollPeer { id, addr }).await;
    }

    pub async fn start_collect(&self) {
        self.send(Command::StartCollect).await;
    }

    pub async fn stop_collect(&self) {
        self.send(Command::StopCollect).await;
    }

    pub async fn pull(&self) {
        self.send(Command::Pull).await;
    }

    pub async fn terminate(&self) {
        self.send(Command::Terminate).await;
    }

    pub async fn status(&self) -> Option<CoordinatorState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Status(reply_tx)).await;
        reply_rx.await.ok()
    }
}

struct CoordinatorCore {
    roster: Roster,
    /// Slots in the "rebirth-wait" state: a death notice tentatively
    /// removed the handle from `roster`, and this records the address and
    /// freshly-minted token a confirmed reboot ack must match before the
    /// handle is re-inserted. Absent while a slot is simply `absent` or `live`.
    rebirths: std::collections::HashMap<PeerId, (SocketAddr, MonitorToken)>,
    collecting: bool,
    config: Config,
    home: PathBuf,
    transport: Arc<dyn PeerTransport>,
    started_at: Instant,
    /// Roster size snapshotted at the most recent pull issuance; pull
    /// completion is compared against this, not the live roster size.
    pull_target: Option<usize>,
    /// Files reported `retrieved` in the current (or most recently
    /// completed) pull cycle.
    pull_reported: usize,
    repo: Option<PathBuf>,
    start_clct_time: Option<String>,
    end_clct_time: Option<String>,
    self_tx: mpsc::Sender<Command>,
}

impl CoordinatorCore {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Command>,
        mesh_flag: Arc<dyn MeshFlag>,
        initial_peers: Vec<(PeerId, SocketAddr)>,
    ) {
        if let Err(err) = mesh::probe(mesh_flag.as_ref(), crate::env::mesh_probe_interval()).await {
            error!(error = %err, "fatal: cluster never meshed, aborting startup");
            return;
        }
        tokio::time::sleep(STARTUP_STEP_DELAY).await;

        distribute::distribute_code(&initial_peers, self.transport.as_ref()).await;
        tokio::time::sleep(STARTUP_STEP_DELAY).await;

        if let Err(failed) = self.init_all(initial_peers).await {
            error!(node = %failed, "fatal: initial boot of peer failed or timed out, aborting startup");
            return;
        }
        info!(collectors = self.roster.len(), "coordinator ready");

        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
    }

    /// Boot every connected peer synchronously, one at a time, each bounded
    /// by the per-peer timeout. The first peer that fails or times out
    /// aborts the whole init phase ("timeout is fatal for the whole
    /// init phase; operator must restart").
    async fn init_all(&mut self, peers: Vec<(PeerId, SocketAddr)>) -> Result<(), PeerId> {
        for (id, addr) in peers {
            let request = PeerRequest::Init { config: self.config.into(), mode: BootMode::Boot };
            let outcome =
                tokio::time::timeout(crate::env::peer_timeout(), self.transport.send(id, addr, request)).await;
            match outcome {
                Ok(Ok(PeerMessage::Ack(Outcome::Ok))) => {
                    let token = MonitorToken::new();
                    let cancel = supervisor::spawn_heartbeat(
                        self.self_tx.clone(),
                        self.transport.clone(),
                        id,
                        addr,
                        token,
                        crate::env::heartbeat_interval(),
                    );
                    self.roster.insert(CollectorHandle::new_with_token(id, addr, token).with_heartbeat_cancel(cancel));
                    info!(node = %id, "peer booted");
                }
                Ok(Ok(other)) => {
                    warn!(node = %id, ?other, "peer rejected boot");
                    return Err(id);
                }
                Ok(Err(err)) => {
                    warn!(node = %id, error = %err, "peer boot failed");
                    return Err(id);
                }
                Err(_) => {
                    warn!(node = %id, "peer boot timed out");
                    return Err(id);
                }
            }
        }
        Ok(())
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::EnrollPeer { id, addr } => {
                self.roster.insert(CollectorHandle::new(id, addr));
                info!(node = %id, "peer enrolled");
            }
            Command::StartCollect => match guard_start_collect(self.collecting, &self.roster) {
                Ok(()) => {
                    self.collecting = true;
                    self.start_clct_time = Some(now_string());
                    self.end_clct_time = None;
                    for handle in self.roster.values_mut() {
                        handle.collecting = true;
                    }
                    info!("collecting started");
                    self.fan_out_start_collect();
                }
                Err(err) => self.log_guard_rejection(err),
            },
            Command::StopCollect => match guard_stop_collect(self.collecting) {
                Ok(()) => {
                    self.collecting = false;
                    self.end_clct_time = Some(now_string());
                    for handle in self.roster.values_mut() {
                        handle.collecting = false;
                    }
                    info!("collecting stopped");
                    self.fan_out_stop_collect();
                }
                Err(err) => self.log_guard_rejection(err),
            },
            Command::Pull => match guard_pull(self.collecting) {
                Ok(()) => self.begin_pull().await,
                Err(err) => self.log_guard_rejection(err),
            },
            Command::Status(reply) => {
                let state = CoordinatorState {
                    collecting: self.collecting,
                    collectors: self.roster.ids().cloned().collect(),
                    config: self.config,
                    uptime_ms: self.started_at.elapsed().as_millis() as u64,
                    pull_target: self.pull_target,
                    start_clct_time: self.start_clct_time.clone(),
                    end_clct_time: self.end_clct_time.clone(),
                    repo: self.repo.clone(),
                    transferred: self.pull_reported,
                };
                let _ = reply.send(state);
            }
            Command::Terminate => self.shutdown(),
            Command::DeathNotice { id, token } => self.on_death_notice(id, token),
            Command::RebootAcked { id, token, ok } => self.on_reboot_acked(id, token, ok),
            Command::TransDone { id, file, ok } => {
                self.pull_reported += 1;
                if ok {
                    info!(node = %id, file, "transfer reported done");
                } else {
                    warn!(node = %id, file, "transfer reported failed");
                }
                if pull::pull_round_complete(self.pull_target, self.pull_reported) {
                    info!("data on all nodes transfered");
                }
            }
        }
    }

    fn log_guard_rejection(&self, err: GuardError) {
        warn!(%err, "lifecycle guard rejected request");
    }

    /// Fan out `start_collect` to every live peer. No stagger: only
    /// `stop_collect`/`quit` need one, to avoid peers racing each other.
    fn fan_out_start_collect(&self) {
        let transport = self.transport.clone();
        let peers: Vec<(PeerId, SocketAddr)> = self.roster.values().map(|h| (h.id, h.addr)).collect();
        tokio::spawn(async move {
            for (id, addr) in peers {
                if let Err(err) = transport.send(id, addr, PeerRequest::StartCollect).await {
                    warn!(node = %id, error = %err, "start_collect delivery failed");
                }
            }
        });
    }

    /// Fan out `stop_collect` to every live peer, staggered ~100ms apart
    /// to avoid remote races.
    fn fan_out_stop_collect(&self) {
        let transport = self.transport.clone();
        let peers: Vec<(PeerId, SocketAddr)> = self.roster.values().map(|h| (h.id, h.addr)).collect();
        tokio::spawn(async move {
            for (i, (id, addr)) in peers.into_iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(crate::env::fan_out_stagger()).await;
                }
                if let Err(err) = transport.send(id, addr, PeerRequest::StopCollect).await {
                    warn!(node = %id, error = %err, "stop_collect delivery failed");
                }
            }
        });
    }

    /// Create a fresh timestamped repository, snapshot the roster size,
    /// then ask each live peer which files it has and pull every one of
    /// them over its own ephemeral TCP connection.
    async fn begin_pull(&mut self) {
        let repo_path = match pull::create_repo(&self.home, chrono::Local::now()).await {
            Ok(path) => path,
            Err(err) => {
                error!(error = %err, home = %self.home.display(), "failed to create pull repository");
                return;
            }
        };
        self.repo = Some(repo_path.clone());
        self.pull_target = pull::snapshot_pull_target(self.roster.len());
        self.pull_reported = 0;
        info!(repo = %repo_path.display(), target = ?self.pull_target, "pull cycle started");

        let coordinator_id = crate::env::coordinator_identity();
        for handle in self.roster.values() {
            let id = handle.id;
            let addr = handle.addr;
            let repo_path = repo_path.clone();
            let transport = self.transport.clone();
            let reply_tx = self.self_tx.clone();
            let coordinator_id = coordinator_id.clone();
            tokio::spawn(async move {
                let files = match transport.request_pull(id, addr, &coordinator_id).await {
                    Ok(files) => files,
                    Err(err) => {
                        warn!(node = %id, error = %err, "pull request failed");
                        return;
                    }
                };
                for file in files {
                    let transport = transport.clone();
                    let reply_tx = reply_tx.clone();
                    let repo_path = repo_path.clone();
                    tokio::spawn(async move {
                        let ok = pull::pull_file(
                            &repo_path,
                            id,
                            addr,
                            &file,
                            transport.as_ref(),
                            crate::env::pull_accept_timeout(),
                            crate::env::pull_listener_settle(),
                        )
                        .await
                        .is_ok();
                        let _ = reply_tx.send(Command::TransDone { id, file, ok }).await;
                    });
                }
            });
        }
    }

    /// A connection-loss notice only matters if it names the node's
    /// *current* token; a notice for an already-replaced token is stale.
    ///
    /// The handle is removed from the roster immediately — not mutated in
    /// place — so the slot is genuinely `absent` for the whole rebirth-wait
    /// window: a `status`/pull-target snapshot taken while the reboot is
    /// still in flight must not count this peer as live.
    fn on_death_notice(&mut self, id: PeerId, token: MonitorToken) {
        let Some(handle) = self.roster.get(&id) else {
            return;
        };
        if handle.token != token {
            return;
        }
        warn!(node = %id, "peer connection lost, rebooting");
        let addr = handle.addr;
        self.roster.remove(&id);
        let new_token = MonitorToken::new();
        self.rebirths.insert(id, (addr, new_token));

        let transport = self.transport.clone();
        let config = self.config;
        let reply_tx = self.self_tx.clone();
        tokio::spawn(async move {
            let ok = supervisor::reboot(transport.as_ref(), id, addr, config).await;
            let _ = reply_tx.send(Command::RebootAcked { id, token: new_token, ok }).await;
        });
    }

    /// Re-inserts the handle into the roster only once the reboot is
    /// confirmed `ok`; a failed or timed-out reboot just drops the
    /// rebirth-wait entry, leaving the slot permanently `absent`.
    fn on_reboot_acked(&mut self, id: PeerId, token: MonitorToken, ok: bool) {
        let Some(&(addr, pending_token)) = self.rebirths.get(&id) else {
            return;
        };
        if pending_token != token {
            return;
        }
        self.rebirths.remove(&id);
        if !ok {
            error!(node = %id, "peer failed to reboot, collector goes home");
            return;
        }
        let cancel = supervisor::spawn_heartbeat(
            self.self_tx.clone(),
            self.transport.clone(),
            id,
            addr,
            token,
            crate::env::heartbeat_interval(),
        );
        self.roster.insert(CollectorHandle::new_with_token(id, addr, token).with_heartbeat_cancel(cancel));
        info!(node = %id, "peer rebirth");

        // Decided now, with the *current* collecting flag — not the one at
        // the moment the death notice arrived.
        if !self.collecting {
            return;
        }
        let transport = self.transport.clone();
        let config = self.config;
        tokio::spawn(async move {
            supervisor::resume_collecting(transport.as_ref(), id, addr, config).await;
        });
    }

    /// Coordinated shutdown: retire the roster,
    /// notify every peer to quit (staggered), give them a moment to drain,
    /// then unload. None of this blocks the mailbox — it is entirely
    /// offloaded to a spawned task after the state change is applied.
    fn shutdown(&mut self) {
        info!("coordinator shutting down, retiring roster");
        self.collecting = false;
        self.rebirths.clear();
        let handles = self.roster.retire();
        let transport = self.transport.clone();
        tokio::spawn(async move {
            for (i, handle) in handles.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(crate::env::fan_out_stagger()).await;
                }
                if let Err(err) = transport.send(handle.id, handle.addr, PeerRequest::Quit).await {
                    warn!(node = %handle.id, error = %err, "quit delivery failed");
                }
            }
            tokio::time::sleep(crate::env::shutdown_drain()).await;
            for handle in &handles {
                distribute::unload(handle.id, handle.addr, transport.as_ref()).await;
            }
            info!("coordinator shutdown sequence complete");
        });
    }
}

fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
#[path = "core_tests.rs"]
mod tests;
