// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use muster_wire::{Outcome, PeerMessage, PeerRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

struct AlwaysMeshed;

#[async_trait::async_trait]
impl MeshFlag for AlwaysMeshed {
    async fn is_meshed(&self) -> bool {
        true
    }
}

struct NeverMeshed;

#[async_trait::async_trait]
impl MeshFlag for NeverMeshed {
    async fn is_meshed(&self) -> bool {
        false
    }
}

/// Acks everything, and always reports `ok` for transfers it is asked about.
struct AckAllTransport {
    reboot_acks: Mutex<VecDeque<bool>>,
}

impl AckAllTransport {
    fn new() -> Self {
        Self { reboot_acks: Mutex::new(VecDeque::new()) }
    }
}

#[async_trait::async_trait]
impl PeerTransport for AckAllTransport {
    async fn send(&self, _peer: PeerId, _addr: SocketAddr, request: PeerRequest) -> std::io::Result<PeerMessage> {
        match request {
            PeerRequest::Init { .. } => {
                let ok = self.reboot_acks.lock().pop_front().unwrap_or(true);
                Ok(PeerMessage::Ack(if ok { Outcome::Ok } else { Outcome::Error("nope".into()) }))
            }
            PeerRequest::TransReq { addr, file } => {
                // Connect back and immediately close, simulating an empty
                // but successful transfer.
                let mut stream = tokio::net::TcpStream::connect(addr).await?;
                use tokio::io::AsyncWriteExt;
                stream.write_all(file.as_bytes()).await?;
                stream.shutdown().await?;
                Ok(PeerMessage::Ack(Outcome::Ok))
            }
            _ => Ok(PeerMessage::Ack(Outcome::Ok)),
        }
    }
}

fn addr() -> SocketAddr {
    "127.0.0.1:9000".parse().expect("valid addr")
}

async fn spawn_ready_coordinator() -> (Coordinator, tempfile::TempDir) {
    let home = tempfile::tempdir().expect("tempdir failed");
    let coordinator = Coordinator::spawn(
        Config::default(),
        home.path().to_path_buf(),
        Arc::new(AckAllTransport::new()),
        Arc::new(AlwaysMeshed),
        vec![(PeerId::new(), addr())],
    );
    // Give the startup chain (two 300ms sleeps) time to finish.
    tokio::time::sleep(Duration::from_millis(700)).await;
    (coordinator, home)
}

#[tokio::test]
async fn status_reports_enrolled_peers_after_startup() {
    let (coordinator, _home) = spawn_ready_coordinator().await;
    let status = coordinator.status().await.expect("status reply");
    assert_eq!(status.collectors.len(), 1);
    assert!(!status.collecting);
}

#[tokio::test]
async fn start_then_stop_collect_round_trips() {
    let (coordinator, _home) = spawn_ready_coordinator().await;

    coordinator.start_collect().await;
    let status = coordinator.status().await.expect("status reply");
    assert!(status.collecting);

    coordinator.stop_collect().await;
    let status = coordinator.status().await.expect("status reply");
    assert!(!status.collecting);
}

#[tokio::test]
async fn start_collect_twice_is_rejected_and_state_stays_collecting() {
    let (coordinator, _home) = spawn_ready_coordinator().await;
    coordinator.start_collect().await;
    coordinator.start_collect().await;
    let status = coordinator.status().await.expect("status reply");
    assert!(status.collecting);
}

#[tokio::test]
async fn start_collect_with_no_peers_is_rejected() {
    let home = tempfile::tempdir().expect("tempdir failed");
    let coordinator = Coordinator::spawn(
        Config::default(),
        home.path().to_path_buf(),
        Arc::new(AckAllTransport::new()),
        Arc::new(AlwaysMeshed),
        vec![],
    );
    tokio::time::sleep(Duration::from_millis(700)).await;

    coordinator.start_collect().await;
    let status = coordinator.status().await.expect("status reply");
    assert!(!status.collecting);
}

#[tokio::test]
async fn death_notice_for_a_stale_token_is_ignored() {
    let (coordinator, _home) = spawn_ready_coordinator().await;
    coordinator.start_collect().await;

    let before = coordinator.status().await.expect("status reply");
    let stale_token = MonitorToken::new();
    coordinator.send(Command::DeathNotice { id: before.collectors[0], token: stale_token }).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let after = coordinator.status().await.expect("status reply");
    assert!(after.collecting);
}

#[tokio::test]
async fn death_notice_with_current_token_rebooks_and_reboot_ack_resumes_collecting() {
    let (tx, _rx) = mpsc::channel(8);
    let mut core = CoordinatorCore {
        roster: Roster::new(),
        rebirths: std::collections::HashMap::new(),
        collecting: true,
        config: Config::default(),
        home: std::env::temp_dir(),
        transport: Arc::new(AckAllTransport::new()),
        started_at: Instant::now(),
        pull_target: None,
        pull_reported: 0,
        repo: None,
        start_clct_time: None,
        end_clct_time: None,
        self_tx: tx,
    };
    let id = PeerId::new();
    core.roster.insert(CollectorHandle::new(id, addr()));
    let current_token = core.roster.get(&id).expect("present").token;

    core.on_death_notice(id, current_token);
    assert!(core.roster.get(&id).is_none(), "the slot must be absent during rebirth-wait, not merely rebooked");
    let &(_, rebooked_token) = core.rebirths.get(&id).expect("rebirth-wait entry recorded");
    assert_ne!(rebooked_token, current_token, "a real death notice must mint a fresh token");

    // Simulate the reboot ack arriving with the fresh token.
    core.on_reboot_acked(id, rebooked_token, true);
    assert!(core.rebirths.get(&id).is_none(), "a confirmed reboot clears the rebirth-wait entry");
    let reborn = core.roster.get(&id).expect("re-inserted after a confirmed reboot");
    assert_eq!(reborn.token, rebooked_token);
    assert!(!reborn.collecting, "not yet marked collecting until resume_collecting is observed");
}

#[tokio::test]
async fn terminate_leaves_the_mailbox_open_for_a_final_status_check() {
    let (coordinator, _home) = spawn_ready_coordinator().await;
    coordinator.terminate().await;
    assert!(coordinator.status().await.is_some());
}

#[tokio::test]
#[serial_test::serial]
async fn mesh_probe_failure_means_status_never_replies() {
    std::env::set_var("MUSTER_MESH_PROBE_MS", "1");
    let home = tempfile::tempdir().expect("tempdir failed");
    let coordinator = Coordinator::spawn(
        Config::default(),
        home.path().to_path_buf(),
        Arc::new(AckAllTransport::new()),
        Arc::new(NeverMeshed),
        vec![],
    );
    // The core task exits during the startup chain; the mailbox is
    // eventually dropped so `status` resolves to `None`.
    let status = coordinator.status().await;
    assert!(status.is_none());
    std::env::remove_var("MUSTER_MESH_PROBE_MS");
}
