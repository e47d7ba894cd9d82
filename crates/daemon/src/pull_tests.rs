// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

struct RefusingTransport;

#[async_trait::async_trait]
impl PeerTransport for RefusingTransport {
    async fn send(&self, _peer: PeerId, _addr: SocketAddr, _request: PeerRequest) -> std::io::Result<PeerMessage> {
        Ok(PeerMessage::Ack(Outcome::Error("no such file".to_string())))
    }

    async fn request_pull(&self, _peer: PeerId, _addr: SocketAddr, _coordinator: &str) -> std::io::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

fn collector_addr() -> SocketAddr {
    "127.0.0.1:9000".parse().expect("valid addr")
}

fn short_accept_timeout() -> std::time::Duration {
    std::time::Duration::from_millis(200)
}

fn no_settle() -> std::time::Duration {
    std::time::Duration::from_millis(0)
}

#[tokio::test]
async fn pull_file_writes_the_streamed_bytes() {
    struct SimpleAck;
    #[async_trait::async_trait]
    impl PeerTransport for SimpleAck {
        async fn send(&self, _peer: PeerId, _addr: SocketAddr, request: PeerRequest) -> std::io::Result<PeerMessage> {
            let PeerRequest::TransReq { addr: listen_addr, .. } = request else {
                panic!("expected TransReq")
            };
            let mut stream = TcpStream::connect(listen_addr).await?;
            stream.write_all(b"sample-bytes").await?;
            stream.shutdown().await?;
            Ok(PeerMessage::Ack(Outcome::Ok))
        }

        async fn request_pull(
            &self,
            _peer: PeerId,
            _addr: SocketAddr,
            _coordinator: &str,
        ) -> std::io::Result<Vec<String>> {
            Ok(vec!["sample.bin".to_string()])
        }
    }

    let repo = tempfile::tempdir().expect("tempdir failed");
    let id = PeerId::new();
    let dest = pull_file(
        repo.path(),
        id,
        collector_addr(),
        "sample.bin",
        &SimpleAck,
        std::time::Duration::from_secs(5),
        no_settle(),
    )
    .await
    .expect("pull_file failed");

    let contents = tokio::fs::read(&dest).await.expect("read back failed");
    assert_eq!(contents, b"sample-bytes");
}

#[tokio::test]
async fn pull_file_propagates_peer_refusal() {
    let repo = tempfile::tempdir().expect("tempdir failed");
    let err = pull_file(
        repo.path(),
        PeerId::new(),
        collector_addr(),
        "missing.bin",
        &RefusingTransport,
        std::time::Duration::from_secs(5),
        no_settle(),
    )
    .await
    .expect_err("expected refusal");
    assert!(matches!(err, PullError::Refused(reason) if reason == "no such file"));
}

#[tokio::test]
async fn pull_file_times_out_if_nobody_connects() {
    struct NeverConnects;
    #[async_trait::async_trait]
    impl PeerTransport for NeverConnects {
        async fn send(&self, _peer: PeerId, _addr: SocketAddr, _request: PeerRequest) -> std::io::Result<PeerMessage> {
            Ok(PeerMessage::Ack(Outcome::Ok))
        }
        async fn request_pull(
            &self,
            _peer: PeerId,
            _addr: SocketAddr,
            _coordinator: &str,
        ) -> std::io::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    let repo = tempfile::tempdir().expect("tempdir failed");
    let err = pull_file(
        repo.path(),
        PeerId::new(),
        collector_addr(),
        "missing.bin",
        &NeverConnects,
        short_accept_timeout(),
        no_settle(),
    )
    .await
    .expect_err("expected accept timeout");
    assert!(matches!(err, PullError::AcceptTimeout));
}

#[test]
fn repo_dir_name_matches_the_doghair_format() {
    let now = Local.with_ymd_and_hms(2026, 3, 5, 9, 7, 2).single().expect("valid time");
    assert_eq!(repo_dir_name(now), "doghair_2026_3_5_9_7_2");
}

#[tokio::test]
async fn create_repo_makes_a_timestamped_directory_under_home() {
    let home = tempfile::tempdir().expect("tempdir failed");
    let now = Local.with_ymd_and_hms(2026, 3, 5, 9, 7, 2).single().expect("valid time");
    let repo = create_repo(home.path(), now).await.expect("create_repo failed");
    assert_eq!(repo, home.path().join("doghair_2026_3_5_9_7_2"));
    assert!(repo.is_dir());
}

#[test]
fn snapshot_pull_target_is_none_for_empty_roster() {
    assert_eq!(snapshot_pull_target(0), None);
    assert_eq!(snapshot_pull_target(3), Some(3));
}

#[test]
fn pull_round_complete_waits_for_every_snapshotted_peer() {
    assert!(!pull_round_complete(Some(3), 2));
    assert!(pull_round_complete(Some(3), 3));
    assert!(pull_round_complete(Some(3), 4));
}
