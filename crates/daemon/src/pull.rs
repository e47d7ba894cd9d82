// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pull coordination: fetch each collector's accumulated sample files over a
//! dedicated, ephemeral, unframed TCP connection per file.
//!
//! Ordering is load-bearing (P7): the coordinator must open its listener
//! *before* sending the `trans_req` that tells the peer where to connect,
//! or a fast peer could race the coordinator and find nothing listening.
//! `pull_file` spawns the accept/receive side before sleeping out the
//! settle window and sending `trans_req`, so the ordering holds regardless
//! of how the caller schedules it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Timelike};
use muster_wire::{Outcome, PeerMessage, PeerRequest};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::peer::PeerTransport;
use crate::roster::PeerId;

#[derive(Debug, thiserror::Error)]
pub enum PullError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer refused the transfer: {0}")]
    Refused(String),
    #[error("peer sent an unexpected reply to the transfer request")]
    UnexpectedReply,
    #[error("no peer connected to the transfer listener within the accept timeout")]
    AcceptTimeout,
}

/// Name a fresh repository directory the way the source does:
/// `doghair_<Y>_<M>_<D>_<H>_<Min>_<S>`.
pub fn repo_dir_name(now: DateTime<Local>) -> String {
    format!(
        "doghair_{}_{}_{}_{}_{}_{}",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

/// Create a fresh, timestamped repository directory under `home`.
pub async fn create_repo(home: &Path, now: DateTime<Local>) -> std::io::Result<PathBuf> {
    let dir = home.join(repo_dir_name(now));
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Pull one file from `peer` into `repo/<file>`.
///
/// The listener is bound and its accept loop spawned *before* `trans_req` is
/// sent (P7); a single file's failure (accept timeout, refusal, read error)
/// never aborts a larger pull round — callers scope each file's error
/// independently.
pub async fn pull_file(
    repo: &Path,
    id: PeerId,
    addr: SocketAddr,
    file: &str,
    transport: &dyn PeerTransport,
    accept_timeout: Duration,
    settle: Duration,
) -> Result<PathBuf, PullError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let listen_addr = listener.local_addr()?;
    let dest = repo.join(file);
    let dest_for_task = dest.clone();

    // Chunks are appended to the destination file as they arrive rather
    // than buffered in memory, since sample files are arbitrary-size.
    let accept = tokio::spawn(async move {
        let (mut stream, _) = tokio::time::timeout(accept_timeout, listener.accept())
            .await
            .map_err(|_| PullError::AcceptTimeout)??;
        let mut out = File::create(&dest_for_task).await?;
        let copied = tokio::io::copy(&mut stream, &mut out).await?;
        out.flush().await?;
        Ok::<u64, PullError>(copied)
    });

    tokio::time::sleep(settle).await;

    let request = PeerRequest::TransReq { addr: listen_addr, file: file.to_string() };
    match transport.send(id, addr, request).await? {
        PeerMessage::Ack(Outcome::Ok) => {}
        PeerMessage::Ack(Outcome::Error(reason)) => return Err(PullError::Refused(reason)),
        _ => return Err(PullError::UnexpectedReply),
    }

    let bytes = accept.await.map_err(|_| PullError::UnexpectedReply)??;

    info!(node = %id, file, bytes, "pulled file");
    Ok(dest)
}

/// Snapshot the roster size at pull issuance; the pull round is considered
/// complete once this many distinct files have been reported `retrieved`,
/// even if the roster shrinks (nodes leave) while the round is in flight —
/// rather than comparing against a live roster.
pub fn snapshot_pull_target(roster_size: usize) -> Option<usize> {
    if roster_size == 0 {
        None
    } else {
        Some(roster_size)
    }
}

/// True once every node present at issuance has reported in.
pub fn pull_round_complete(pull_target: Option<usize>, transferred: usize) -> bool {
    match pull_target {
        Some(target) => transferred >= target,
        None => {
            warn!("pull completion checked with no target snapshotted");
            true
        }
    }
}

#[cfg(test)]
#[path = "pull_tests.rs"]
mod tests;
