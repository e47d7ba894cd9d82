// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport boundary to a collector's persistent control connection.

use std::net::SocketAddr;

use muster_wire::{PeerMessage, PeerRequest, WireError};
use tokio::net::TcpStream;
use tracing::warn;

use crate::roster::PeerId;

/// One request/reply round-trip on a peer's control connection.
///
/// A real deployment's collector process is out of scope; this trait is the
/// seam a production binary plugs a concrete transport into.
#[async_trait::async_trait]
pub trait PeerTransport: Send + Sync {
    async fn send(&self, peer: PeerId, addr: SocketAddr, request: PeerRequest) -> std::io::Result<PeerMessage>;

    /// Ask `peer` to announce every file it has accumulated. The peer
    /// answers with zero or more `PullAck` frames on this same connection,
    /// then closes it to signal it is done announcing — each peer may
    /// announce one or more files.
    async fn request_pull(
        &self,
        peer: PeerId,
        addr: SocketAddr,
        coordinator: &str,
    ) -> std::io::Result<Vec<String>>;
}

/// Opens a fresh TCP connection per request, writes one framed
/// [`PeerRequest`], and reads back exactly one framed [`PeerMessage`].
///
/// Collectors that want a persistent connection may keep one open and
/// answer on it; this coordinator-side implementation does not assume
/// connection reuse, matching the fire-and-forget nature of most requests.
pub struct TcpPeerTransport;

#[async_trait::async_trait]
impl PeerTransport for TcpPeerTransport {
    async fn send(&self, _peer: PeerId, addr: SocketAddr, request: PeerRequest) -> std::io::Result<PeerMessage> {
        let mut stream = TcpStream::connect(addr).await?;
        muster_wire::write_request(&mut stream, &request)
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        muster_wire::read_reply(&mut stream)
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    async fn request_pull(
        &self,
        peer: PeerId,
        addr: SocketAddr,
        coordinator: &str,
    ) -> std::io::Result<Vec<String>> {
        let mut stream = TcpStream::connect(addr).await?;
        muster_wire::write_request(&mut stream, &PeerRequest::Pull { coordinator: coordinator.to_string() })
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let mut files = Vec::new();
        loop {
            match muster_wire::read_reply(&mut stream).await {
                Ok(PeerMessage::PullAck { file }) => files.push(file),
                Ok(other) => {
                    warn!(node = %peer, ?other, "unexpected reply while collecting pull announcements");
                }
                Err(WireError::ConnectionClosed) => break,
                Err(err) => return Err(std::io::Error::new(std::io::ErrorKind::Other, err)),
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
#[path = "peer_tests.rs"]
mod tests;
