// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The collector roster: every node the coordinator currently knows about.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::oneshot;
use uuid::Uuid;

muster_core::define_id! {
    /// Identity of a collector node, stable across reboots.
    pub struct PeerId("per-");
}

/// A fresh random token minted on every boot/reboot of a collector.
///
/// Only a [`CollectorHandle`] carrying the *current* token for a node is
/// considered live; a death notice carrying a stale token is ignored (it
/// belongs to a connection the supervisor already replaced).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorToken(pub Uuid);

impl MonitorToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MonitorToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the coordinator knows about one collector node.
///
/// `heartbeat_cancel` is dropped whenever the handle is removed or replaced
/// (a reboot, or roster retirement); its heartbeat task selects on the
/// paired receiver closing and exits instead of pinging a stale address.
#[derive(Debug)]
pub struct CollectorHandle {
    pub id: PeerId,
    pub addr: SocketAddr,
    pub token: MonitorToken,
    pub collecting: bool,
    pub heartbeat_cancel: Option<oneshot::Sender<()>>,
}

impl CollectorHandle {
    pub fn new(id: PeerId, addr: SocketAddr) -> Self {
        Self { id, addr, token: MonitorToken::new(), collecting: false, heartbeat_cancel: None }
    }

    /// Construct with a token minted by the caller, so a heartbeat task
    /// spawned before the handle exists can be told the same identity.
    pub fn new_with_token(id: PeerId, addr: SocketAddr, token: MonitorToken) -> Self {
        Self { id, addr, token, collecting: false, heartbeat_cancel: None }
    }

    pub fn with_heartbeat_cancel(mut self, cancel: oneshot::Sender<()>) -> Self {
        self.heartbeat_cancel = Some(cancel);
        self
    }
}

/// Owned exclusively by the state core's single task; no `Mutex` needed.
#[derive(Debug, Default)]
pub struct Roster {
    handles: HashMap<PeerId, CollectorHandle>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: CollectorHandle) {
        self.handles.insert(handle.id.clone(), handle);
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<CollectorHandle> {
        self.handles.remove(id)
    }

    pub fn get(&self, id: &PeerId) -> Option<&CollectorHandle> {
        self.handles.get(id)
    }

    pub fn get_mut(&mut self, id: &PeerId) -> Option<&mut CollectorHandle> {
        self.handles.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PeerId> {
        self.handles.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &CollectorHandle> {
        self.handles.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut CollectorHandle> {
        self.handles.values_mut()
    }

    /// Empty the roster, returning every handle that was present. Used on
    /// coordinated shutdown; dropping the returned handles cancels their
    /// heartbeat tasks.
    pub fn retire(&mut self) -> Vec<CollectorHandle> {
        self.handles.drain().map(|(_, handle)| handle).collect()
    }
}

#[cfg(test)]
#[path = "roster_tests.rs"]
mod tests;
