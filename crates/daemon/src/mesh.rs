// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster mesh membership probe.
//!
//! The coordinator does not implement cluster membership itself; it asks an
//! injected [`MeshFlag`] whether the node has joined the cluster yet, and
//! retries a bounded number of times before giving up.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::MeshError;

const MAX_ATTEMPTS: u32 = 3;

/// Satisfied by whatever out-of-process mechanism tracks cluster membership.
#[async_trait::async_trait]
pub trait MeshFlag: Send + Sync {
    async fn is_meshed(&self) -> bool;
}

/// Retry [`MeshFlag::is_meshed`] up to [`MAX_ATTEMPTS`] times, sleeping
/// `interval` between attempts, before giving up with [`MeshError::NotMeshed`].
pub async fn probe(flag: &dyn MeshFlag, interval: Duration) -> Result<(), MeshError> {
    for attempt in 1..=MAX_ATTEMPTS {
        if flag.is_meshed().await {
            info!(attempt, "cluster mesh probe succeeded");
            return Ok(());
        }
        warn!(attempt, max = MAX_ATTEMPTS, "cluster not yet meshed");
        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(interval).await;
        }
    }
    Err(MeshError::NotMeshed)
}

/// Minimal [`MeshFlag`] for standalone deployments with no real
/// cluster-membership service: meshed as soon as `MUSTER_MESHED` is set to
/// anything non-empty. A real deployment wires a service-discovery client
/// in its place.
pub struct EnvMeshFlag;

#[async_trait::async_trait]
impl MeshFlag for EnvMeshFlag {
    async fn is_meshed(&self) -> bool {
        std::env::var("MUSTER_MESHED").map(|v| !v.is_empty()).unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
