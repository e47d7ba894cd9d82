// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle guards for the `start_collect` / `stop_collect` transitions.
//!
//! These are pure checks against the current roster/collecting flag; the
//! messages match exactly so an operator reading logs sees the same words
//! regardless of which surface rejected the request.

use tracing::warn;

use crate::roster::Roster;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("collecting is already stopped")]
    AlreadyStopped,
    #[error("there are no collectors at all")]
    NoCollectors,
    #[error("collecting is going")]
    AlreadyCollecting,
    #[error("collector is working now")]
    CollectingInProgress,
}

/// Guard for `start_collect`: fails if already collecting, or if the roster
/// is empty (nothing to start).
pub fn guard_start_collect(collecting: bool, roster: &Roster) -> Result<(), GuardError> {
    if collecting {
        warn!("collecting is going");
        return Err(GuardError::AlreadyCollecting);
    }
    if roster.is_empty() {
        warn!("there are no collectors at all");
        return Err(GuardError::NoCollectors);
    }
    Ok(())
}

/// Guard for `stop_collect`: fails if collecting was never started.
pub fn guard_stop_collect(collecting: bool) -> Result<(), GuardError> {
    if !collecting {
        warn!("collecting is already stopped");
        return Err(GuardError::AlreadyStopped);
    }
    Ok(())
}

/// Guard for `pull`: refused while peer files are still being written.
pub fn guard_pull(collecting: bool) -> Result<(), GuardError> {
    if collecting {
        warn!("collector is working now");
        return Err(GuardError::CollectingInProgress);
    }
    Ok(())
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
