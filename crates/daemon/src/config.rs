// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sampling configuration: interval, top-N, and SMP statistics toggle.
//!
//! Resolved fresh from the environment on every read (never persisted):
//! explicit override (used by tests and the `start_collect` surface) beats
//! the environment variable, which beats the hard-coded default.

const DEFAULT_INTERVAL_MS: u64 = 300_000;
const DEFAULT_TOPN: u32 = 30;
const DEFAULT_SMP: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub interval_ms: u64,
    pub topn: u32,
    pub smp: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Config {
    /// Resolve every field from `MUSTER_*` environment variables, falling
    /// back to the hard-coded defaults for any that are unset or unparsable.
    pub fn from_env() -> Self {
        Self {
            interval_ms: env_u64("MUSTER_INTERVAL_MS").unwrap_or(DEFAULT_INTERVAL_MS),
            topn: env_u32("MUSTER_TOPN").unwrap_or(DEFAULT_TOPN),
            smp: env_bool("MUSTER_SMP").unwrap_or(DEFAULT_SMP),
        }
    }

    /// Apply explicit overrides on top of the environment-resolved config.
    pub fn merged(interval_ms: Option<u64>, topn: Option<u32>, smp: Option<bool>) -> Self {
        let base = Self::from_env();
        Self {
            interval_ms: interval_ms.unwrap_or(base.interval_ms),
            topn: topn.unwrap_or(base.topn),
            smp: smp.unwrap_or(base.smp),
        }
    }
}

impl From<Config> for muster_wire::InitConfig {
    fn from(config: Config) -> Self {
        muster_wire::InitConfig { interval_ms: config.interval_ms, topn: config.topn, smp: config.smp }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
