// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    std::env::remove_var("MUSTER_INTERVAL_MS");
    std::env::remove_var("MUSTER_TOPN");
    std::env::remove_var("MUSTER_SMP");
}

#[test]
#[serial]
fn defaults_when_unset() {
    clear_env();
    let config = Config::from_env();
    assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
    assert_eq!(config.topn, DEFAULT_TOPN);
    assert_eq!(config.smp, DEFAULT_SMP);
}

#[test]
#[serial]
fn reads_env_overrides() {
    clear_env();
    std::env::set_var("MUSTER_INTERVAL_MS", "2500");
    std::env::set_var("MUSTER_TOPN", "25");
    std::env::set_var("MUSTER_SMP", "false");

    let config = Config::from_env();
    assert_eq!(config.interval_ms, 2500);
    assert_eq!(config.topn, 25);
    assert!(!config.smp);

    clear_env();
}

#[test]
#[serial]
fn explicit_override_beats_env() {
    clear_env();
    std::env::set_var("MUSTER_TOPN", "25");

    let config = Config::merged(Some(999), None, None);
    assert_eq!(config.interval_ms, 999);
    assert_eq!(config.topn, 25);

    clear_env();
}

#[test]
fn converts_into_wire_init_config() {
    let config = Config { interval_ms: 1000, topn: 5, smp: false };
    let wire: muster_wire::InitConfig = config.into();
    assert_eq!(wire.interval_ms, 1000);
    assert_eq!(wire.topn, 5);
    assert!(!wire.smp);
}
