// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! muster cluster-sampling coordinator daemon (musterd)
//!
//! Background process driving a roster of collector nodes through their
//! sampling lifecycle. The operator-facing CLI dispatchers that would front
//! this binary in a full deployment are out of scope here; `musterd` wires
//! a real `Coordinator` and is meant to be driven through its handle by an
//! embedding application.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use muster_daemon::{Config, Coordinator, EnvMeshFlag, TcpPeerTransport};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("musterd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("musterd {}", env!("CARGO_PKG_VERSION"));
                println!("Cluster-wide sampling coordinator");
                println!();
                println!("USAGE:");
                println!("    musterd");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: musterd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let _log_guard = setup_logging();
    info!("starting muster coordinator");

    let home = muster_daemon::env::muster_home()?;
    tokio::fs::create_dir_all(&home).await?;

    let coordinator = Coordinator::spawn(
        Config::from_env(),
        home,
        Arc::new(TcpPeerTransport),
        Arc::new(EnvMeshFlag),
        Vec::new(),
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    coordinator.terminate().await;
    info!("coordinator shut down");
    Ok(())
}

fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    guard
}
