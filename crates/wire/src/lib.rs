// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for the coordinator↔collector control channel.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. Every
//! coordinator peer connection carries exactly this framing; the per-file
//! transfer sockets opened by the pull protocol are unframed raw byte
//! streams and do not use this module.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod protocol;
mod wire;

pub use protocol::{BootMode, InitConfig, Outcome, PeerMessage, PeerRequest};
pub use wire::{
    decode, encode, read_message, read_reply, read_request, write_message, write_reply,
    write_request, WireError, MAX_MESSAGE_SIZE,
};
