// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing primitives: 4-byte big-endian length prefix + JSON payload.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use super::{PeerMessage, PeerRequest};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,
}

pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, WireError> {
    let bytes = serde_json::to_vec(msg)?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge { size: bytes.len(), max: MAX_MESSAGE_SIZE });
    }
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, WireError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed)
        }
        Err(e) => return Err(WireError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), WireError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge { size: data.len(), max: MAX_MESSAGE_SIZE });
    }
    let len = (data.len() as u32).to_be_bytes();
    writer.write_all(&len).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed [`PeerRequest`] off a control connection.
pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<PeerRequest, WireError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

/// Write one framed [`PeerRequest`] down a control connection.
pub async fn write_request<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    request: &PeerRequest,
) -> Result<(), WireError> {
    let bytes = encode(request)?;
    write_message(writer, &bytes).await
}

/// Read one framed [`PeerMessage`] off a control connection.
pub async fn read_reply<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<PeerMessage, WireError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

/// Write one framed [`PeerMessage`] down a control connection.
pub async fn write_reply<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    message: &PeerMessage,
) -> Result<(), WireError> {
    let bytes = encode(message)?;
    write_message(writer, &bytes).await
}
