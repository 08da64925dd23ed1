//! Frame format shared by both ends of a stream channel.
//!
//! A frame is a little-endian `u32` payload length followed by a bincode
//! payload. Frames larger than [`MAX_FRAME_LEN`] are rejected before the
//! payload is read.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tether_ir::{ModuleHandle, ModuleName};

use crate::{ChannelError, ModuleProvider, TransportKind};

pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Request {
    ImportModule { name: ModuleName },
    Ping,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Module(ModuleHandle),
    NotFound { name: ModuleName },
    Failed { message: String },
    Pong,
}

pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ChannelError> {
    let bytes = bincode::serialize(msg)?;
    if bytes.len() > MAX_FRAME_LEN as usize {
        return Err(ChannelError::transport(
            TransportKind::Codec,
            format!("frame of {} bytes exceeds limit of {MAX_FRAME_LEN}", bytes.len()),
        ));
    }
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ChannelError> {
    Ok(bincode::deserialize(bytes)?)
}

pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), ChannelError> {
    let payload = encode(msg)?;
    // encode() bounds the length to MAX_FRAME_LEN, which fits in u32.
    let len = u32::try_from(payload.len())
        .map_err(|e| ChannelError::transport(TransportKind::Codec, e.to_string()))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. `Ok(None)` is a clean end of stream between frames.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, ChannelError> {
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(ChannelError::transport(
                    TransportKind::Unreachable,
                    "connection closed inside a frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    let len = u32::from_le_bytes(header);
    if len > MAX_FRAME_LEN {
        return Err(ChannelError::transport(
            TransportKind::Codec,
            format!("incoming frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"),
        ));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    decode(&payload).map(Some)
}

/// Remote-side handling of one request.
pub fn answer<P: ModuleProvider + ?Sized>(provider: &P, request: Request) -> Reply {
    match request {
        Request::Ping => Reply::Pong,
        Request::ImportModule { name } => match provider.export(&name) {
            Ok(Some(handle)) => Reply::Module(handle),
            Ok(None) => Reply::NotFound { name },
            Err(message) => Reply::Failed { message },
        },
    }
}

/// Client-side interpretation of the reply to `ImportModule { name }`.
pub fn expect_module(name: &ModuleName, reply: Reply) -> Result<ModuleHandle, ChannelError> {
    match reply {
        Reply::Module(handle) if handle.name == *name => Ok(handle),
        Reply::Module(handle) => Err(ChannelError::transport(
            TransportKind::Protocol,
            format!("asked for `{name}`, peer sent `{}`", handle.name),
        )),
        Reply::NotFound { .. } => Err(ChannelError::not_found(name)),
        Reply::Failed { message } => Err(ChannelError::transport(TransportKind::Remote, message)),
        Reply::Pong => Err(ChannelError::transport(
            TransportKind::Protocol,
            format!("asked for `{name}`, peer sent a pong"),
        )),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
