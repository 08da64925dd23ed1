//! Framed request/response channel over a byte stream.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tether_ir::{ModuleHandle, ModuleName};

use crate::wire::{self, Reply, Request};
use crate::{ChannelError, ModuleProvider, RemoteChannel, TransportKind};

/// Client end of a stream connection to the remote peer.
///
/// One request is in flight at a time. After a transport failure the stream
/// may sit in the middle of a frame, so the channel marks itself broken and
/// fails every later call without touching the stream.
pub struct StreamChannel<S> {
    stream: Mutex<S>,
    peer: String,
    broken: AtomicBool,
    dependencies: Vec<ModuleName>,
}

impl<S: Read + Write + Send> StreamChannel<S> {
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        StreamChannel {
            stream: Mutex::new(stream),
            peer: peer.into(),
            broken: AtomicBool::new(false),
            dependencies: Vec::new(),
        }
    }

    /// Declare local modules this channel depends on.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = ModuleName>) -> Self {
        self.dependencies.extend(deps);
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    pub fn ping(&self) -> Result<(), ChannelError> {
        match self.round_trip(&Request::Ping)? {
            Reply::Pong => Ok(()),
            other => Err(ChannelError::transport(
                TransportKind::Protocol,
                format!("expected pong from {}, got {other:?}", self.peer),
            )),
        }
    }

    fn round_trip(&self, request: &Request) -> Result<Reply, ChannelError> {
        if self.is_broken() {
            return Err(ChannelError::transport(
                TransportKind::Unreachable,
                format!("connection to {} is broken by an earlier failure", self.peer),
            ));
        }

        let mut stream = self.stream.lock();
        let result = wire::write_frame(&mut *stream, request).and_then(|()| {
            wire::read_frame(&mut *stream)?.ok_or_else(|| {
                ChannelError::transport(
                    TransportKind::Unreachable,
                    format!("{} closed the connection", self.peer),
                )
            })
        });

        if let Err(err) = &result {
            tracing::warn!(peer = %self.peer, error = %err, "channel marked broken");
            self.broken.store(true, Ordering::Release);
        }
        result
    }
}

impl StreamChannel<TcpStream> {
    /// Connect over TCP. `timeout` bounds the connect and every later read
    /// and write.
    pub fn connect(addr: impl ToSocketAddrs, timeout: Duration) -> Result<Self, ChannelError> {
        let mut last_err = None;
        for sock in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&sock, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    tracing::debug!(peer = %sock, "connected");
                    return Ok(StreamChannel::new(stream, sock.to_string()));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => e.into(),
            None => ChannelError::transport(TransportKind::Unreachable, "address resolved to nothing"),
        })
    }
}

impl<S: Read + Write + Send> RemoteChannel for StreamChannel<S> {
    fn import_module(&self, name: &ModuleName) -> Result<ModuleHandle, ChannelError> {
        tracing::debug!(peer = %self.peer, module = %name, "import_module");
        let reply = self.round_trip(&Request::ImportModule { name: name.clone() })?;
        wire::expect_module(name, reply)
    }

    fn is_connected(&self) -> bool {
        self.ping().is_ok()
    }

    fn dependencies(&self) -> &[ModuleName] {
        &self.dependencies
    }
}

/// Answer requests on `stream` until the client hangs up.
pub fn serve_connection<S, P>(mut stream: S, provider: &P) -> Result<(), ChannelError>
where
    S: Read + Write,
    P: ModuleProvider + ?Sized,
{
    while let Some(request) = wire::read_frame::<_, Request>(&mut stream)? {
        tracing::trace!(?request, "serving");
        let reply = wire::answer(provider, request);
        wire::write_frame(&mut stream, &reply)?;
    }
    tracing::debug!("client disconnected");
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
