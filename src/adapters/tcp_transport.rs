//! TCP transport adapter.
//!
//! Implements [`Transport`] over a blocking `std::net::TcpStream` connected
//! to FLRig's XML-RPC port (12345 by default).
//!
//! ## Read model
//!
//! `read_line` returns at most one line per call. Bytes are pulled from the
//! socket into a pending buffer; a call returns as soon as that buffer
//! holds a `\n`, fills the caller's buffer, or the per-attempt read timeout
//! elapses. On timeout any partial line is returned as-is so a remote that
//! omits the final newline is still readable; with nothing pending the
//! call fails with [`TransportError::Timeout`].
//!
//! ## Connection model
//!
//! A closed or reset socket is reported once as
//! [`TransportError::Disconnected`] and dropped. [`TcpTransport::reconnect`]
//! dials the same address again.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::LinkConfig;
use crate::rpc::transport::{Transport, TransportError};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// Bytes pulled from the socket per `read` call.
const CHUNK_SIZE: usize = 1024;

// ───────────────────────────────────────────────────────────────
// TcpTransport
// ───────────────────────────────────────────────────────────────

/// Client-side TCP connection to FLRig.
#[derive(Debug)]
pub struct TcpTransport {
    addr: SocketAddr,
    timeout: Duration,
    stream: Option<TcpStream>,
    pending: Vec<u8>,
}

impl TcpTransport {
    /// Connect to `addr` (`host:port`). `timeout_ms` bounds the connect
    /// and every individual read or write attempt.
    pub fn connect(addr: &str, timeout_ms: u32) -> Result<Self, TransportError> {
        let addr = addr
            .to_socket_addrs()
            .map_err(|e| {
                warn!("TCP: cannot resolve {addr}: {e}");
                TransportError::Io
            })?
            .next()
            .ok_or(TransportError::Io)?;

        let mut t = Self {
            addr,
            timeout: Duration::from_millis(u64::from(timeout_ms.max(1))),
            stream: None,
            pending: Vec::with_capacity(CHUNK_SIZE),
        };
        t.reconnect()?;
        Ok(t)
    }

    /// Connect using the address and timeout in `config`.
    pub fn from_config(config: &LinkConfig) -> Result<Self, TransportError> {
        Self::connect(&config.address, config.timeout_ms)
    }

    /// Drop any existing socket and dial the address again.
    pub fn reconnect(&mut self) -> Result<(), TransportError> {
        self.disconnect();
        let stream = TcpStream::connect_timeout(&self.addr, self.timeout).map_err(|e| {
            warn!("TCP: connect to {} failed: {e}", self.addr);
            TransportError::Disconnected
        })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.timeout)))
            .and_then(|()| stream.set_nodelay(true))
            .map_err(|_| TransportError::Io)?;
        info!("TCP: connected to {}", self.addr);
        self.stream = Some(stream);
        Ok(())
    }

    /// Close the socket. Later calls report `Disconnected`.
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            info!("TCP: disconnected from {}", self.addr);
        }
        self.pending.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Move up to one line (or `buf.len()` bytes) from `pending` into `buf`.
    fn take_pending(&mut self, buf: &mut [u8], force: bool) -> Option<usize> {
        let line_end = self.pending.iter().position(|&b| b == b'\n').map(|i| i + 1);
        let n = match line_end {
            Some(end) => end.min(buf.len()),
            None if self.pending.len() >= buf.len() => buf.len(),
            None if force && !self.pending.is_empty() => self.pending.len(),
            None => return None,
        };
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.copy_within(n.., 0);
        self.pending.truncate(self.pending.len() - n);
        Some(n)
    }

    fn lost(&mut self, why: &str) -> TransportError {
        warn!("TCP: connection to {} lost ({why})", self.addr);
        self.stream = None;
        TransportError::Disconnected
    }
}

fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
    )
}

// ───────────────────────────────────────────────────────────────
// Transport implementation
// ───────────────────────────────────────────────────────────────

impl Transport for TcpTransport {
    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            if let Some(n) = self.take_pending(buf, false) {
                return Ok(n);
            }
            let Some(stream) = self.stream.as_mut() else {
                return Err(TransportError::Disconnected);
            };
            match stream.read(&mut chunk) {
                Ok(0) => {
                    if let Some(n) = self.take_pending(buf, true) {
                        return Ok(n);
                    }
                    return Err(self.lost("closed by peer"));
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if is_timeout(e.kind()) => {
                    return self.take_pending(buf, true).ok_or(TransportError::Timeout);
                }
                Err(e) if is_disconnect(e.kind()) => return Err(self.lost(&e.to_string())),
                Err(e) => {
                    warn!("TCP: read failed: {e}");
                    return Err(TransportError::Io);
                }
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Disconnected);
        };
        match stream.write(data) {
            Ok(n) => Ok(n),
            Err(e) if is_timeout(e.kind()) => Err(TransportError::WouldBlock),
            Err(e) if is_disconnect(e.kind()) => Err(self.lost(&e.to_string())),
            Err(e) => {
                warn!("TCP: write failed: {e}");
                Err(TransportError::Io)
            }
        }
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        let dropped_pending = self.pending.len();
        self.pending.clear();

        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Disconnected);
        };
        stream.set_nonblocking(true).map_err(|_| TransportError::Io)?;

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut dropped = 0;
        let outcome = loop {
            match stream.read(&mut chunk) {
                Ok(0) => break Err("closed by peer".to_string()),
                Ok(n) => dropped += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if is_timeout(e.kind()) => break Ok(()),
                Err(e) if is_disconnect(e.kind()) => break Err(e.to_string()),
                Err(e) => {
                    warn!("TCP: discard failed: {e}");
                    break Ok(());
                }
            }
        };
        let restored = stream.set_nonblocking(false);

        if let Err(why) = outcome {
            return Err(self.lost(&why));
        }
        restored.map_err(|_| TransportError::Io)?;
        if dropped + dropped_pending > 0 {
            debug!("TCP: discarded {} stale bytes", dropped + dropped_pending);
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
