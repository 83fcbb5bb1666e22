//! Transport abstraction — a blocking, line-oriented byte channel.
//!
//! Concrete implementations:
//! - TCP socket to a local or remote FLRig ([`TcpTransport`](crate::adapters::tcp_transport::TcpTransport))
//! - [`ScriptedTransport`], an in-memory FLRig stand-in for tests
//!
//! The RPC client is generic over `Transport`, so adding a new
//! transport requires zero changes to the RPC logic.

use std::collections::VecDeque;

use core::fmt;

/// Errors a transport can report.
///
/// `Disconnected` is the only connectivity-class error; everything else is
/// transient from the RPC layer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The per-attempt read timeout elapsed with no complete line.
    Timeout,
    /// The socket could not accept more bytes right now.
    WouldBlock,
    /// The peer closed the connection or the socket is gone.
    Disconnected,
    /// Any other I/O failure.
    Io,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "read timed out"),
            Self::WouldBlock => write!(f, "operation would block"),
            Self::Disconnected => write!(f, "connection closed"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

/// Line-oriented byte channel.
pub trait Transport {
    /// Read bytes up to and including the next `\n` into `buf`.
    ///
    /// Returns the number of bytes stored. A line longer than `buf` is
    /// returned in pieces across successive calls. Blocks for at most the
    /// transport's per-attempt timeout.
    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write `data`, returning how many bytes were actually accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Drop any bytes that have arrived but not been read yet.
    fn discard_input(&mut self) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// ScriptedTransport
// ───────────────────────────────────────────────────────────────

/// In-memory transport that answers XML-RPC calls from a script.
///
/// Each complete envelope written (one ending in `</methodCall>\r\n`) is
/// recorded, and a reply is queued: first from the FIFO filled by
/// [`push_reply`](Self::push_reply), otherwise from the per-method routes
/// set with [`route`](Self::route). With neither, the remote stays silent
/// and reads time out.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Vec<(String, String)>,
    replies: VecDeque<String>,
    incoming: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
    envelopes: Vec<String>,
    calls: Vec<String>,
    short_writes: usize,
    write_failures: VecDeque<TransportError>,
    read_failure: Option<TransportError>,
    discards: usize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `method` with the raw response text `response`.
    pub fn route(&mut self, method: &str, response: impl Into<String>) -> &mut Self {
        let response = response.into();
        match self.routes.iter_mut().find(|(m, _)| m == method) {
            Some(entry) => entry.1 = response,
            None => self.routes.push((method.into(), response)),
        }
        self
    }

    /// Answer the next call, whatever its method, with `response`.
    pub fn push_reply(&mut self, response: impl Into<String>) -> &mut Self {
        self.replies.push_back(response.into());
        self
    }

    /// Queue bytes as if left over from an earlier exchange.
    pub fn inject_stale(&mut self, text: &str) -> &mut Self {
        self.queue_lines(text);
        self
    }

    /// The next `count` writes accept at most half of the offered bytes.
    pub fn short_writes(&mut self, count: usize) -> &mut Self {
        self.short_writes = count;
        self
    }

    /// The next write fails with `err`.
    pub fn fail_next_write(&mut self, err: TransportError) -> &mut Self {
        self.write_failures.push_back(err);
        self
    }

    /// Every read fails with `err` from now on.
    pub fn fail_reads(&mut self, err: TransportError) -> &mut Self {
        self.read_failure = Some(err);
        self
    }

    /// Method names of every complete call received, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Every complete envelope received, in order.
    pub fn envelopes(&self) -> &[String] {
        &self.envelopes
    }

    /// How many times pending input was discarded.
    pub fn discard_count(&self) -> usize {
        self.discards
    }

    fn queue_lines(&mut self, text: &str) {
        for line in text.split_inclusive('\n') {
            self.incoming.push_back(line.as_bytes().to_vec());
        }
    }

    fn on_envelope(&mut self) {
        let envelope = String::from_utf8_lossy(&self.outbound).into_owned();
        self.outbound.clear();

        let method = envelope
            .split_once("<methodName>")
            .and_then(|(_, rest)| rest.split_once("</methodName>"))
            .map(|(name, _)| name.to_owned())
            .unwrap_or_default();

        let reply = self.replies.pop_front().or_else(|| {
            self.routes
                .iter()
                .find(|(m, _)| *m == method)
                .map(|(_, r)| r.clone())
        });

        self.calls.push(method);
        self.envelopes.push(envelope);
        if let Some(reply) = reply {
            self.queue_lines(&reply);
        }
    }
}

impl Transport for ScriptedTransport {
    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if let Some(err) = self.read_failure {
            return Err(err);
        }
        let Some(mut line) = self.incoming.pop_front() else {
            return Err(TransportError::Timeout);
        };
        if line.len() > buf.len() {
            let rest = line.split_off(buf.len());
            self.incoming.push_front(rest);
        }
        buf[..line.len()].copy_from_slice(&line);
        Ok(line.len())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if let Some(err) = self.write_failures.pop_front() {
            return Err(err);
        }
        let accepted = if self.short_writes > 0 && data.len() > 1 {
            self.short_writes -= 1;
            data.len() / 2
        } else {
            data.len()
        };
        self.outbound.extend_from_slice(&data[..accepted]);
        if self.outbound.ends_with(b"</methodCall>\r\n") {
            self.on_envelope();
        }
        Ok(accepted)
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        self.discards += 1;
        self.incoming.clear();
        Ok(())
    }
}
