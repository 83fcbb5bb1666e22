//! RPC engine: runs one XML-RPC call from start to finish.
//!
//! Each call goes through Encode → Write → Read → Extract under an
//! [`InFlightGuard`], so at most one transaction is outstanding per
//! connection and every response belongs to the most recent request.
//!
//! Outcomes:
//!
//! 1. **Value**: a non-fault value came back (or, for [`RpcClient::execute`],
//!    any well-framed response).
//! 2. **Unavailable**: the remote answered `unknown method`. Never retried;
//!    this is how capability probes tell "not supported" from "broken".
//! 3. **Error**: connectivity and overflow fail at once. Empty results
//!    retry the whole cycle up to `call_retries` times, then surface as
//!    timeout, protocol or no-value depending on what the last cycle saw.

use core::cell::Cell;

use embedded_hal::delay::DelayNs;
use heapless::String;
use log::{debug, info, trace, warn};

use super::codec::RequestEncoder;
use super::extract::extract;
use super::reader::{RawResponse, ReadStatus, read_response};
use super::transport::Transport;
use super::writer::write_envelope;
use crate::config::LinkConfig;
use crate::error::{Error, Result};

/// Capacity of the outbound envelope buffer.
pub const ENVELOPE_CAPACITY: usize = 8192;

/// Substring of the remote's reply to a method it does not implement.
pub const UNKNOWN_METHOD_MARKER: &str = "unknown method";

/// Room for the (ignored) value returned by [`RpcClient::execute`] calls.
const EXECUTE_VALUE_CAPACITY: usize = 64;

/// Closing tag of the returned parameter; a value seen before it is complete.
const PARAM_CLOSE: &str = "</param>";

/// Outcome of a call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Value(T),
    /// The remote does not implement the method.
    Unavailable,
}

impl<T> Reply<T> {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// The value, or `None` if the method is unavailable.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unavailable => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Self::Value(v) => Reply::Value(f(v)),
            Self::Unavailable => Reply::Unavailable,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// In-flight guard
// ───────────────────────────────────────────────────────────────

/// Scoped single-transaction guard. The flag is cleared on drop, so every
/// exit path of a call releases it.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> InFlightGuard<'a> {
    /// Set `flag`, or fail with [`Error::Busy`] if it is already set.
    pub fn acquire(flag: &'a Cell<bool>) -> Result<Self> {
        if flag.replace(true) {
            warn!("RPC: transaction already in flight");
            return Err(Error::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

// ───────────────────────────────────────────────────────────────
// Client
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Limits {
    write_retries: u8,
    read_retries: u8,
    call_retries: u8,
    pacing_ms: u32,
    write_backoff_ms: u32,
}

/// Why a cycle produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Miss {
    Write,
    Exhausted,
    Framing,
    Empty,
}

impl Miss {
    fn into_error(self) -> Error {
        match self {
            Self::Write => Error::Io,
            Self::Exhausted => Error::Timeout,
            Self::Framing => Error::Protocol,
            Self::Empty => Error::NoValue,
        }
    }
}

/// XML-RPC client bound to one transport.
pub struct RpcClient<T: Transport, D: DelayNs> {
    transport: T,
    delay: D,
    encoder: RequestEncoder,
    raw: RawResponse,
    in_flight: Cell<bool>,
    limits: Limits,
}

impl<T: Transport, D: DelayNs> RpcClient<T, D> {
    pub fn new(transport: T, delay: D, config: &LinkConfig) -> Self {
        Self {
            transport,
            delay,
            encoder: RequestEncoder::new(config.host(), config.client_port),
            raw: RawResponse::new(),
            in_flight: Cell::new(false),
            limits: Limits {
                write_retries: config.write_retries,
                read_retries: config.read_retries,
                call_retries: config.call_retries,
                pacing_ms: config.pacing_ms,
                write_backoff_ms: config.write_backoff_ms,
            },
        }
    }

    /// Call `method` and return its value, at most `N` bytes.
    pub fn query<const N: usize>(&mut self, method: &str, params: Option<&str>) -> Result<Reply<String<N>>> {
        self.transact::<N>(method, params, true)
    }

    /// Call `method` for its side effect.
    pub fn execute(&mut self, method: &str, params: Option<&str>) -> Result<Reply<()>> {
        Ok(self.transact::<EXECUTE_VALUE_CAPACITY>(method, params, false)?.map(|_| ()))
    }

    /// Whether a transaction is currently running.
    pub fn in_flight(&self) -> bool {
        self.in_flight.get()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Give the transport back, e.g. to reconnect it.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn transact<const N: usize>(
        &mut self,
        method: &str,
        params: Option<&str>,
        want_value: bool,
    ) -> Result<Reply<String<N>>> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let limits = self.limits;

        let envelope: String<ENVELOPE_CAPACITY> = self
            .encoder
            .encode(method, params)
            .ok_or(Error::InvalidArgument("request too large"))?;

        let mut miss = Miss::Empty;
        for attempt in 0..=limits.call_retries {
            if attempt > 0 {
                debug!("RPC: {method} retry {attempt}/{} ({miss:?})", limits.call_retries);
            }
            trace!("RPC: -> {method}");

            match write_envelope(&mut self.transport, envelope.as_bytes(), limits.write_retries) {
                Ok(()) => {}
                Err(Error::Io) => {
                    warn!("RPC: write of {method} failed, backing off {} ms", limits.write_backoff_ms);
                    self.delay.delay_ms(limits.write_backoff_ms);
                    miss = Miss::Write;
                    continue;
                }
                Err(e) => return Err(e),
            }

            let status = read_response(
                &mut self.transport,
                &mut self.delay,
                &mut self.raw,
                limits.read_retries,
                limits.pacing_ms,
            )?;
            let text = self.raw.as_str();
            trace!("RPC: <- {method} {status:?} {text:?}");

            if text.contains(UNKNOWN_METHOD_MARKER) {
                info!("RPC: {method} not available on remote");
                return Ok(Reply::Unavailable);
            }

            // Extraction runs even when the reader gave up.
            let Some(extracted) = extract::<N>(text) else {
                miss = match status {
                    ReadStatus::Exhausted => Miss::Exhausted,
                    ReadStatus::Complete => Miss::Framing,
                };
                continue;
            };

            // A fault is a rejection, for setters as much as for getters.
            if extracted.fault {
                warn!("RPC: {method} returned a fault");
                miss = Miss::Empty;
                continue;
            }

            if !want_value {
                return Ok(Reply::Value(String::new()));
            }

            if extracted.is_empty() {
                miss = match status {
                    ReadStatus::Exhausted => Miss::Exhausted,
                    ReadStatus::Complete => Miss::Empty,
                };
                continue;
            }

            if status == ReadStatus::Exhausted && !text.contains(PARAM_CLOSE) {
                warn!("RPC: discarding partial value for {method}");
                miss = Miss::Exhausted;
                continue;
            }

            debug!("RPC: {method} = {}", extracted.value);
            return Ok(Reply::Value(extracted.value));
        }

        warn!(
            "RPC: {method} failed after {} attempts ({miss:?})",
            u16::from(limits.call_retries) + 1
        );
        Err(miss.into_error())
    }
}
