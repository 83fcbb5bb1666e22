//! Unified error type for the FLRig link.
//!
//! A single `Error` enum that every layer (writer, reader, orchestrator,
//! rig service) converts into. All variants are `Copy` so they can be
//! passed back through retry loops and the in-flight guard without
//! allocation.
//!
//! "Method unavailable" is not an error at the RPC layer: the engine
//! reports it as [`Reply::Unavailable`](crate::rpc::engine::Reply).

use core::fmt;

use crate::rpc::transport::TransportError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The stream reported a broken connection. The caller must reopen it.
    Connectivity,
    /// Transient write failures outlasted the write retry budget.
    Io,
    /// The response terminator never arrived within the retry budgets.
    Timeout,
    /// The exchange was framed but not a success response (no `200 OK`,
    /// no payload, or a nonsensical value).
    Protocol,
    /// The accumulated response would exceed the fixed buffer capacity.
    Overflow,
    /// A well-framed exchange produced no value where one was expected
    /// (includes fault responses).
    NoValue,
    /// An orchestrated call is already in flight on this connection.
    Busy,
    /// The remote does not implement a call this operation needs.
    /// Raised by the rig service only; the RPC engine reports
    /// [`Reply::Unavailable`](crate::rpc::engine::Reply) instead.
    Unsupported,
    /// The caller passed an argument this backend cannot express.
    InvalidArgument(&'static str),
}

impl Error {
    /// Whether the connection must be reopened before the next call.
    pub const fn is_connectivity(self) -> bool {
        matches!(self, Self::Connectivity)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity => write!(f, "connection lost"),
            Self::Io => write!(f, "write failed after retries"),
            Self::Timeout => write!(f, "timed out waiting for response"),
            Self::Protocol => write!(f, "protocol error"),
            Self::Overflow => write!(f, "response buffer overflow"),
            Self::NoValue => write!(f, "no value returned"),
            Self::Busy => write!(f, "transaction already in flight"),
            Self::Unsupported => write!(f, "not supported by this rig"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Disconnected => Self::Connectivity,
            TransportError::Timeout => Self::Timeout,
            TransportError::WouldBlock | TransportError::Io => Self::Io,
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
