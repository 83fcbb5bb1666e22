//! Response reader. Accumulates newline-delimited chunks into a
//! capacity-bounded buffer until the XML-RPC terminator shows up.
//!
//! The reader tolerates partial reads: a single `read_line` may return a
//! whole line, part of a long line, or nothing before the per-attempt
//! timeout. Only *unproductive* reads (timeouts, empty reads, stray
//! lines) count against the retry budget; every appended chunk refills it.
//!
//! Exceeding [`RESPONSE_CAPACITY`] is a hard [`Error::Overflow`]. The
//! buffer is never silently truncated.
//!
//! A multi-byte character cut by the end of a read is held back and
//! completed by the next one rather than decoded in halves.

use embedded_hal::delay::DelayNs;
use heapless::String;
use log::{debug, trace, warn};

use super::transport::{Transport, TransportError};
use crate::error::{Error, Result};

/// Maximum accumulated response size.
pub const RESPONSE_CAPACITY: usize = 8192;

/// Literal that ends every XML-RPC response.
pub const RESPONSE_TERMINATOR: &str = "</methodResponse>";

/// Expected content of the first line.
pub const STATUS_PREAMBLE: &str = "HTTP/1.1 200 OK";

/// Scratch buffer for one `read_line` call.
const SCRATCH_SIZE: usize = 1024;

/// Stray first lines tolerated before giving up.
const MAX_STRAY_LINES: u8 = 1;

/// Outcome of a read that did not fail hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The terminator was received.
    Complete,
    /// The retry budget ran out first; the buffer holds whatever arrived.
    Exhausted,
}

/// Accumulated response text, bounded by [`RESPONSE_CAPACITY`].
#[derive(Debug, Default)]
pub struct RawResponse {
    text: String<RESPONSE_CAPACITY>,
}

impl RawResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether the response terminator has been received.
    pub fn is_complete(&self) -> bool {
        self.text.contains(RESPONSE_TERMINATOR)
    }

    /// Append a chunk, failing hard instead of truncating.
    pub fn append(&mut self, chunk: &str) -> Result<()> {
        self.text.push_str(chunk).map_err(|()| {
            warn!(
                "RPC: response buffer overflow (have {}, adding {})",
                self.text.len(),
                chunk.len()
            );
            Error::Overflow
        })
    }
}

/// Read one response into `raw`.
///
/// `retries` is the number of consecutive unproductive reads tolerated
/// after the first. On [`ReadStatus::Complete`] the reader pauses
/// `pacing_ms` before returning so a chatty remote can finish flushing.
pub fn read_response<T: Transport, D: DelayNs>(
    transport: &mut T,
    delay: &mut D,
    raw: &mut RawResponse,
    retries: u8,
    pacing_ms: u32,
) -> Result<ReadStatus> {
    raw.clear();

    let mut scratch = [0u8; SCRATCH_SIZE];
    // Bytes of a split character waiting at the front of `scratch`.
    let mut carry = 0;
    let mut budget = retries;
    let mut strays_left = MAX_STRAY_LINES;

    loop {
        if raw.is_complete() {
            trace!("RPC: got {RESPONSE_TERMINATOR}");
            delay.delay_ms(pacing_ms);
            return Ok(ReadStatus::Complete);
        }

        match transport.read_line(&mut scratch[carry..]) {
            Ok(0) => debug!("RPC: empty read"),
            Ok(n) => {
                let filled = carry + n;
                let held = incomplete_tail(&scratch[..filled]);
                let whole = filled - held;
                if whole == 0 {
                    carry = filled;
                    continue;
                }
                let chunk = std::string::String::from_utf8_lossy(&scratch[..whole]);
                trace!("RPC: line {:?}", chunk);

                if raw.is_empty() && !chunk.contains(STATUS_PREAMBLE) {
                    warn!("RPC: expected '{STATUS_PREAMBLE}', got {:?}", chunk.trim_end());
                    carry = 0;
                    if strays_left == 0 {
                        return Ok(ReadStatus::Exhausted);
                    }
                    strays_left -= 1;
                } else {
                    raw.append(&chunk)?;
                    scratch.copy_within(whole..filled, 0);
                    carry = held;
                    budget = retries;
                    continue;
                }
            }
            Err(TransportError::Disconnected) => return Err(Error::Connectivity),
            Err(e) => debug!("RPC: read attempt failed: {e}"),
        }

        if budget == 0 {
            warn!("RPC: retry budget exhausted without {RESPONSE_TERMINATOR}");
            return Ok(ReadStatus::Exhausted);
        }
        budget -= 1;
    }
}

/// Length of a UTF-8 sequence cut off at the end of `bytes`, 0 if the
/// last character is whole.
fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0xC0 != 0x80 {
            let width = match b {
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF7 => 4,
                _ => 1,
            };
            return if width > back { back } else { 0 };
        }
    }
    0
}
