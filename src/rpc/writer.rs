//! Envelope writer.
//!
//! Discards stale input before every request so leftover bytes from an
//! earlier exchange can never be read as this call's response, then writes
//! the whole envelope with a small retry budget for short writes.

use log::{trace, warn};

use super::transport::{Transport, TransportError};
use crate::error::{Error, Result};

/// Write `envelope` to `transport`.
///
/// Short writes advance through the envelope; `retries` extra attempts are
/// allowed for writes that make no or partial progress. A disconnect fails
/// immediately with [`Error::Connectivity`].
pub fn write_envelope<T: Transport>(transport: &mut T, envelope: &[u8], retries: u8) -> Result<()> {
    if envelope.is_empty() {
        // An empty write makes some servers answer with a blank line.
        return Err(Error::InvalidArgument("empty envelope"));
    }

    match transport.discard_input() {
        Ok(()) => {}
        Err(TransportError::Disconnected) => return Err(Error::Connectivity),
        Err(e) => warn!("RPC: discard before write failed: {e}"),
    }

    let mut offset = 0;
    let mut attempts_left = retries;
    loop {
        match transport.write(&envelope[offset..]) {
            Ok(n) => {
                offset += n;
                if offset >= envelope.len() {
                    trace!("RPC: wrote {} bytes", envelope.len());
                    return Ok(());
                }
                warn!("RPC: short write ({offset}/{} bytes)", envelope.len());
            }
            Err(TransportError::Disconnected) => return Err(Error::Connectivity),
            Err(e) => warn!("RPC: write failed: {e}"),
        }

        if attempts_left == 0 {
            return Err(Error::Io);
        }
        attempts_left -= 1;
    }
}
