//! Link configuration parameters
//!
//! All tunable parameters for one FLRig connection. Every retry bound is
//! small and fixed per connection; nothing here enables unbounded retries.

use serde::{Deserialize, Serialize};

/// Default FLRig XML-RPC endpoint.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:12345";

/// Core link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    // --- Endpoint ---
    /// `host:port` of the FLRig XML-RPC server
    pub address: String,
    /// Client port announced in the `<?clientid?>` processing instruction.
    /// `None` omits the instruction.
    pub client_port: Option<u16>,

    // --- Timing ---
    /// Per-attempt read timeout (milliseconds)
    pub timeout_ms: u32,
    /// Pause after a complete response before returning (milliseconds)
    pub pacing_ms: u32,
    /// Pause after a non-fatal write failure (milliseconds)
    pub write_backoff_ms: u32,

    // --- Retry budgets ---
    /// Extra write attempts on transient short writes
    pub write_retries: u8,
    /// Consecutive unproductive reads tolerated per response
    pub read_retries: u8,
    /// Extra whole-cycle attempts when no value came back
    pub call_retries: u8,

    // --- Backend parameters ---
    /// Use `rig.set_verify_vfoA/B` instead of fire-and-forget frequency sets
    pub verify_freq: bool,
    /// Use the fast PTT command (FLRig >= 1.3.54)
    pub verify_ptt: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Endpoint
            address: DEFAULT_ADDRESS.into(),
            client_port: None,

            // Timing
            timeout_ms: 5000,
            pacing_ms: 2,
            write_backoff_ms: 50,

            // Retry budgets
            write_retries: 2,
            read_retries: 2,
            call_retries: 3,

            // Backend parameters
            verify_freq: false,
            verify_ptt: false,
        }
    }
}

impl LinkConfig {
    /// Host part of [`address`](Self::address), used in the `Host:` header.
    pub fn host(&self) -> &str {
        self.address.as_str()
    }

    /// Worst-case wall time of one orchestrated call, ignoring write time.
    pub fn worst_case_call_ms(&self) -> u64 {
        let attempts = u64::from(self.call_retries) + 1;
        let reads = u64::from(self.read_retries) + 1;
        attempts * (reads * u64::from(self.timeout_ms) + u64::from(self.pacing_ms))
            + attempts * u64::from(self.write_backoff_ms)
    }
}
