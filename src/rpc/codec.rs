//! XML-RPC request envelope codec.
//!
//! Wire format:
//! ```text
//! POST /RPC2 HTTP/1.1\r\n
//! User-Agent: XMLRPC++ 0.8\r\n
//! Host: <host>\r\n
//! Content-type: text/xml\r\n
//! Content-length: <payload bytes>\r\n
//! \r\n
//! <?xml version="1.0"?>\r\n
//! [<?clientid="hamlib(<port>)"?>\r\n]
//! <methodCall><methodName>NAME</methodName>\r\n
//! [<params><param><value>…</value></param></params>]
//! </methodCall>\r\n
//! ```
//!
//! Encoding is a pure transformation into a fixed-capacity string; it
//! yields `None` rather than a partial envelope when the capacity is too
//! small.

use core::fmt::Write;

use heapless::String;

/// Smallest envelope capacity the encoder accepts.
pub const MIN_ENVELOPE_CAPACITY: usize = 4096;

/// Capacity of the payload part (everything after the blank line).
const PAYLOAD_CAPACITY: usize = 4096;

/// Capacity of a rendered parameter fragment.
pub const PARAM_CAPACITY: usize = 128;

/// A rendered `<params>…</params>` fragment.
pub type Params = String<PARAM_CAPACITY>;

/// Renders method calls into complete request envelopes.
#[derive(Debug, Clone)]
pub struct RequestEncoder {
    host: String<64>,
    client_port: Option<u16>,
}

impl RequestEncoder {
    /// `host` is sent verbatim in the `Host:` header (truncated to 64 bytes).
    pub fn new(host: &str, client_port: Option<u16>) -> Self {
        let mut h = String::new();
        for c in host.chars() {
            if h.push(c).is_err() {
                break;
            }
        }
        Self { host: h, client_port }
    }

    /// Encode `method` with an optional pre-rendered parameter fragment.
    ///
    /// Returns `None` if `N` is below [`MIN_ENVELOPE_CAPACITY`] or the
    /// envelope does not fit.
    pub fn encode<const N: usize>(&self, method: &str, params: Option<&str>) -> Option<String<N>> {
        if N < MIN_ENVELOPE_CAPACITY {
            return None;
        }

        let mut payload: String<PAYLOAD_CAPACITY> = String::new();
        payload.push_str("<?xml version=\"1.0\"?>\r\n").ok()?;
        if let Some(port) = self.client_port {
            write!(payload, "<?clientid=\"hamlib({port})\"?>\r\n").ok()?;
        }
        write!(payload, "<methodCall><methodName>{method}</methodName>\r\n").ok()?;
        if let Some(p) = params.filter(|p| !p.is_empty()) {
            payload.push_str(p).ok()?;
        }
        payload.push_str("</methodCall>\r\n").ok()?;

        let mut out: String<N> = String::new();
        write!(
            out,
            "POST /RPC2 HTTP/1.1\r\n\
             User-Agent: XMLRPC++ 0.8\r\n\
             Host: {}\r\n\
             Content-type: text/xml\r\n\
             Content-length: {}\r\n\r\n",
            self.host,
            payload.len()
        )
        .ok()?;
        out.push_str(&payload).ok()?;
        Some(out)
    }
}

/// Parameter fragment builders.
///
/// Each returns `None` if the fragment would not fit in [`PARAM_CAPACITY`].
pub mod params {
    use core::fmt::Write;

    use super::Params;

    fn wrap(args: core::fmt::Arguments<'_>) -> Option<Params> {
        let mut p = Params::new();
        write!(p, "<params><param><value>{args}</value></param></params>").ok()?;
        Some(p)
    }

    /// `<value>TEXT</value>`
    pub fn string(text: &str) -> Option<Params> {
        wrap(format_args!("{text}"))
    }

    /// `<value><i4>N</i4></value>`
    pub fn i4(n: i64) -> Option<Params> {
        wrap(format_args!("<i4>{n}</i4>"))
    }

    /// `<value><double>D</double></value>` with `decimals` fraction digits.
    pub fn double(d: f64, decimals: usize) -> Option<Params> {
        wrap(format_args!("<double>{d:.decimals$}</double>"))
    }
}
