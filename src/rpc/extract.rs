//! Payload extractor: pulls the returned value out of an accumulated
//! XML-RPC response without an XML parser.
//!
//! The payload is split on a fixed delimiter set and fed through a small
//! explicit state machine ([`TokenState`]) that only reacts to the
//! structurally significant tokens (`value`, `array`, `data`, the typed
//! scalar tags). Every scalar it meets is appended to the output,
//! pipe-delimited, so an array of `k` entries comes back as `k` segments.
//! Inside an array an empty entry still counts: `<value></value>` adds an
//! empty segment. A bare empty scalar adds nothing.
//!
//! Unlike the reader, running out of output capacity is not an error:
//! appending stops at the last token that fits and the result is flagged
//! as truncated.

use heapless::String;
use log::{trace, warn};

/// Must appear somewhere in the response for extraction to proceed.
pub const SUCCESS_MARKER: &str = " 200 OK";

/// Start of the payload.
pub const PAYLOAD_MARKER: &str = "<?xml";

/// Present in every XML-RPC fault response.
pub const FAULT_MARKER: &str = "faultString";

/// Separator between array entries in the output.
pub const SEPARATOR: char = '|';

const DELIMITERS: &[char] = &['<', '>', '\r', '\n', ' ', '\t'];

/// Tokenizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Outside any value; waiting for `value`.
    Scan,
    /// Just saw `value`; next token is a type tag, `array`, or the text.
    Value,
    /// Just saw `i4`/`int`/`double`/`string`; next token is the text.
    Typed,
    /// Just saw `array`; expecting `data`.
    ArrayOpen,
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<const N: usize> {
    /// Scalar text, or pipe-joined array entries. Empty means no usable value.
    pub value: String<N>,
    /// The response was an XML-RPC fault.
    pub fault: bool,
    /// Output capacity ran out; `value` holds the entries that fit.
    pub truncated: bool,
    /// Segments in `value`. Tells one empty array entry apart from none.
    pub entries: usize,
}

impl<const N: usize> Extracted<N> {
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

fn is_typed_scalar(token: &str) -> bool {
    matches!(token, "i4" | "int" | "double" | "string")
}

fn is_closing(token: &str) -> bool {
    token.starts_with('/')
}

struct Output<const N: usize> {
    value: String<N>,
    truncated: bool,
    entries: usize,
}

impl<const N: usize> Output<N> {
    fn push(&mut self, token: &str) {
        if self.truncated {
            return;
        }
        let sep = usize::from(self.entries > 0);
        if self.value.len() + sep + token.len() > N {
            warn!(
                "RPC: value truncated at {} bytes, dropping {:?}",
                self.value.len(),
                token
            );
            self.truncated = true;
            return;
        }
        if sep == 1 {
            let _ = self.value.push(SEPARATOR);
        }
        let _ = self.value.push_str(token);
        self.entries += 1;
    }
}

/// Extract the returned value from `raw`.
///
/// Returns `None` when the success marker or the payload start is missing.
pub fn extract<const N: usize>(raw: &str) -> Option<Extracted<N>> {
    if !raw.contains(SUCCESS_MARKER) {
        trace!("RPC: no '{}' in response", SUCCESS_MARKER.trim_start());
        return None;
    }
    let start = raw.find(PAYLOAD_MARKER)?;
    let payload = &raw[start..];
    // Skip the declaration itself.
    let body = payload.find("?>").map_or(payload, |i| &payload[i + 2..]);

    let mut out = Output::<N> {
        value: String::new(),
        truncated: false,
        entries: 0,
    };
    let mut state = TokenState::Scan;
    // Open `<array>` nesting.
    let mut arrays: u8 = 0;

    for token in body.split(DELIMITERS).filter(|t| !t.is_empty()) {
        state = match state {
            TokenState::Scan => match token {
                "value" => TokenState::Value,
                "/array" => {
                    arrays = arrays.saturating_sub(1);
                    TokenState::Scan
                }
                _ => TokenState::Scan,
            },
            TokenState::Value => match token {
                "array" => {
                    arrays = arrays.saturating_add(1);
                    TokenState::ArrayOpen
                }
                t if is_typed_scalar(t) => TokenState::Typed,
                "struct" => TokenState::Scan,
                t if is_closing(t) => {
                    if arrays > 0 {
                        out.push("");
                    }
                    TokenState::Scan
                }
                t => {
                    out.push(t);
                    TokenState::Scan
                }
            },
            TokenState::Typed => {
                if !is_closing(token) {
                    out.push(token);
                } else if arrays > 0 {
                    out.push("");
                }
                TokenState::Scan
            }
            TokenState::ArrayOpen => match token {
                "value" => TokenState::Value,
                "/array" => {
                    arrays = arrays.saturating_sub(1);
                    TokenState::Scan
                }
                _ => TokenState::Scan,
            },
        };
    }

    let fault = payload.contains(FAULT_MARKER) || out.value.contains(FAULT_MARKER);
    if fault {
        out.value.clear();
        out.entries = 0;
    }

    Some(Extracted {
        value: out.value,
        fault,
        truncated: out.truncated,
        entries: out.entries,
    })
}
