//! Fuzz target: `extract`
//!
//! Feeds arbitrary response text to the payload extractor and checks it
//! never panics, never overruns its output capacity and never returns a
//! value alongside a fault.
//!
//! cargo fuzz run fuzz_extract

#![no_main]

use flrig_link::rpc::extract::extract;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    if let Some(e) = extract::<256>(&text) {
        assert!(e.value.len() <= 256);
        if e.fault {
            assert!(e.is_empty(), "fault must clear the value");
        }
    }

    // Same bytes behind a valid status line and declaration.
    let framed = format!("HTTP/1.1 200 OK\r\n\r\n<?xml version=\"1.0\"?>\r\n{text}");
    let e = extract::<16>(&framed).expect("framed response always extracts");
    assert!(e.value.len() <= 16);
});
