//! Fuzz target: `read_response`
//!
//! Plays arbitrary bytes back as leftover input and as the remote's reply,
//! then runs the reader. It must terminate, stay within the response
//! capacity and report overflow as an error rather than truncating.
//!
//! cargo fuzz run fuzz_reader

#![no_main]

use flrig_link::Error;
use flrig_link::adapters::time::RecordingDelay;
use flrig_link::rpc::reader::{RESPONSE_CAPACITY, RawResponse, ReadStatus, read_response};
use flrig_link::rpc::transport::ScriptedTransport;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&retries, rest)) = data.split_first() else {
        return;
    };
    let text = String::from_utf8_lossy(rest);

    let mut t = ScriptedTransport::new();
    t.inject_stale(&text);
    let mut delay = RecordingDelay::new();
    let mut raw = RawResponse::new();

    match read_response(&mut t, &mut delay, &mut raw, retries % 8, 2) {
        Ok(ReadStatus::Complete) => {
            assert!(raw.is_complete());
            assert_eq!(delay.total_ms(), 2);
        }
        Ok(ReadStatus::Exhausted) => assert_eq!(delay.total_ms(), 0),
        Err(Error::Overflow) => {}
        Err(e) => panic!("unexpected reader error: {e}"),
    }
    assert!(raw.len() <= RESPONSE_CAPACITY);
});
