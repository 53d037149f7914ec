//! Fuzz target: feed arbitrary datagrams through normalisation and the
//! JSON request decoder.
//!
//! Run: `cargo +nightly fuzz run fuzz_request_decoder`

#![no_main]

use libfuzzer_sys::fuzz_target;
use retic::app::commands::{Command, Request};
use retic::rpc::codec;

fuzz_target!(|data: &[u8]| {
    let payload = codec::normalize(data);
    if let Ok(Request::Set(Command::Operate { duration_secs, .. })) = codec::decode(&payload) {
        assert!(duration_secs > 0);
    }
});
