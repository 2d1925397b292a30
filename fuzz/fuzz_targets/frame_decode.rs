//! Fuzz target for Frame::decode and Frame::take_from
//!
//! Arbitrary bytes, whole or as a stream, must never panic the decoder:
//! invalid input returns an error and a short buffer waits for more bytes.

#![no_main]

use bytes::BytesMut;
use easel_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Frame::decode(data);

    let mut buf = BytesMut::from(data);
    while let Ok(Some(frame)) = Frame::take_from(&mut buf) {
        assert!(frame.payload.len() <= data.len());
    }
});
