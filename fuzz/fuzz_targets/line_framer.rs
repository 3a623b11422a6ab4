//! Fuzz target for newline framing over arbitrary read chunking.
//!
//! Tests:
//! - No panics for any byte stream and chunk size
//! - Every frame ends with the terminator and respects the length limit
//! - The stream always ends with `TransportClosed`

#![no_main]

use arbitrary::Arbitrary;
use imu_stream::serial::framer::FRAME_TERMINATOR;
use imu_stream::serial::LineFramer;
use imu_stream::StreamError;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FramerInput {
    chunk_bytes: u8,
    max_frame_bytes: u8,
    stream: Vec<u8>,
}

fuzz_target!(|input: FramerInput| {
    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(_) => return,
    };
    let max = input.max_frame_bytes as usize;

    runtime.block_on(async {
        let mut framer = LineFramer::new(&input.stream[..], input.chunk_bytes as usize, max);
        loop {
            match framer.read_frame().await {
                Ok(frame) => {
                    assert_eq!(frame.last(), Some(&FRAME_TERMINATOR));
                    assert!(frame.len() <= max.max(1));
                }
                Err(StreamError::Framing { .. }) => continue,
                Err(StreamError::TransportClosed) => break,
                Err(other) => panic!("unexpected error kind: {}", other),
            }
        }
    });
});
