//! Fuzz target for the telemetry record parser.
//!
//! Tests:
//! - No panics on arbitrary bytes
//! - Accepted records only ever carry finite values
//! - Rejected records report a field index no greater than the field count

#![no_main]

use imu_stream::telemetry::parse_record;
use imu_stream::StreamError;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match parse_record(data, 0) {
        Ok((accel, rot)) => {
            for value in accel.axes().iter().chain(rot.axes().iter()) {
                assert!(value.is_finite());
            }
            assert!(accel.magnitude() >= 0.0);
        }
        Err(StreamError::Parse { field, .. }) => {
            assert!(field <= 6);
        }
        Err(other) => panic!("unexpected error kind: {}", other),
    }
});
