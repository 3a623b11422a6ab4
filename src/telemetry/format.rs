//! The published sample vector.
//!
//! Ten reals, in this order:
//!
//! | index | value                   |
//! |-------|-------------------------|
//! | 0..3  | acceleration x, y, z    |
//! | 3     | acceleration magnitude  |
//! | 4     | rolling delta           |
//! | 5     | rolling speed           |
//! | 6..9  | rotation x, y, z        |
//! | 9     | elapsed time, ns        |
//!
//! Serialized as a bare JSON array.

use crate::telemetry::integrator::KinematicState;
use crate::telemetry::sample::{AccelSample, RotSample};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of values in a [`SampleVector`]
pub const VECTOR_LEN: usize = 10;

/// Latest acceleration, derived kinematics, latest rotation and elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleVector([f64; VECTOR_LEN]);

impl SampleVector {
    /// Build the vector from the latest samples.
    ///
    /// `elapsed` is measured when formatting, not when the sample arrived.
    pub fn assemble(
        accel: &AccelSample,
        rot: &RotSample,
        state: KinematicState,
        elapsed: Duration,
    ) -> Self {
        Self([
            accel.x,
            accel.y,
            accel.z,
            accel.magnitude(),
            state.rolling_delta,
            state.rolling_speed,
            rot.x,
            rot.y,
            rot.z,
            elapsed.as_nanos() as f64,
        ])
    }

    /// All ten values
    pub fn values(&self) -> &[f64; VECTOR_LEN] {
        &self.0
    }

    /// Acceleration axes
    pub fn accel(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Acceleration magnitude
    pub fn magnitude(&self) -> f64 {
        self.0[3]
    }

    /// Rolling delta
    pub fn rolling_delta(&self) -> f64 {
        self.0[4]
    }

    /// Rolling speed
    pub fn rolling_speed(&self) -> f64 {
        self.0[5]
    }

    /// Rotation axes
    pub fn rot(&self) -> [f64; 3] {
        [self.0[6], self.0[7], self.0[8]]
    }

    /// Elapsed nanoseconds since session start
    pub fn elapsed_ns(&self) -> f64 {
        self.0[9]
    }

    /// JSON array text
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One server-sent event: `data: <json>\n\n`
    pub fn to_event(&self) -> serde_json::Result<Bytes> {
        Ok(Bytes::from(format!("data: {}\n\n", self.to_json()?)))
    }
}

impl From<[f64; VECTOR_LEN]> for SampleVector {
    fn from(values: [f64; VECTOR_LEN]) -> Self {
        Self(values)
    }
}
