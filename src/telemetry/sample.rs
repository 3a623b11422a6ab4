//! Acceleration and rotation samples.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One acceleration reading, stamped with time since session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    /// X axis
    pub x: f64,
    /// Y axis
    pub y: f64,
    /// Z axis
    pub z: f64,
    /// Elapsed time since session start, in nanoseconds
    pub t_ns: i64,
}

impl AccelSample {
    /// Create a sample
    pub fn new(x: f64, y: f64, z: f64, t_ns: i64) -> Self {
        Self { x, y, z, t_ns }
    }

    /// Euclidean norm of the acceleration vector
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// `magnitude × t_ns`, this sample's contribution to the rolling speed
    pub fn pseudo_speed(&self) -> f64 {
        self.magnitude() * self.t_ns as f64
    }

    /// Axes as `[x, y, z]`
    pub fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for AccelSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6},{:.6}", self.x, self.y, self.z)
    }
}

/// One rotation-rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotSample {
    /// X axis
    pub x: f64,
    /// Y axis
    pub y: f64,
    /// Z axis
    pub z: f64,
}

impl RotSample {
    /// Create a sample
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Axes as `[x, y, z]`
    pub fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for RotSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6},{:.6}", self.x, self.y, self.z)
    }
}
