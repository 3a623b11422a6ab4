//! Rolling speed and delta over the acceleration window.
//!
//! The quantities are kept for compatibility with existing consumers: each
//! sample adds `|a| × t_ns` to a running total, and the delta is that total
//! minus the oldest windowed sample's contribution. Neither is a physical
//! speed.

use crate::telemetry::sample::AccelSample;
use serde::Serialize;

/// Derived values published with every sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KinematicState {
    /// Sum of `magnitude × t_ns` over every accepted sample
    pub rolling_speed: f64,
    /// `rolling_speed` minus the oldest windowed sample's contribution
    pub rolling_delta: f64,
}

/// Owns the running kinematic state.
#[derive(Debug, Default)]
pub struct KinematicIntegrator {
    state: KinematicState,
    updates: u64,
}

impl KinematicIntegrator {
    /// Start from zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a newly accepted sample.
    ///
    /// `oldest` is the oldest sample in the window after `sample` was appended
    /// and before any eviction.
    pub fn update(&mut self, sample: &AccelSample, oldest: &AccelSample) -> KinematicState {
        self.state.rolling_speed += sample.pseudo_speed();
        self.state.rolling_delta = self.state.rolling_speed - oldest.pseudo_speed();
        self.updates += 1;
        self.state
    }

    /// Current state
    pub fn state(&self) -> KinematicState {
        self.state
    }

    /// Accepted samples folded in so far
    pub fn updates(&self) -> u64 {
        self.updates
    }
}
