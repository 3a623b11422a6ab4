//! Single-owner telemetry state.
//!
//! [`TelemetryPipeline`] owns both sample windows, the kinematic integrator
//! and the session clock. One frame goes in, one [`SampleVector`] comes out.
//! A frame that fails to parse leaves every piece of state untouched.

use crate::error::AppResult;
use crate::telemetry::format::SampleVector;
use crate::telemetry::integrator::{KinematicIntegrator, KinematicState};
use crate::telemetry::parser::parse_record;
use crate::telemetry::sample::{AccelSample, RotSample};
use crate::telemetry::window::{window_capacity, SampleWindow};
use std::time::Duration;
use tokio::time::Instant;

/// Windows, integrator and session clock for one device.
#[derive(Debug)]
pub struct TelemetryPipeline {
    accel: SampleWindow<AccelSample>,
    rot: SampleWindow<RotSample>,
    integrator: KinematicIntegrator,
    started: Instant,
}

impl TelemetryPipeline {
    /// Create a pipeline whose windows cover one second at `sample_rate_hz`.
    ///
    /// The session clock starts now.
    pub fn new(sample_rate_hz: u32) -> Self {
        Self::with_capacity(window_capacity(sample_rate_hz))
    }

    /// Create a pipeline with an explicit window capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            accel: SampleWindow::new(capacity),
            rot: SampleWindow::new(capacity),
            integrator: KinematicIntegrator::new(),
            started: Instant::now(),
        }
    }

    /// Run one ingestion cycle: parse, append, integrate, evict, format.
    pub fn ingest(&mut self, frame: &[u8]) -> AppResult<SampleVector> {
        let t_ns = duration_ns(self.started.elapsed());
        let (accel, rot) = parse_record(frame, t_ns)?;

        self.accel.append(accel);
        self.rot.append(rot);

        let oldest = *self.accel.oldest()?;
        let state = self.integrator.update(&accel, &oldest);

        self.accel.evict_if_over_capacity();
        self.rot.evict_if_over_capacity();

        self.format(state)
    }

    /// Vector for the latest samples, or `EmptyWindow` before the first one.
    pub fn latest_vector(&self) -> AppResult<SampleVector> {
        self.format(self.integrator.state())
    }

    /// Acceleration window
    pub fn accel_window(&self) -> &SampleWindow<AccelSample> {
        &self.accel
    }

    /// Rotation window
    pub fn rot_window(&self) -> &SampleWindow<RotSample> {
        &self.rot
    }

    /// Current kinematic state
    pub fn state(&self) -> KinematicState {
        self.integrator.state()
    }

    fn format(&self, state: KinematicState) -> AppResult<SampleVector> {
        let accel = self.accel.latest()?;
        let rot = self.rot.latest()?;
        Ok(SampleVector::assemble(accel, rot, state, self.started.elapsed()))
    }
}

fn duration_ns(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX)
}
