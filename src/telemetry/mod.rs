//! Telemetry decoding and kinematics.

pub mod format;
pub mod integrator;
pub mod parser;
pub mod pipeline;
pub mod sample;
pub mod window;

pub use format::{SampleVector, VECTOR_LEN};
pub use integrator::{KinematicIntegrator, KinematicState};
pub use parser::parse_record;
pub use pipeline::TelemetryPipeline;
pub use sample::{AccelSample, RotSample};
pub use window::{window_capacity, SampleWindow};
