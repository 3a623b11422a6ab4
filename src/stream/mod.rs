//! Sample vector fan-out.

pub mod publisher;

pub use publisher::{
    publisher_for, BroadcastPublisher, Publisher, RendezvousPublisher, SampleStream,
};
