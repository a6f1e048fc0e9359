//! Single-marker position tracking

pub mod config;
pub mod observation;
pub mod tracker;

pub use config::{SingleSampleDistance, TrackerConfig};
pub use observation::Observation;
pub use tracker::{PositionTracker, TrackerError};
