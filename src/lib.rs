//! Marker Tracker
//!
//! Offline batch analyzer that follows a single marker through many frame
//! sequences and writes one position table for the whole batch.

pub mod config;
pub mod driver;

pub use config::{FrameFormat, RunConfig};
pub use driver::{AbortHandle, SequenceDriver};

pub type Result<T> = anyhow::Result<T>;
