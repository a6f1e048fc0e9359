//! Marker tracking core
//!
//! Image-library-free building blocks of the marker tracker: positions and
//! search windows, the position tracker, per-sequence result accumulation and
//! the batch input lists.

pub mod geometry;
pub mod lists;
pub mod results;
pub mod tracking;

pub use geometry::{Position, Resolution, Window};
pub use lists::{ListError, SequenceInput, SequenceList};
pub use results::{FrameRecord, ResultTable, SequenceRecorder, SequenceResult, SequenceSummary};
pub use tracking::{Observation, PositionTracker, SingleSampleDistance, TrackerConfig, TrackerError};
