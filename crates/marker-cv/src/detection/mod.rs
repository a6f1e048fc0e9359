//! Candidate detection pipeline

pub mod config;
pub mod detector;
pub mod motion;
pub mod segmentation;

pub use config::{
    CandidateConfig, ChannelThreshold, DetectorConfig, MotionConfig, SegmentationConfig,
};
pub use detector::{CandidateDetector, FrameState};
pub use motion::MotionMask;
pub use segmentation::{ChannelMask, SequenceState};
