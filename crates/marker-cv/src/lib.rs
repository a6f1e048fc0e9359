//! Marker Tracker Computer Vision Library
//!
//! OpenCV pipeline that turns raw (Y, U, V) frames into ranked marker
//! candidates: static sequence masks, frame differencing, per-frame
//! thresholding and contour extraction, and consensus selection.

pub mod blob;
pub mod capture;
pub mod detection;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use blob::{Blob, BlobPool, RankCriterion, Selection};
pub use capture::{load_reference_mask, ChromaFormat, MemorySource, YuvCapture};
pub use detection::{
    CandidateDetector, ChannelThreshold, DetectorConfig, FrameState, MotionMask, SequenceState,
};
pub use error::PipelineError;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use super::*;
    use opencv::core::{Mat, Size};

    /// Anything that yields the frames of one sequence in order
    pub trait FrameSource {
        /// Next frame, or `None` once the source is exhausted
        fn next_frame(&mut self) -> Result<Option<Mat>>;

        fn frame_size(&self) -> Size;
    }

    impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
        fn next_frame(&mut self) -> Result<Option<Mat>> {
            (**self).next_frame()
        }

        fn frame_size(&self) -> Size {
            (**self).frame_size()
        }
    }
}
