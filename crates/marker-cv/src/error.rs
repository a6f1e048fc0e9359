//! Fatal configuration errors of the detection pipeline

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("reference mask is empty")]
    EmptyMask,
    #[error("image is empty")]
    EmptyImage,
    #[error("expected a 3-channel 8-bit image, got OpenCV type {0}")]
    UnsupportedFrameType(i32),
    #[error("image is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    ResolutionMismatch {
        expected_width: i32,
        expected_height: i32,
        actual_width: i32,
        actual_height: i32,
    },
    #[error("frame {width}x{height} is too small for a {margin}px border margin")]
    FrameTooSmall { width: i32, height: i32, margin: i32 },
}
