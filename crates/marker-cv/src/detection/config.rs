//! Detection configuration

use serde::{Deserialize, Serialize};

/// Intensity range of one color channel.
///
/// Pixels strictly above `min` and at most `max` are kept. A disabled channel
/// degenerates to `[255, 255]`, which keeps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelThreshold {
    pub min: u8,
    pub max: u8,
    pub enabled: bool,
}

impl ChannelThreshold {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max, enabled: true }
    }

    pub const fn disabled() -> Self {
        Self {
            min: u8::MAX,
            max: u8::MAX,
            enabled: false,
        }
    }

    /// Effective (min, max) used by the threshold passes
    pub fn range(&self) -> (u8, u8) {
        if self.enabled {
            (self.min, self.max)
        } else {
            (u8::MAX, u8::MAX)
        }
    }
}

impl Default for ChannelThreshold {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Static mask construction, run once per sequence on the reference mask
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub blur_kernel: i32,
    pub erode_kernel: i32,
    pub dilate_kernel: i32,
    /// Width of the frame border always treated as excluded
    pub border_margin: i32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 3,
            erode_kernel: 3,
            dilate_kernel: 3,
            border_margin: 10,
        }
    }
}

/// Frame differencing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Gray-level change above which a pixel counts as moving
    pub diff_threshold: f64,
    pub erode_kernel: i32,
    pub dilate_kernel: i32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            diff_threshold: 10.0,
            erode_kernel: 3,
            dilate_kernel: 11,
        }
    }
}

/// Per-frame candidate extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    pub blur_kernel: i32,
    pub erode_kernel: i32,
    pub dilate_kernel: i32,
    /// Blobs with a smaller contour area (px²) are dropped
    pub min_area: f64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 3,
            erode_kernel: 11,
            dilate_kernel: 3,
            min_area: 4.0,
        }
    }
}

/// Main detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// One range per frame channel, in frame channel order
    pub channels: [ChannelThreshold; 3],
    pub segmentation: SegmentationConfig,
    pub motion: MotionConfig,
    pub candidates: CandidateConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            channels: [
                ChannelThreshold::disabled(),
                ChannelThreshold::new(50, 70),
                ChannelThreshold::new(155, 195),
            ],
            segmentation: SegmentationConfig::default(),
            motion: MotionConfig::default(),
            candidates: CandidateConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Default pipeline with custom channel ranges
    pub fn with_channels(channels: [ChannelThreshold; 3]) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }
}
