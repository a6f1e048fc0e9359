//! Tracker configuration

use serde::{Deserialize, Serialize};

/// How `average_distance(1)` anchors its single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SingleSampleDistance {
    /// Distance from the last detection to the current prediction, same as n > 1
    #[default]
    ToPrediction,
    /// Distance from the last detection to the coordinate origin.
    /// Reproduces result files written by older versions of the tool.
    ToOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of recent detections used for prediction and window sizing
    pub history_len: usize,
    /// Smallest side of a search window, in pixels
    pub min_window_side: f64,
    /// Largest window scale tried before a frame is marked undetected
    pub max_window_scale: u32,
    /// Frames read at sequence start to seed the tracker (the first one only
    /// serves as the reference for frame differencing)
    pub initial_frames: usize,
    pub single_sample_distance: SingleSampleDistance,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_len: 4,
            min_window_side: 100.0,
            max_window_scale: 3,
            initial_frames: 5,
            single_sample_distance: SingleSampleDistance::ToPrediction,
        }
    }
}
