//! Run configuration

use crate::Result;
use anyhow::Context;
use marker_core::TrackerConfig;
use marker_cv::{load_reference_mask, ChromaFormat, DetectorConfig, YuvCapture};
use opencv::core::Mat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables of a batch run, loadable from JSON.
///
/// Missing sections and fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config file: {:?}", path))
    }
}

/// Layout of the raw sequence files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    pub width: u32,
    pub height: u32,
    pub chroma: ChromaFormat,
    /// Frames advanced per read; 1 reads every frame
    pub frame_step: usize,
}

impl FrameFormat {
    /// Open a sequence file laid out in this format
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<YuvCapture> {
        YuvCapture::open(path, self.width, self.height, self.chroma, self.frame_step)
    }

    /// Load a reference mask at this format's resolution
    pub fn load_mask<P: AsRef<Path>>(&self, path: P) -> Result<Mat> {
        load_reference_mask(path, self.width, self.height, self.chroma)
    }
}
