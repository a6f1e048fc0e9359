//! In-memory frame sequences

use crate::traits::FrameSource;
use crate::utils::ImageUtils;
use crate::Result;
use opencv::{
    core::{Mat, Size},
    prelude::*,
};
use std::collections::VecDeque;

/// Frames held in memory, handed out in order
#[derive(Debug)]
pub struct MemorySource {
    size: Size,
    frames: VecDeque<Mat>,
}

impl MemorySource {
    /// All frames must be 3-channel 8-bit images of the same size
    pub fn new(frames: Vec<Mat>) -> Result<Self> {
        let size = match frames.first() {
            Some(first) => first.size()?,
            None => Size::default(),
        };
        for frame in &frames {
            ImageUtils::ensure_color_frame(frame)?;
            ImageUtils::ensure_size(frame, size)?;
        }

        Ok(Self {
            size,
            frames: frames.into(),
        })
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        Ok(self.frames.pop_front())
    }

    fn frame_size(&self) -> Size {
        self.size
    }
}
