//! Frame sources

pub mod memory;
pub mod yuv;

pub use memory::MemorySource;
pub use yuv::{ChromaFormat, YuvCapture};

use crate::error::PipelineError;
use crate::traits::FrameSource;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{core::Mat, core::Size, prelude::*};
use std::path::Path;

/// Load the reference mask of a sequence.
///
/// `.yuv` files contribute their first frame; anything else is read as an
/// image file and converted to (Y, U, V).
pub fn load_reference_mask<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
    format: ChromaFormat,
) -> Result<Mat> {
    let path = path.as_ref();
    let is_yuv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("yuv"))
        .unwrap_or(false);

    let mask = if is_yuv {
        let mut capture = YuvCapture::open(path, width, height, format, 1)?;
        capture
            .next_frame()?
            .ok_or(PipelineError::EmptyMask)
            .with_context(|| format!("Mask file holds no complete frame: {:?}", path))?
    } else {
        ImageUtils::load_yuv(path)?
    };

    if mask.empty() {
        return Err(PipelineError::EmptyMask.into());
    }
    ImageUtils::ensure_size(&mask, Size::new(width as i32, height as i32))
        .with_context(|| format!("Mask resolution does not match the sequence: {:?}", path))?;
    Ok(mask)
}
