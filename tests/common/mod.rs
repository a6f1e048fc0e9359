// Synthetic scenes shared by the integration tests
#![allow(dead_code)]

use marker_cv::{ChannelThreshold, DetectorConfig};
use marker_tracker::{Result, RunConfig};
use opencv::{
    core::{Mat, Rect, Scalar, CV_8UC3},
    imgproc,
    prelude::*,
};
use rand::{rngs::StdRng, Rng};
use std::fs;
use std::path::Path;

/// Dark, neutral background in (Y, U, V)
pub const BACKGROUND: [f64; 3] = [40.0, 128.0, 128.0];
/// Bright, neutral marker in (Y, U, V)
pub const MARKER: [f64; 3] = [200.0, 128.0, 128.0];
pub const MARKER_SIDE: i32 = 24;

/// Detector tuned to the bright marker: luma only, chroma disabled
pub fn marker_config() -> RunConfig {
    RunConfig {
        detector: DetectorConfig::with_channels([
            ChannelThreshold::new(150, 255),
            ChannelThreshold::disabled(),
            ChannelThreshold::disabled(),
        ]),
        ..Default::default()
    }
}

/// Background frame with optional marker squares (top-left corners) and
/// optional +-2 luma noise
pub fn scene(
    width: i32,
    height: i32,
    markers: &[(i32, i32)],
    rng: Option<&mut StdRng>,
) -> Result<Mat> {
    let mut frame = Mat::new_rows_cols_with_default(
        height,
        width,
        CV_8UC3,
        Scalar::new(BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 0.0),
    )?;
    for &(x, y) in markers {
        imgproc::rectangle(
            &mut frame,
            Rect::new(x, y, MARKER_SIDE, MARKER_SIDE),
            Scalar::new(MARKER[0], MARKER[1], MARKER[2], 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )?;
    }

    if let Some(rng) = rng {
        for pixel in frame.data_bytes_mut()?.chunks_mut(3) {
            let noisy = pixel[0] as i16 + rng.gen_range(-2i16..=2);
            pixel[0] = noisy.clamp(0, 255) as u8;
        }
    }
    Ok(frame)
}

/// Center of a marker square drawn at `(x, y)`
pub fn marker_center(x: i32, y: i32) -> (f64, f64) {
    let half = (MARKER_SIDE - 1) as f64 / 2.0;
    (x as f64 + half, y as f64 + half)
}

/// Store frames as a planar 4:4:4 YUV file
pub fn write_yuv444(path: &Path, frames: &[Mat]) -> Result<()> {
    let mut bytes = Vec::new();
    for frame in frames {
        let data = frame.data_bytes()?;
        for channel in 0..3 {
            bytes.extend(data.iter().skip(channel).step_by(3));
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}
