//! Frame differencing

use super::config::MotionConfig;
use crate::utils::{ImageUtils, MaskOps};
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

/// Pixels that changed between two consecutive frames.
///
/// Recomputed for every frame pair, never carried over.
#[derive(Debug)]
pub struct MotionMask {
    mask: Mat,
}

impl MotionMask {
    /// Difference `previous` and `current` (both (Y, U, V) frames of equal size)
    pub fn compute(previous: &Mat, current: &Mat, config: &MotionConfig) -> Result<Self> {
        ImageUtils::ensure_color_frame(previous)?;
        ImageUtils::ensure_color_frame(current)?;
        ImageUtils::ensure_size(current, previous.size()?)?;

        let previous_gray = ImageUtils::yuv_to_gray(previous)?;
        let current_gray = ImageUtils::yuv_to_gray(current)?;

        let mut diff = Mat::default();
        core::absdiff(&previous_gray, &current_gray, &mut diff).context("Frame difference failed")?;

        let mut changed = Mat::default();
        imgproc::threshold(
            &diff,
            &mut changed,
            config.diff_threshold,
            255.0,
            imgproc::THRESH_BINARY,
        )?;

        let mask = MaskOps::open(&changed, config.erode_kernel, config.dilate_kernel)?;
        Ok(Self { mask })
    }

    pub fn as_mat(&self) -> &Mat {
        &self.mask
    }

    pub fn changed_pixels(&self) -> Result<i32> {
        Ok(core::count_non_zero(&self.mask)?)
    }

    /// Copy of `frame` with unchanged pixels zeroed
    pub fn apply(&self, frame: &Mat) -> Result<Mat> {
        let mut masked =
            Mat::new_size_with_default(frame.size()?, frame.typ(), core::Scalar::all(0.0))?;
        frame
            .copy_to_masked(&mut masked, &self.mask)
            .context("Applying motion mask failed")?;
        Ok(masked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Rect, Scalar, CV_8UC3};

    fn background() -> Result<Mat> {
        Ok(Mat::new_rows_cols_with_default(
            80,
            120,
            CV_8UC3,
            Scalar::new(40.0, 128.0, 128.0, 0.0),
        )?)
    }

    #[test]
    fn test_identical_frames_have_no_motion() -> Result<()> {
        let frame = background()?;
        let motion = MotionMask::compute(&frame, &frame, &MotionConfig::default())?;
        assert_eq!(motion.changed_pixels()?, 0);
        Ok(())
    }

    #[test]
    fn test_moving_patch_is_grown() -> Result<()> {
        let previous = background()?;
        let mut current = background()?;
        imgproc::rectangle(
            &mut current,
            Rect::new(50, 30, 10, 10),
            Scalar::new(200.0, 128.0, 128.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )?;

        let motion = MotionMask::compute(&previous, &current, &MotionConfig::default())?;
        assert_eq!(*motion.as_mat().at_2d::<u8>(35, 55)?, 255);
        // dilation grows the region past the patch edge
        assert_eq!(*motion.as_mat().at_2d::<u8>(35, 61)?, 255);
        assert_eq!(*motion.as_mat().at_2d::<u8>(5, 5)?, 0);
        Ok(())
    }

    #[test]
    fn test_small_changes_are_ignored() -> Result<()> {
        let previous = background()?;
        let shifted = Scalar::new(45.0, 128.0, 128.0, 0.0);
        let current = Mat::new_rows_cols_with_default(80, 120, CV_8UC3, shifted)?;
        let motion = MotionMask::compute(&previous, &current, &MotionConfig::default())?;
        assert_eq!(motion.changed_pixels()?, 0);
        Ok(())
    }

    #[test]
    fn test_apply_zeroes_static_pixels() -> Result<()> {
        let frame = background()?;
        let mut moving = background()?;
        imgproc::rectangle(
            &mut moving,
            Rect::new(55, 35, 10, 10),
            Scalar::new(255.0, 128.0, 128.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )?;

        let motion = MotionMask::compute(&frame, &moving, &MotionConfig::default())?;
        let masked = motion.apply(&moving)?;
        assert_eq!(masked.at_2d::<core::Vec3b>(40, 60)?.0, [255, 128, 128]);
        assert_eq!(masked.at_2d::<core::Vec3b>(5, 5)?.0, [0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_mismatched_frames_are_rejected() -> Result<()> {
        let previous = background()?;
        let current = Mat::new_rows_cols_with_default(60, 120, CV_8UC3, Scalar::all(0.0))?;
        assert!(MotionMask::compute(&previous, &current, &MotionConfig::default()).is_err());
        Ok(())
    }
}
