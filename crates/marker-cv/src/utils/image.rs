//! Image conversions and frame validation

use crate::error::PipelineError;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat, Size},
    imgproc,
    prelude::*,
};
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Check that `mat` is a non-empty 8-bit, 3-channel image
    pub fn ensure_color_frame(mat: &Mat) -> Result<()> {
        if mat.empty() {
            return Err(PipelineError::EmptyImage.into());
        }
        if mat.typ() != core::CV_8UC3 {
            return Err(PipelineError::UnsupportedFrameType(mat.typ()).into());
        }
        Ok(())
    }

    /// Check that `mat` has the sequence resolution
    pub fn ensure_size(mat: &Mat, expected: Size) -> Result<()> {
        let actual = mat.size()?;
        if actual != expected {
            return Err(PipelineError::ResolutionMismatch {
                expected_width: expected.width,
                expected_height: expected.height,
                actual_width: actual.width,
                actual_height: actual.height,
            }
            .into());
        }
        Ok(())
    }

    /// Copy an interleaved 3-channel buffer into a Mat, channel order unchanged
    pub fn rgb_to_mat(rgb_image: &image::RgbImage) -> Result<Mat> {
        let (width, height) = rgb_image.dimensions();
        let mut mat = Mat::new_rows_cols_with_default(
            height as i32,
            width as i32,
            core::CV_8UC3,
            core::Scalar::all(0.0),
        )?;
        mat.data_bytes_mut()?.copy_from_slice(rgb_image.as_raw());
        Ok(mat)
    }

    /// Frames are stored as (Y, U, V); convert to BGR for display-space operations
    pub fn yuv_to_bgr(yuv: &Mat) -> Result<Mat> {
        let mut bgr = Mat::default();
        imgproc::cvt_color(yuv, &mut bgr, imgproc::COLOR_YUV2BGR, 0)
            .context("YUV to BGR conversion failed")?;
        Ok(bgr)
    }

    /// Single-channel intensity of a (Y, U, V) frame
    pub fn yuv_to_gray(yuv: &Mat) -> Result<Mat> {
        let bgr = Self::yuv_to_bgr(yuv)?;
        let mut gray = Mat::default();
        imgproc::cvt_color(&bgr, &mut gray, imgproc::COLOR_BGR2GRAY, 0)
            .context("BGR to gray conversion failed")?;
        Ok(gray)
    }

    /// Load an image file and convert it to the (Y, U, V) frame representation
    pub fn load_yuv<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let path = path.as_ref();
        let rgb = image::open(path)
            .with_context(|| format!("Failed to load color image: {:?}", path))?
            .to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(PipelineError::EmptyImage.into());
        }

        let mat = Self::rgb_to_mat(&rgb)?;
        let mut yuv = Mat::default();
        imgproc::cvt_color(&mat, &mut yuv, imgproc::COLOR_RGB2YUV, 0)
            .context("RGB to YUV conversion failed")?;
        Ok(yuv)
    }

    /// Split a 3-channel image into its planes
    pub fn split_channels(mat: &Mat) -> Result<[Mat; 3]> {
        let mut planes = core::Vector::<Mat>::new();
        core::split(mat, &mut planes).context("Channel split failed")?;
        Ok([planes.get(0)?, planes.get(1)?, planes.get(2)?])
    }
}
