//! Thresholding and morphology shared by the static and per-frame masks

use crate::detection::config::ChannelThreshold;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat, Point, Size},
    imgproc,
    prelude::*,
};

/// Single-channel mask operations
pub struct MaskOps;

impl MaskOps {
    /// Elliptic structuring element of `size`x`size`
    pub fn ellipse_kernel(size: i32) -> Result<Mat> {
        imgproc::get_structuring_element(
            imgproc::MORPH_ELLIPSE,
            Size::new(size, size),
            Point::new(-1, -1),
        )
        .context("Failed to build structuring element")
    }

    /// Gaussian smoothing with sigma derived from the kernel size.
    /// Kernel sizes below 3 leave the image untouched.
    pub fn blur(src: &Mat, kernel: i32) -> Result<Mat> {
        if kernel < 3 {
            return Ok(src.try_clone()?);
        }

        let mut blurred = Mat::default();
        imgproc::gaussian_blur(
            src,
            &mut blurred,
            Size::new(kernel | 1, kernel | 1),
            0.0,
            0.0,
            core::BORDER_DEFAULT,
        )
        .context("Gaussian blur failed")?;
        Ok(blurred)
    }

    /// Keep pixels in `(min, max]` and binarize them to 255
    pub fn band_pass(src: &Mat, threshold: &ChannelThreshold) -> Result<Mat> {
        let (min, max) = threshold.range();

        // 1. preserve pixels above min
        let mut above = Mat::default();
        imgproc::threshold(src, &mut above, min as f64, 255.0, imgproc::THRESH_TOZERO)?;

        // 2. preserve pixels up to max
        let mut within = Mat::default();
        imgproc::threshold(&above, &mut within, max as f64, 255.0, imgproc::THRESH_TOZERO_INV)?;

        // 3. binarize what is left
        let mut binary = Mat::default();
        imgproc::threshold(&within, &mut binary, 0.0, 255.0, imgproc::THRESH_BINARY)?;

        Ok(binary)
    }

    pub fn erode(src: &Mat, kernel: i32) -> Result<Mat> {
        if kernel < 2 {
            return Ok(src.try_clone()?);
        }

        let mut eroded = Mat::default();
        imgproc::erode(
            src,
            &mut eroded,
            &Self::ellipse_kernel(kernel)?,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )
        .context("Erosion failed")?;
        Ok(eroded)
    }

    pub fn dilate(src: &Mat, kernel: i32) -> Result<Mat> {
        if kernel < 2 {
            return Ok(src.try_clone()?);
        }

        let mut dilated = Mat::default();
        imgproc::dilate(
            src,
            &mut dilated,
            &Self::ellipse_kernel(kernel)?,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )
        .context("Dilation failed")?;
        Ok(dilated)
    }

    /// Erode then dilate: drops responses smaller than the erosion kernel
    pub fn open(src: &Mat, erode_kernel: i32, dilate_kernel: i32) -> Result<Mat> {
        let eroded = Self::erode(src, erode_kernel)?;
        Self::dilate(&eroded, dilate_kernel)
    }

    pub fn invert(src: &Mat) -> Result<Mat> {
        let mut inverted = Mat::default();
        core::bitwise_not(src, &mut inverted, &core::no_array())?;
        Ok(inverted)
    }

    pub fn union(a: &Mat, b: &Mat) -> Result<Mat> {
        let mut combined = Mat::default();
        core::bitwise_or(a, b, &mut combined, &core::no_array())?;
        Ok(combined)
    }

    /// Union of several masks of identical size
    pub fn union_all(masks: &[Mat]) -> Result<Mat> {
        let (first, rest) = masks.split_first().context("No masks to combine")?;
        rest.iter()
            .try_fold(first.try_clone()?, |acc, mask| Self::union(&acc, mask))
    }

    /// Mask of `size` that is 255 within `margin` pixels of the edge, 0 inside
    pub fn border(size: Size, margin: i32) -> Result<Mat> {
        let mut border = Mat::new_size_with_default(size, core::CV_8UC1, core::Scalar::all(255.0))?;
        let inner =
            core::Rect::new(margin, margin, size.width - 2 * margin, size.height - 2 * margin);
        imgproc::rectangle(&mut border, inner, core::Scalar::all(0.0), -1, imgproc::LINE_8, 0)?;
        Ok(border)
    }
}
