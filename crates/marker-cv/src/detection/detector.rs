//! Per-frame candidate detection

use super::config::DetectorConfig;
use super::motion::MotionMask;
use super::segmentation::SequenceState;
use crate::blob::{Blob, BlobPool, Selection};
use crate::utils::{ImageUtils, MaskOps};
use crate::Result;
use anyhow::Context;
use marker_core::Window;
use opencv::{
    core::{self, Mat, Point, Rect, Size, Vector},
    imgproc,
    prelude::*,
};
use tracing::{debug, trace};

/// Everything derived from one frame pair
#[derive(Debug)]
pub struct FrameState {
    motion: MotionMask,
    region: Rect,
    binary: Mat,
    contour_count: usize,
    candidates: BlobPool,
}

impl FrameState {
    pub fn motion(&self) -> &MotionMask {
        &self.motion
    }

    /// Frame region the candidates were extracted from
    pub fn region(&self) -> Rect {
        self.region
    }

    /// Union of the channel binaries, in region coordinates
    pub fn binary(&self) -> &Mat {
        &self.binary
    }

    /// Contours found before filtering
    pub fn contour_count(&self) -> usize {
        self.contour_count
    }

    /// Filtered candidates, in frame coordinates
    pub fn candidates(&self) -> &BlobPool {
        &self.candidates
    }

    /// Select from a copy of the pool so the frame can be retried with a larger window
    pub fn select_best(&self, window: &Window) -> Selection {
        self.candidates.clone().select_best(window)
    }
}

/// Candidate detector
pub struct CandidateDetector {
    config: DetectorConfig,
}

impl CandidateDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Build the static masks of a new sequence
    pub fn prepare_sequence(&self, reference: &Mat) -> Result<SequenceState> {
        SequenceState::build(reference, &self.config).context("Failed to build static masks")
    }

    /// Detect candidates in `current` over the whole frame
    pub fn detect(
        &self,
        sequence: &SequenceState,
        previous: &Mat,
        current: &Mat,
    ) -> Result<FrameState> {
        let size = sequence.size();
        let full = Window::new(0.0, 0.0, size.width as f64, size.height as f64);
        self.detect_in(sequence, previous, current, &full)
    }

    /// Detect candidates in the part of `current` covered by `region`.
    ///
    /// Blobs are reported in full-frame coordinates.
    pub fn detect_in(
        &self,
        sequence: &SequenceState,
        previous: &Mat,
        current: &Mat,
        region: &Window,
    ) -> Result<FrameState> {
        ImageUtils::ensure_color_frame(current)?;
        ImageUtils::ensure_size(current, sequence.size())?;
        ImageUtils::ensure_size(previous, sequence.size())?;

        let motion = MotionMask::compute(previous, current, &self.config.motion)?;
        let rect = Self::clip(region, sequence.size());
        if rect.width <= 0 || rect.height <= 0 {
            trace!(?region, "detection region lies outside the frame");
            return Ok(FrameState {
                motion,
                region: rect,
                binary: Mat::default(),
                contour_count: 0,
                candidates: BlobPool::new(),
            });
        }

        let moving = motion.apply(current)?;
        let cropped = Mat::roi(&moving, rect)?.try_clone()?;
        let binary = self.threshold_channels(sequence, &cropped, rect)?;

        let mut edges = Mat::default();
        imgproc::canny(&binary, &mut edges, 0.0, 255.0, 3, false).context("Edge detection failed")?;

        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &edges,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("Contour extraction failed")?;

        let offset = Point::new(rect.x, rect.y);
        let mut raw = BlobPool::new();
        for (id, contour) in contours.iter().enumerate() {
            raw.push(Blob::new(id as u32, &contour, &cropped, &binary)?.translate(offset));
        }

        let contour_count = raw.len();
        let candidates = raw.filter(sequence.exclusion(), self.config.candidates.min_area)?;
        debug!(
            contours = contour_count,
            candidates = candidates.len(),
            moving_px = motion.changed_pixels()?,
            "frame candidates"
        );

        Ok(FrameState {
            motion,
            region: rect,
            binary,
            contour_count,
            candidates,
        })
    }

    /// Per-channel band-pass over the statically allowed pixels, combined with OR
    fn threshold_channels(
        &self,
        sequence: &SequenceState,
        cropped: &Mat,
        rect: Rect,
    ) -> Result<Mat> {
        let planes = ImageUtils::split_channels(cropped)?;
        let allowed = sequence.allowed_in(rect)?;
        let cand = &self.config.candidates;

        let mut binaries = Vec::with_capacity(3);
        let channels = planes.iter().zip(allowed.iter()).zip(self.config.channels.iter());
        for ((plane, allowed), threshold) in channels {
            let mut selected =
                Mat::new_size_with_default(plane.size()?, core::CV_8UC1, core::Scalar::all(0.0))?;
            plane.copy_to_masked(&mut selected, allowed)?;

            let blurred = MaskOps::blur(&selected, cand.blur_kernel)?;
            let in_range = MaskOps::band_pass(&blurred, threshold)?;
            binaries.push(MaskOps::open(&in_range, cand.erode_kernel, cand.dilate_kernel)?);
        }

        MaskOps::union_all(&binaries)
    }

    /// Integer frame rectangle covering `window`, clipped to `size`
    fn clip(window: &Window, size: Size) -> Rect {
        let x0 = (window.x.floor() as i32).clamp(0, size.width);
        let y0 = (window.y.floor() as i32).clamp(0, size.height);
        let x1 = (window.right().ceil() as i32).clamp(0, size.width);
        let y1 = (window.bottom().ceil() as i32).clamp(0, size.height);
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }
}
