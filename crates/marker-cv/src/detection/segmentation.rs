//! Static per-sequence masks built from the reference mask image

use super::config::DetectorConfig;
use crate::error::PipelineError;
use crate::utils::{ImageUtils, MaskOps};
use crate::Result;
use opencv::{
    core::{Mat, Rect, Size},
    prelude::*,
};
use tracing::debug;

/// Static masks of one channel
#[derive(Debug)]
pub struct ChannelMask {
    /// Background structure in the channel range, border margin included
    pub excluded: Mat,
    /// Pixels the per-frame thresholding is allowed to look at
    pub allowed: Mat,
}

/// Segmentation state of one sequence.
///
/// Built once from the reference mask and read-only afterwards; a new
/// sequence builds a new state.
#[derive(Debug)]
pub struct SequenceState {
    size: Size,
    channels: [ChannelMask; 3],
    exclusion: Mat,
}

impl SequenceState {
    /// Build the static masks from a 3-channel reference mask
    pub fn build(reference: &Mat, config: &DetectorConfig) -> Result<Self> {
        if reference.empty() {
            return Err(PipelineError::EmptyMask.into());
        }
        ImageUtils::ensure_color_frame(reference)?;

        let size = reference.size()?;
        let margin = config.segmentation.border_margin;
        if size.width <= 2 * margin || size.height <= 2 * margin {
            return Err(PipelineError::FrameTooSmall {
                width: size.width,
                height: size.height,
                margin,
            }
            .into());
        }

        let border = MaskOps::border(size, margin)?;
        let planes = ImageUtils::split_channels(reference)?;
        let seg = &config.segmentation;

        let mut masks = Vec::with_capacity(3);
        for (plane, threshold) in planes.iter().zip(config.channels.iter()) {
            let blurred = MaskOps::blur(plane, seg.blur_kernel)?;
            let in_range = MaskOps::band_pass(&blurred, threshold)?;
            let opened = MaskOps::open(&in_range, seg.erode_kernel, seg.dilate_kernel)?;

            // The inverse is taken before the border is forced on, so the
            // per-frame pass still sees pixels near the edge.
            let allowed = MaskOps::invert(&opened)?;
            let excluded = MaskOps::union(&opened, &border)?;
            masks.push(ChannelMask { excluded, allowed });
        }

        let exclusion = MaskOps::union_all(&[
            masks[0].excluded.try_clone()?,
            masks[1].excluded.try_clone()?,
            masks[2].excluded.try_clone()?,
        ])?;

        let channels: [ChannelMask; 3] = masks
            .try_into()
            .map_err(|_| anyhow::anyhow!("expected exactly three channel masks"))?;

        debug!(
            width = size.width,
            height = size.height,
            excluded_px = opencv::core::count_non_zero(&exclusion)?,
            "built static masks"
        );

        Ok(Self {
            size,
            channels,
            exclusion,
        })
    }

    /// Resolution every frame of the sequence must have
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelMask> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[ChannelMask; 3] {
        &self.channels
    }

    /// Union of the three channel exclusion masks
    pub fn exclusion(&self) -> &Mat {
        &self.exclusion
    }

    /// Allowed-pixel masks of every channel cropped to `region`
    pub fn allowed_in(&self, region: Rect) -> Result<[Mat; 3]> {
        let crop = |mask: &Mat| -> Result<Mat> { Ok(Mat::roi(mask, region)?.try_clone()?) };
        Ok([
            crop(&self.channels[0].allowed)?,
            crop(&self.channels[1].allowed)?,
            crop(&self.channels[2].allowed)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::config::ChannelThreshold;
    use opencv::{
        core::{self, Scalar, CV_8UC3},
        imgproc,
    };

    fn reference_with_patch() -> Result<Mat> {
        // Background (Y=40, U=128, V=128) with one bright static patch
        let background = Scalar::new(40.0, 128.0, 128.0, 0.0);
        let mut reference = Mat::new_rows_cols_with_default(120, 160, CV_8UC3, background)?;
        imgproc::rectangle(
            &mut reference,
            Rect::new(60, 40, 20, 20),
            Scalar::new(200.0, 128.0, 128.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )?;
        Ok(reference)
    }

    fn bright_config() -> DetectorConfig {
        DetectorConfig::with_channels([
            ChannelThreshold::new(150, 255),
            ChannelThreshold::disabled(),
            ChannelThreshold::disabled(),
        ])
    }

    #[test]
    fn test_static_patch_is_excluded() -> Result<()> {
        let state = SequenceState::build(&reference_with_patch()?, &bright_config())?;

        let luma = state.channel(0).expect("luma channel");
        assert_eq!(*luma.excluded.at_2d::<u8>(50, 70)?, 255);
        assert_eq!(*luma.allowed.at_2d::<u8>(50, 70)?, 0);
        assert_eq!(*luma.allowed.at_2d::<u8>(100, 20)?, 255);

        assert_eq!(*state.exclusion().at_2d::<u8>(50, 70)?, 255);
        assert_eq!(*state.exclusion().at_2d::<u8>(100, 20)?, 0);
        Ok(())
    }

    #[test]
    fn test_border_is_always_excluded() -> Result<()> {
        let state = SequenceState::build(&reference_with_patch()?, &bright_config())?;
        for mask in state.channels() {
            assert_eq!(*mask.excluded.at_2d::<u8>(0, 0)?, 255);
            assert_eq!(*mask.excluded.at_2d::<u8>(119, 80)?, 255);
            // edge pixels stay allowed for the per-frame pass
            assert_eq!(*mask.allowed.at_2d::<u8>(0, 0)?, 255);
        }
        assert_eq!(*state.exclusion().at_2d::<u8>(5, 80)?, 255);
        Ok(())
    }

    #[test]
    fn test_disabled_channels_exclude_only_border() -> Result<()> {
        let state = SequenceState::build(&reference_with_patch()?, &bright_config())?;
        let chroma = state.channel(1).expect("chroma channel");
        let border = MaskOps::border(state.size(), 10)?;

        let mut diff = Mat::default();
        core::bitwise_xor(&chroma.excluded, &border, &mut diff, &core::no_array())?;
        assert_eq!(core::count_non_zero(&diff)?, 0);
        Ok(())
    }

    #[test]
    fn test_rebuild_is_idempotent() -> Result<()> {
        let reference = reference_with_patch()?;
        let first = SequenceState::build(&reference, &bright_config())?;
        let second = SequenceState::build(&reference, &bright_config())?;

        let mut diff = Mat::default();
        core::bitwise_xor(first.exclusion(), second.exclusion(), &mut diff, &core::no_array())?;
        assert_eq!(core::count_non_zero(&diff)?, 0);
        Ok(())
    }

    #[test]
    fn test_rejects_empty_and_tiny_masks() -> Result<()> {
        let err = SequenceState::build(&Mat::default(), &bright_config()).unwrap_err();
        assert_eq!(err.downcast_ref::<PipelineError>(), Some(&PipelineError::EmptyMask));

        let tiny = Mat::new_rows_cols_with_default(15, 60, CV_8UC3, Scalar::all(0.0))?;
        let err = SequenceState::build(&tiny, &bright_config()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::FrameTooSmall { margin: 10, .. })
        ));
        Ok(())
    }
}
