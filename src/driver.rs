//! Sequence driver: runs the detection pipeline and the tracker frame by frame

use crate::config::{FrameFormat, RunConfig};
use crate::Result;
use anyhow::{bail, Context};
use marker_core::{
    Observation, PositionTracker, Resolution, ResultTable, SequenceInput, SequenceList,
    SequenceRecorder, SequenceResult, TrackerConfig,
};
use marker_cv::{
    traits::FrameSource, CandidateDetector, PipelineError, Selection, SequenceState,
};
use opencv::core::Mat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Default)]
struct AbortFlags {
    skip: AtomicBool,
    stop: AtomicBool,
}

/// Cooperative cancellation, checked between frames.
///
/// Clones share the same flags, so a handle can be moved to another thread.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flags: Arc<AbortFlags>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// End the current sequence and continue with the next one
    pub fn skip_sequence(&self) {
        self.flags.skip.store(true, Ordering::SeqCst);
    }

    /// End the current sequence and the whole batch
    pub fn stop(&self) {
        self.flags.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stop.load(Ordering::SeqCst)
    }

    /// Consume a pending skip request
    fn take_skip(&self) -> bool {
        self.flags.skip.swap(false, Ordering::SeqCst)
    }
}

/// Outcome of one frame inside the tracking loop
struct FrameOutcome {
    observation: Observation,
    attempts: u32,
}

/// Drives one or more sequences through detection and tracking
pub struct SequenceDriver {
    detector: CandidateDetector,
    tracker_config: TrackerConfig,
    frame_count: usize,
    abort: AbortHandle,
}

impl SequenceDriver {
    /// `frame_count` is the number of result rows recorded per sequence
    pub fn new(config: RunConfig, frame_count: usize) -> Self {
        Self {
            detector: CandidateDetector::new(config.detector),
            tracker_config: config.tracker,
            frame_count,
            abort: AbortHandle::new(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Check every mask and sequence file of `list` without tracking anything.
    ///
    /// Masks must load at `format`'s resolution and be large enough for the
    /// static masks; sequence files must hold at least one complete frame.
    pub fn preflight(&self, list: &SequenceList, format: FrameFormat) -> Result<()> {
        for input in list.iter() {
            self.check_input(input, format)
                .with_context(|| format!("Sequence {} is not usable", input.index))?;
        }
        debug!(sequences = list.len(), "all sequence inputs validated");
        Ok(())
    }

    fn check_input(&self, input: &SequenceInput, format: FrameFormat) -> Result<()> {
        let reference = format.load_mask(&input.mask)?;
        self.detector.prepare_sequence(&reference)?;

        let frames = format.open(&input.frames)?;
        if frames.frame_count() == 0 {
            bail!("{:?} holds no complete {}x{} frame", input.frames, format.width, format.height);
        }
        Ok(())
    }

    /// Process every sequence of `list`, reading raw YUV files laid out as `format`.
    ///
    /// All inputs are validated up front, so a bad mask or sequence file fails
    /// the batch before the first frame is tracked.
    pub fn run_batch(&self, list: &SequenceList, format: FrameFormat) -> Result<ResultTable> {
        let mut table = ResultTable::new(self.frame_count);
        if self.abort.is_stopped() {
            info!("Run stopped before the first sequence");
            return Ok(table);
        }
        self.preflight(list, format)?;

        for input in list.iter() {
            if self.abort.is_stopped() {
                info!("Run stopped before sequence {}", input.index);
                break;
            }

            info!("Sequence {}: {:?} (mask {:?})", input.index, input.frames, input.mask);
            let reference = format
                .load_mask(&input.mask)
                .with_context(|| format!("Failed to load mask of sequence {}", input.index))?;
            let mut frames = format.open(&input.frames)?;

            let result = self.run_sequence(input.index, input.name(), &reference, &mut frames)?;
            table.push(result);
        }

        Ok(table)
    }

    /// Track the marker through one sequence.
    ///
    /// The first frame only serves as the differencing reference. The next
    /// `initial_frames - 1` frames are searched over the whole frame to seed
    /// the tracker; every later frame is searched in windows of growing
    /// scale around the prediction. A frame that exhausts all scales makes
    /// the following frame search the whole frame again.
    pub fn run_sequence<S: FrameSource>(
        &self,
        sequence_index: usize,
        name: impl Into<String>,
        reference: &Mat,
        frames: &mut S,
    ) -> Result<SequenceResult> {
        let mut recorder = SequenceRecorder::new(sequence_index, name);
        let sequence = self.detector.prepare_sequence(reference)?;

        let size = sequence.size();
        if frames.frame_size() != size {
            return Err(PipelineError::ResolutionMismatch {
                expected_width: size.width,
                expected_height: size.height,
                actual_width: frames.frame_size().width,
                actual_height: frames.frame_size().height,
            }
            .into());
        }

        let resolution = Resolution::new(size.width as u32, size.height as u32);
        let full_frame = resolution.full_window();
        let mut tracker = PositionTracker::new(resolution, self.tracker_config.clone());

        let Some(mut previous) = frames.next_frame()? else {
            warn!("Sequence {} has no frames", sequence_index);
            return Ok(recorder.finish(false));
        };

        let mut aborted = false;
        let mut seeds = Vec::new();
        let seed_frames = self.tracker_config.initial_frames.saturating_sub(1);
        while seeds.len() < seed_frames && recorder.len() < self.frame_count {
            if self.abort_requested() {
                aborted = true;
                break;
            }
            let Some(current) = frames.next_frame()? else {
                break;
            };

            let frame = self.detector.detect(&sequence, &previous, &current)?;
            let observation = frame.select_best(&full_frame).observation();
            debug!(frame = recorder.len(), ?observation, "seed frame");

            recorder.record(observation);
            seeds.push(observation);
            previous = current;
        }
        tracker.seed(seeds);

        let max_scale = self.tracker_config.max_window_scale.max(1);
        let mut search_full_frame = false;
        while !aborted && recorder.len() < self.frame_count {
            if self.abort_requested() {
                aborted = true;
                break;
            }
            let Some(current) = frames.next_frame()? else {
                break;
            };

            let outcome = self.track_frame(
                &sequence,
                &mut tracker,
                &previous,
                &current,
                search_full_frame,
                max_scale,
            )?;
            search_full_frame = outcome.attempts >= max_scale;

            debug!(
                frame = recorder.len(),
                observation = ?outcome.observation,
                attempts = outcome.attempts,
                "tracked frame"
            );
            tracker.update(outcome.observation);
            recorder.record(outcome.observation);
            previous = current;
        }

        let result = recorder.finish(aborted);
        info!(
            "Sequence {} done: {}/{} frames detected in {} ms{}",
            sequence_index,
            result.detected_count(),
            result.frames.len(),
            result.elapsed_ms,
            if aborted { " (aborted)" } else { "" }
        );
        Ok(result)
    }

    fn track_frame(
        &self,
        sequence: &SequenceState,
        tracker: &mut PositionTracker,
        previous: &Mat,
        current: &Mat,
        search_full_frame: bool,
        max_scale: u32,
    ) -> Result<FrameOutcome> {
        if tracker.has_detections() {
            tracker.predict()?;
        }

        let frame = self.detector.detect(sequence, previous, current)?;

        if search_full_frame {
            let full_frame = tracker.resolution().full_window();
            let selection = frame.select_best(&full_frame);
            trace!(found = selection.is_found(), "full-frame search after exhausted escalation");
            let attempts = if selection.is_found() { 1 } else { max_scale };
            return Ok(FrameOutcome {
                observation: selection.observation(),
                attempts,
            });
        }

        let mut selection = Selection::NotFound;
        let mut attempts = 0;
        for scale in 1..=max_scale {
            attempts = scale;
            let window = tracker.window(scale);
            selection = frame.select_best(&window);
            trace!(scale, ?window, found = selection.is_found(), "window attempt");
            if selection.is_found() {
                break;
            }
        }

        Ok(FrameOutcome {
            observation: selection.observation(),
            attempts,
        })
    }

    fn abort_requested(&self) -> bool {
        if self.abort.is_stopped() {
            return true;
        }
        if self.abort.take_skip() {
            info!("Skipping rest of the sequence");
            return true;
        }
        false
    }
}
