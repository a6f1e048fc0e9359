//! Per-sequence result accumulation and the final position table

pub mod table;

pub use table::ResultTable;

use crate::geometry::Position;
use crate::tracking::Observation;
use serde::Serialize;
use std::time::Instant;

/// Outcome of one frame of one sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub observation: Observation,
}

impl FrameRecord {
    pub fn position(&self) -> Position {
        self.observation.position_or_sentinel()
    }

    pub fn detected(&self) -> bool {
        self.observation.is_found()
    }
}

/// All frame outcomes of one finished (or aborted) sequence
#[derive(Debug, Clone, Serialize)]
pub struct SequenceResult {
    pub sequence_index: usize,
    pub name: String,
    pub frames: Vec<FrameRecord>,
    pub aborted: bool,
    pub elapsed_ms: u64,
}

impl SequenceResult {
    pub fn detected_count(&self) -> usize {
        self.frames.iter().filter(|frame| frame.detected()).count()
    }

    pub fn summary(&self) -> SequenceSummary {
        let frames_processed = self.frames.len();
        let frames_detected = self.detected_count();
        SequenceSummary {
            sequence_index: self.sequence_index,
            name: self.name.clone(),
            frames_processed,
            frames_detected,
            detection_rate: if frames_processed == 0 {
                0.0
            } else {
                frames_detected as f64 / frames_processed as f64
            },
            aborted: self.aborted,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Compact statistics of one sequence, exported as JSON by the binary
#[derive(Debug, Clone, Serialize)]
pub struct SequenceSummary {
    pub sequence_index: usize,
    pub name: String,
    pub frames_processed: usize,
    pub frames_detected: usize,
    pub detection_rate: f64,
    pub aborted: bool,
    pub elapsed_ms: u64,
}

/// Collects frame outcomes while a sequence is being processed
#[derive(Debug)]
pub struct SequenceRecorder {
    sequence_index: usize,
    name: String,
    frames: Vec<FrameRecord>,
    started: Instant,
}

impl SequenceRecorder {
    pub fn new(sequence_index: usize, name: impl Into<String>) -> Self {
        Self {
            sequence_index,
            name: name.into(),
            frames: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, observation: Observation) {
        let frame_index = self.frames.len();
        self.frames.push(FrameRecord {
            frame_index,
            observation,
        });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Close the sequence and hand its frames over
    pub fn finish(self, aborted: bool) -> SequenceResult {
        SequenceResult {
            sequence_index: self.sequence_index,
            name: self.name,
            frames: self.frames,
            aborted,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
