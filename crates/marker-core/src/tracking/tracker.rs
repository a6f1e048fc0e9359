//! Position tracker: history, finite-difference prediction and adaptive search windows

use super::config::{SingleSampleDistance, TrackerConfig};
use super::observation::Observation;
use crate::geometry::{Position, Resolution, Window};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The driver asked for a prediction before seeding any detection
    #[error("predict() called with zero detected positions")]
    NoDetections,
}

/// Tracks one marker through one sequence.
///
/// Keeps two histories: every observation in frame order, and the positions
/// of successful detections only. Prediction and window sizing work on the
/// latter. Create a new tracker (or call [`PositionTracker::reset`]) at every
/// sequence boundary.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    config: TrackerConfig,
    resolution: Resolution,
    predicted: Option<Position>,
    detected: Vec<Position>,
    observations: Vec<Observation>,
}

impl PositionTracker {
    pub fn new(resolution: Resolution, config: TrackerConfig) -> Self {
        Self {
            config,
            resolution,
            predicted: None,
            detected: Vec::new(),
            observations: Vec::new(),
        }
    }

    /// Seed the histories with the observations of the initial frames
    pub fn seed<I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = Observation>,
    {
        for observation in observations {
            self.update(observation);
        }
    }

    /// Drop all history, keeping configuration and resolution
    pub fn reset(&mut self) {
        self.predicted = None;
        self.detected.clear();
        self.observations.clear();
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn has_detections(&self) -> bool {
        !self.detected.is_empty()
    }

    pub fn detected_positions(&self) -> &[Position] {
        &self.detected
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn last_prediction(&self) -> Option<Position> {
        self.predicted
    }

    /// Predict the next position from the last detection plus a weighted
    /// average of the most recent deltas between detections.
    ///
    /// With `k` deltas available (at most `history_len`), the oldest gets
    /// weight 1 and the newest weight `k`; weights are normalized by
    /// `k(k+1)/2`. A single detection predicts itself.
    pub fn predict(&mut self) -> Result<Position, TrackerError> {
        let last = *self.detected.last().ok_or(TrackerError::NoDetections)?;

        let start = self.detected.len().saturating_sub(self.config.history_len + 1);
        let recent = &self.detected[start..];

        let mut delta_x = 0.0;
        let mut delta_y = 0.0;
        let mut total_weight = 0.0;
        for (i, pair) in recent.windows(2).enumerate() {
            let weight = (i + 1) as f64;
            delta_x += weight * (pair[1].x - pair[0].x);
            delta_y += weight * (pair[1].y - pair[0].y);
            total_weight += weight;
        }

        let predicted = if total_weight > 0.0 {
            Position::new(last.x + delta_x / total_weight, last.y + delta_y / total_weight)
        } else {
            last
        };

        self.predicted = Some(predicted);
        Ok(predicted)
    }

    /// Square search window centered on the last prediction.
    ///
    /// The side is `size_factor` times the recent average travel distance,
    /// or the frame width when that is not positive. The window never drops
    /// below `min_window_side` and is shifted (not shrunk) to stay inside
    /// the frame. Without any prediction yet, the whole frame is returned.
    pub fn window(&self, size_factor: u32) -> Window {
        let Some(center) = self.predicted else {
            return self.resolution.full_window();
        };

        let frame_width = self.resolution.width as f64;
        let frame_height = self.resolution.height as f64;

        let mut side = self.average_distance(self.config.history_len) * size_factor as f64;
        if side <= 0.0 {
            side = frame_width;
        }

        let mut width = side.min(frame_width);
        let mut height = side.min(frame_height);

        let min_side = self.config.min_window_side.min(frame_width).min(frame_height);
        if width < min_side || height < min_side {
            width = min_side;
            height = min_side;
        }

        let x = (center.x - width / 2.0).min(frame_width - width).max(0.0);
        let y = (center.y - height / 2.0).min(frame_height - height).max(0.0);

        Window::new(x, y, width, height)
    }

    /// Record the outcome of the current frame
    pub fn update(&mut self, observation: Observation) {
        self.observations.push(observation);
        if let Observation::Found(position) = observation {
            self.detected.push(position);
        }
    }

    /// Mean travel distance over the last `n` detections (clamped to the
    /// number available).
    ///
    /// Sums the distance from the last detection to the current prediction
    /// with the `n - 1` successive distances between those detections, then
    /// divides by `n`.
    pub fn average_distance(&self, n: usize) -> f64 {
        let n = n.min(self.detected.len());
        if n == 0 {
            return 0.0;
        }

        let recent = &self.detected[self.detected.len() - n..];
        let last = recent[n - 1];

        let anchor = match (n, self.config.single_sample_distance) {
            (1, SingleSampleDistance::ToOrigin) => last.norm(),
            _ => self.predicted.map_or(0.0, |predicted| last.distance(&predicted)),
        };

        let travelled: f64 = recent
            .windows(2)
            .map(|pair| pair[0].distance(&pair[1]))
            .sum();

        (anchor + travelled) / n as f64
    }
}
