use crate::geometry::Position;
use serde::{Deserialize, Serialize};

/// Outcome of locating the marker in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    Found(Position),
    NotFound,
}

impl Observation {
    pub fn position(&self) -> Option<Position> {
        match self {
            Observation::Found(position) => Some(*position),
            Observation::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Observation::Found(_))
    }

    /// Position as written to result tables
    pub fn position_or_sentinel(&self) -> Position {
        self.position().unwrap_or(Position::SENTINEL)
    }
}
