//! Positions and search windows in frame pixel coordinates

use serde::{Deserialize, Serialize};

/// A 2-D position in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Position written to result tables for frames without a detection
    pub const SENTINEL: Position = Position { x: -1.0, y: -1.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Euclidean distance to the coordinate origin
    pub fn norm(&self) -> f64 {
        self.distance(&Position::default())
    }
}

/// Fixed frame resolution of one sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Window covering the whole frame
    pub fn full_window(&self) -> Window {
        Window::new(0.0, 0.0, self.width as f64, self.height as f64)
    }
}

/// Axis-aligned search window, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Window {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Window {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Half-open containment test: left/top edges inclusive, right/bottom exclusive
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when the window lies fully inside `resolution`
    pub fn fits_within(&self, resolution: &Resolution) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= resolution.width as f64
            && self.bottom() <= resolution.height as f64
    }
}
