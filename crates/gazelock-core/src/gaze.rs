//! Horizontal gaze classification for a single eye.
//!
//! The iris position is expressed as a fraction of the distance between two
//! eye-corner anchors. The left/right cut points sit at 0.4 and 0.6 rather
//! than splitting at 0.5, leaving a dead zone that absorbs tracking jitter.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::geometry::{EyeGeometry, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeDirection {
    Left,
    Right,
    Center,
}

impl GazeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeThresholds {
    /// Relative positions strictly below this are `Left`.
    pub left_below: f32,
    /// Relative positions strictly above this are `Right`.
    pub right_above: f32,
    /// Corner spans narrower than this (pixels) always read as `Center`.
    pub min_span_px: f32,
}

impl Default for GazeThresholds {
    fn default() -> Self {
        Self {
            left_below: 0.4,
            right_above: 0.6,
            min_span_px: 1.0,
        }
    }
}

impl GazeThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [self.left_below, self.right_above, self.min_span_px]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.left_below > self.right_above || self.min_span_px < 0.0 {
            return Err(ConfigError::GazeThresholds {
                left_below: self.left_below,
                right_above: self.right_above,
                min_span_px: self.min_span_px,
            });
        }
        Ok(())
    }

    /// Fraction of the way from `start` to `end` the iris sits, horizontally.
    ///
    /// Returns `None` when the corners are too close together to measure.
    pub fn relative_position(&self, start: Point, end: Point, iris: Point) -> Option<f32> {
        let span = (end.x - start.x).abs();
        if span < self.min_span_px || span == 0.0 {
            return None;
        }
        Some((iris.x - start.x) / span)
    }

    pub fn classify_relative(&self, relative: f32) -> GazeDirection {
        if relative < self.left_below {
            GazeDirection::Left
        } else if relative > self.right_above {
            GazeDirection::Right
        } else {
            GazeDirection::Center
        }
    }

    /// Classify one eye. Degenerate corner spans fall back to `Center`.
    pub fn classify(&self, start: Point, end: Point, iris: Point) -> GazeDirection {
        match self.relative_position(start, end, iris) {
            Some(relative) => self.classify_relative(relative),
            None => GazeDirection::Center,
        }
    }

    pub fn classify_eye(&self, eye: &EyeGeometry) -> GazeDirection {
        self.classify(eye.corner_start, eye.corner_end, eye.iris.center)
    }
}
