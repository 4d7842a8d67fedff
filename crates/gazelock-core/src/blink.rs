//! Blink detection with separate close and open thresholds.
//!
//! The detector holds a single open/closed flag across frames. A blink is
//! reported on the frame where the eyes reopen, and only then: holding the
//! eyes shut or open never produces a second event.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkThresholds {
    /// Either eye's EAR below this marks the eyes closed.
    pub close: f32,
    /// Either eye's EAR above this (with neither below `close`) marks them open.
    pub open: f32,
}

impl Default for BlinkThresholds {
    fn default() -> Self {
        Self {
            close: 1.6,
            open: 1.3,
        }
    }
}

impl BlinkThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.close.is_finite() && self.open.is_finite()) || self.close <= self.open {
            return Err(ConfigError::BlinkThresholds {
                close: self.close,
                open: self.open,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BlinkDetector {
    thresholds: BlinkThresholds,
    eyes_open: bool,
}

impl BlinkDetector {
    pub fn new(thresholds: BlinkThresholds) -> Self {
        Self {
            thresholds,
            eyes_open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.eyes_open
    }

    pub fn reset(&mut self) {
        self.eyes_open = true;
    }

    /// Feed one frame's EAR readings. Returns `true` if this frame completes a blink.
    pub fn update(&mut self, left_ear: f32, right_ear: f32) -> bool {
        let t = &self.thresholds;
        if left_ear < t.close || right_ear < t.close {
            if self.eyes_open {
                tracing::trace!(left_ear, right_ear, "eyes closed");
            }
            self.eyes_open = false;
            false
        } else if left_ear > t.open || right_ear > t.open {
            let blinked = !self.eyes_open;
            self.eyes_open = true;
            if blinked {
                tracing::debug!(left_ear, right_ear, "blink");
            }
            blinked
        } else {
            false
        }
    }
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(BlinkThresholds::default())
    }
}
