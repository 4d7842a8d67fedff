//! Session tuning: pacing, pattern length, and the gaze and blink thresholds.
//!
//! Every field has a default, so a partial TOML table is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blink::BlinkThresholds;
use crate::gaze::GazeThresholds;

/// Default number of symbols in an enrolled pattern.
pub const DEFAULT_PATTERN_LEN: usize = 4;
/// Default delay between processed frames.
pub const DEFAULT_PACING_MS: u64 = 800;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error(
        "invalid gaze thresholds: left_below={left_below}, right_above={right_above}, min_span_px={min_span_px}"
    )]
    GazeThresholds {
        left_below: f32,
        right_above: f32,
        min_span_px: f32,
    },
    #[error("invalid blink thresholds: close={close} must be finite and above open={open}")]
    BlinkThresholds { close: f32, open: f32 },
    #[error("pattern length must be at least 1")]
    ZeroPatternLength,
}

/// Tuning for one authentication session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay after each processed frame, in milliseconds.
    pub pacing_ms: u64,
    /// Symbols an enrolled pattern must have.
    pub pattern_len: usize,
    /// Cut points for left/center/right.
    pub gaze: GazeThresholds,
    /// EAR hysteresis band.
    pub blink: BlinkThresholds,
    /// Keep a per-frame symbol trace in the outcome.
    pub record_trace: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pacing_ms: DEFAULT_PACING_MS,
            pattern_len: DEFAULT_PATTERN_LEN,
            gaze: GazeThresholds::default(),
            blink: BlinkThresholds::default(),
            record_trace: false,
        }
    }
}

impl SessionConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern_len == 0 {
            return Err(ConfigError::ZeroPatternLength);
        }
        self.gaze.validate()?;
        self.blink.validate()
    }
}
