//! Recorded landmark traces: one JSON object per line, as written by an
//! external face-mesh detector.
//!
//! ```text
//! {"width": 640, "height": 480, "landmarks": [{"x": 0.41, "y": 0.37, "z": -0.02}, ...]}
//! {"width": 640, "height": 480, "landmarks": null}
//! ```
//!
//! `landmarks: null` (or a missing field) records a frame with no face.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use gazelock_core::{
    DetectorError, FrameDimensions, FrameSource, FrameSourceError, LandmarkDetector,
    LandmarkSnapshot, NormalizedLandmark,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TraceFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub landmarks: Option<Vec<NormalizedLandmark>>,
}

impl FrameDimensions for TraceFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Reads trace frames lazily, one line per `next_frame` call.
pub struct TraceSource<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> TraceSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

/// Open a trace file, or stdin for `-`.
pub fn open(path: &Path) -> Result<TraceSource<Box<dyn BufRead + Send>>> {
    let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(path)
            .with_context(|| format!("failed to open trace {}", path.display()))?;
        Box::new(BufReader::new(file))
    };
    Ok(TraceSource::new(reader))
}

impl<R: BufRead> FrameSource for TraceSource<R> {
    type Frame = TraceFrame;

    fn next_frame(&mut self) -> Result<Option<TraceFrame>, FrameSourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text)
                .map(Some)
                .map_err(|e| FrameSourceError::Unreadable(format!("line {}: {e}", self.line)));
        }
    }
}

/// Hands out the landmarks stored alongside each trace frame.
pub struct RecordedLandmarks;

impl LandmarkDetector<TraceFrame> for RecordedLandmarks {
    fn detect(&mut self, frame: &TraceFrame) -> Result<Option<LandmarkSnapshot>, DetectorError> {
        match &frame.landmarks {
            Some(points) => Ok(Some(LandmarkSnapshot::new(points.clone())?)),
            None => Ok(None),
        }
    }
}
