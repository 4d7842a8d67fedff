use serde::Serialize;

use crate::blink::BlinkDetector;
use crate::config::SessionConfig;
use crate::gaze::{GazeDirection, GazeThresholds};
use crate::geometry::{self, FaceGeometry};
use crate::landmarks::LandmarkSnapshot;
use crate::symbol::{self, GestureSymbol};

/// Everything read from one frame on the way to its symbol.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReading {
    /// The resolved gesture fed to the matcher.
    pub symbol: GestureSymbol,
    /// Left eye direction; `None` when no face was found.
    pub left: Option<GazeDirection>,
    /// Right eye direction; `None` when no face was found.
    pub right: Option<GazeDirection>,
    /// This frame reopened the eyes after a closed stretch.
    pub blinked: bool,
    pub geometry: Option<FaceGeometry>,
}

impl FrameReading {
    fn no_face() -> Self {
        Self {
            symbol: GestureSymbol::None,
            left: None,
            right: None,
            blinked: false,
            geometry: None,
        }
    }
}

/// Turns landmark snapshots into gesture symbols, one frame at a time.
///
/// Carries the blink detector's open/closed state between frames, so one
/// classifier must only ever see a single camera stream.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    gaze: GazeThresholds,
    blink: BlinkDetector,
}

impl GestureClassifier {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            gaze: config.gaze,
            blink: BlinkDetector::new(config.blink),
        }
    }

    pub fn eyes_open(&self) -> bool {
        self.blink.is_open()
    }

    pub fn reset(&mut self) {
        self.blink.reset();
    }

    /// Classify one frame.
    ///
    /// No face yields `GestureSymbol::None` and leaves the blink state
    /// untouched. Otherwise both eyes' directions are always read, and a blink
    /// on this frame outranks them.
    pub fn classify(
        &mut self,
        snapshot: Option<&LandmarkSnapshot>,
        width: u32,
        height: u32,
    ) -> FrameReading {
        let Some(snapshot) = snapshot else {
            return FrameReading::no_face();
        };

        let face = geometry::extract(snapshot, width, height);
        let blinked = self.blink.update(face.left.ear, face.right.ear);

        let left = Some(self.gaze.classify_eye(&face.left));
        let right = Some(self.gaze.classify_eye(&face.right));

        FrameReading {
            symbol: symbol::resolve(left, right, blinked),
            left,
            right,
            blinked,
            geometry: Some(face),
        }
    }
}
