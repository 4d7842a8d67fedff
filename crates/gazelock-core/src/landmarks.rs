//! Face-mesh landmark snapshots and the fixed topology indices the engine reads.
//!
//! Snapshots come from an external 478-point face-mesh detector with refined
//! iris landmarks. Coordinates are normalized to `[0, 1]` relative to the
//! frame, though a face partially outside the frame can produce values beyond
//! that range.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point;

/// Number of points in a refined face-mesh snapshot.
pub const LANDMARK_COUNT: usize = 478;

/// Left iris ring (centre plus four rim points).
pub const LEFT_IRIS: [usize; 5] = [468, 469, 470, 471, 472];
/// Right iris ring (centre plus four rim points).
pub const RIGHT_IRIS: [usize; 5] = [473, 474, 475, 476, 477];

/// Left eyelid contour, ordered p1..p8. EAR uses the first six.
pub const LEFT_EYELID: [usize; 8] = [33, 246, 161, 160, 159, 158, 157, 173];
/// Right eyelid contour, ordered p1..p8. EAR uses the first six.
pub const RIGHT_EYELID: [usize; 8] = [263, 466, 388, 387, 386, 385, 384, 398];

/// Horizontal anchors `(start, end)` the left iris is measured between.
pub const LEFT_EYE_CORNERS: (usize, usize) = (130, 244);
/// Horizontal anchors `(start, end)` the right iris is measured between.
pub const RIGHT_EYE_CORNERS: (usize, usize) = (463, 359);

/// The landmark indices that describe one eye.
#[derive(Debug, Clone, Copy)]
pub struct EyeTopology {
    pub iris: [usize; 5],
    pub eyelid: [usize; 8],
    pub corners: (usize, usize),
}

pub const LEFT_EYE: EyeTopology = EyeTopology {
    iris: LEFT_IRIS,
    eyelid: LEFT_EYELID,
    corners: LEFT_EYE_CORNERS,
};

pub const RIGHT_EYE: EyeTopology = EyeTopology {
    iris: RIGHT_IRIS,
    eyelid: RIGHT_EYELID,
    corners: RIGHT_EYE_CORNERS,
};

#[derive(Error, Debug, PartialEq)]
pub enum LandmarkError {
    #[error("expected 478 landmarks, got {0}")]
    WrongPointCount(usize),
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// One normalized 3D landmark.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// All landmarks for one face in one frame.
#[derive(Debug, Clone)]
pub struct LandmarkSnapshot {
    points: Vec<NormalizedLandmark>,
}

impl LandmarkSnapshot {
    pub fn new(points: Vec<NormalizedLandmark>) -> Result<Self, LandmarkError> {
        if points.len() != LANDMARK_COUNT {
            return Err(LandmarkError::WrongPointCount(points.len()));
        }
        if let Some(index) = points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(LandmarkError::NonFinite { index });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[NormalizedLandmark] {
        &self.points
    }

    /// Normalized `(x, y)` of a landmark, as used for EAR.
    pub fn normalized(&self, index: usize) -> Point {
        let p = self.points[index];
        Point::new(p.x, p.y)
    }

    /// Pixel position of a landmark.
    ///
    /// Truncates toward zero and clamps into `[0, dimension - 1]` so that
    /// landmarks projected outside the frame still land on a valid pixel.
    pub fn to_pixel(&self, index: usize, width: u32, height: u32) -> Point {
        let p = self.points[index];
        Point::new(
            scale_and_clamp(p.x, width),
            scale_and_clamp(p.y, height),
        )
    }
}

fn scale_and_clamp(normalized: f32, dimension: u32) -> f32 {
    let max = dimension.saturating_sub(1) as f32;
    (normalized * dimension as f32).trunc().clamp(0.0, max)
}
