//! Per-eye geometry extracted from a landmark snapshot.
//!
//! For each eye this produces the iris position (centre of the smallest circle
//! enclosing the five iris-ring landmarks, truncated to whole pixels), the two horizontal
//! corner anchors (pixels), and an eye aspect ratio. None of these operations
//! fail: degenerate or collinear inputs give small or extreme values instead.

use serde::Serialize;

use crate::landmarks::{EyeTopology, LandmarkSnapshot, LEFT_EYE, RIGHT_EYE};

/// Slack when testing whether a point lies inside a circle.
const CONTAINS_EPSILON: f32 = 1e-3;
/// Floor for the EAR denominator, so a zero-width eye gives a large finite ratio.
const MIN_EYE_WIDTH: f32 = 1e-6;

/// A 2D point, in pixels or normalized units depending on the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A circle in whatever space its points came from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
}

impl Circle {
    fn around(p: Point) -> Self {
        Self {
            center: p,
            radius: 0.0,
        }
    }

    /// Circle with `a`-`b` as its diameter.
    fn diametral(a: Point, b: Point) -> Self {
        Self {
            center: a.midpoint(b),
            radius: a.distance(b) / 2.0,
        }
    }

    /// Circle through all three points. Collinear triples fall back to the
    /// widest diametral circle, which encloses all three.
    fn circumscribed(a: Point, b: Point, c: Point) -> Self {
        let (bx, by) = (b.x - a.x, b.y - a.y);
        let (cx, cy) = (c.x - a.x, c.y - a.y);
        let d = 2.0 * (bx * cy - by * cx);

        if d.abs() <= f32::EPSILON {
            return [
                Self::diametral(a, b),
                Self::diametral(a, c),
                Self::diametral(b, c),
            ]
            .into_iter()
            .fold(Self::around(a), |widest, candidate| {
                if candidate.radius > widest.radius {
                    candidate
                } else {
                    widest
                }
            });
        }

        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        let center = Point::new(a.x + ux, a.y + uy);
        Self {
            center,
            radius: center.distance(a),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.center.distance(p) <= self.radius + CONTAINS_EPSILON
    }

    /// Snap centre and radius down to whole pixels.
    fn truncated(self) -> Self {
        Self {
            center: Point::new(self.center.x.trunc(), self.center.y.trunc()),
            radius: self.radius.trunc(),
        }
    }
}

/// Smallest circle enclosing every point (incremental Welzl construction).
///
/// An empty slice yields a zero-radius circle at the origin.
pub fn min_enclosing_circle(points: &[Point]) -> Circle {
    let Some(&first) = points.first() else {
        return Circle::default();
    };

    let mut circle = Circle::around(first);
    for i in 1..points.len() {
        if circle.contains(points[i]) {
            continue;
        }
        circle = Circle::around(points[i]);
        for j in 0..i {
            if circle.contains(points[j]) {
                continue;
            }
            circle = Circle::diametral(points[i], points[j]);
            for k in 0..j {
                if !circle.contains(points[k]) {
                    circle = Circle::circumscribed(points[i], points[j], points[k]);
                }
            }
        }
    }
    circle
}

/// Eye aspect ratio over an ordered eyelid contour:
/// `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)`.
///
/// Only the first six contour points take part.
pub fn eye_aspect_ratio(contour: &[Point; 8]) -> f32 {
    let vertical_a = contour[1].distance(contour[5]);
    let vertical_b = contour[2].distance(contour[4]);
    let horizontal = contour[0].distance(contour[3]);
    (vertical_a + vertical_b) / (2.0 * horizontal).max(MIN_EYE_WIDTH)
}

/// Geometry of one eye in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EyeGeometry {
    /// Iris enclosing circle, whole pixels.
    pub iris: Circle,
    /// Eye aspect ratio over the normalized eyelid contour.
    pub ear: f32,
    /// Corner the relative gaze position is measured from, pixels.
    pub corner_start: Point,
    /// Opposite corner, pixels.
    pub corner_end: Point,
}

/// Both eyes, as seen from the camera's left and right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceGeometry {
    pub left: EyeGeometry,
    pub right: EyeGeometry,
}

/// Extract both eyes' geometry for a frame of `width` x `height` pixels.
pub fn extract(snapshot: &LandmarkSnapshot, width: u32, height: u32) -> FaceGeometry {
    FaceGeometry {
        left: extract_eye(snapshot, &LEFT_EYE, width, height),
        right: extract_eye(snapshot, &RIGHT_EYE, width, height),
    }
}

fn extract_eye(
    snapshot: &LandmarkSnapshot,
    eye: &EyeTopology,
    width: u32,
    height: u32,
) -> EyeGeometry {
    let ring = eye.iris.map(|i| snapshot.to_pixel(i, width, height));
    // EAR thresholds are tuned for normalized coordinates.
    let contour = eye.eyelid.map(|i| snapshot.normalized(i));

    EyeGeometry {
        iris: min_enclosing_circle(&ring).truncated(),
        ear: eye_aspect_ratio(&contour),
        corner_start: snapshot.to_pixel(eye.corners.0, width, height),
        corner_end: snapshot.to_pixel(eye.corners.1, width, height),
    }
}
