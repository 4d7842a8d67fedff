//! gazelock-core: gaze-gesture classification and pattern authentication.
//!
//! A user authenticates by performing a secret sequence of eye gestures
//! (look left, look right, look center, blink) in front of a camera. This
//! crate turns per-frame face-mesh landmarks into one gesture symbol per
//! frame and matches the live symbol stream against the user's enrolled
//! pattern.
//!
//! Frame capture, landmark detection, and pattern storage are external; they
//! plug in through the [`FrameSource`], [`LandmarkDetector`], and
//! [`PatternStore`] traits.

pub mod blink;
pub mod classifier;
pub mod config;
pub mod gaze;
pub mod geometry;
pub mod landmarks;
pub mod pattern;
pub mod session;
pub mod store;
pub mod symbol;

pub use blink::{BlinkDetector, BlinkThresholds};
pub use classifier::{FrameReading, GestureClassifier};
pub use config::{ConfigError, SessionConfig};
pub use gaze::{GazeDirection, GazeThresholds};
pub use geometry::{EyeGeometry, FaceGeometry, Point};
pub use landmarks::{LandmarkError, LandmarkSnapshot, NormalizedLandmark, LANDMARK_COUNT};
pub use pattern::{EnrolledPattern, MatchProgress, PatternError, PatternMatcher};
pub use session::{
    authenticate, AuthOutcome, AuthSession, CancellationSignal, DetectorError, FrameDimensions,
    FrameReport, FrameSource, FrameSourceError, FrameTrace, LandmarkDetector, NeverCancel,
    RejectReason, SessionError, Verdict,
};
pub use store::{MemoryPatternStore, PatternStore, StoreError};
pub use symbol::{GestureSymbol, UnknownSymbol};
