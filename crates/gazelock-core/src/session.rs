//! Authentication session: the frame loop that feeds live gestures into a
//! pattern matcher until the pattern completes, the operator cancels, or the
//! frame source runs dry.
//!
//! # Loop contract
//!
//! Each iteration, in order:
//!
//! 1. Pull one frame. End of stream or a read failure ends the session with a
//!    rejection; nothing is retried.
//! 2. Detect landmarks, classify the frame, and advance the matcher. A frame
//!    without a face yields `GestureSymbol::None`, which the matcher ignores.
//! 3. If the pattern is complete, accept.
//! 4. Sample the cancellation signal once; if raised, reject.
//! 5. Sleep for the pacing interval, so that a held gesture is sampled at a
//!    fixed rate rather than at the camera's frame rate.
//!
//! There is no attempt limit or timeout beyond cancellation.
//!
//! All per-user state (blink hysteresis and pattern progress) lives in the
//! [`AuthSession`] value, which [`AuthSession::run`] consumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::classifier::{FrameReading, GestureClassifier};
use crate::config::{ConfigError, SessionConfig};
use crate::landmarks::{LandmarkError, LandmarkSnapshot};
use crate::pattern::{EnrolledPattern, MatchProgress, PatternError, PatternMatcher};
use crate::store::{PatternStore, StoreError};
use crate::symbol::GestureSymbol;

#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("frame source unreadable: {0}")]
    Unreadable(String),
    #[error("frame source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("landmark detector failed: {0}")]
    Failed(String),
    #[error("malformed landmarks: {0}")]
    Landmarks(#[from] LandmarkError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid session config: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid enrolled pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pixel size of a captured frame.
pub trait FrameDimensions {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Blocking supplier of camera frames. `Ok(None)` marks end of stream.
pub trait FrameSource {
    type Frame: FrameDimensions;

    fn next_frame(&mut self) -> Result<Option<Self::Frame>, FrameSourceError>;
}

/// Face-mesh detector. `Ok(None)` means no face in the frame.
pub trait LandmarkDetector<F> {
    fn detect(&mut self, frame: &F) -> Result<Option<LandmarkSnapshot>, DetectorError>;
}

/// Non-blocking abort flag, polled once per loop iteration.
pub trait CancellationSignal {
    fn is_cancelled(&self) -> bool;
}

impl CancellationSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: CancellationSignal + ?Sized> CancellationSignal for Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<T: CancellationSignal + ?Sized> CancellationSignal for &T {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// A signal that is never raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    Cancelled,
    EndOfStream,
    SourceFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

/// One processed frame, as kept in the optional trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameTrace {
    /// Zero-based frame index within the session.
    pub frame: u64,
    pub symbol: GestureSymbol,
    /// Matcher step after this frame.
    pub step: usize,
}

/// Result of one processed frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    /// Zero-based frame index within the session.
    pub frame: u64,
    pub reading: FrameReading,
    pub progress: MatchProgress,
    /// Matcher step after this frame.
    pub step: usize,
}

/// What the caller learns when a session ends.
///
/// Matcher progress is not part of the outcome. It only appears in `trace`,
/// which stays empty unless `SessionConfig::record_trace` is set.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub verdict: Verdict,
    /// Frames pulled from the source and run through the pipeline.
    pub frames_processed: u64,
    /// Per-frame diagnostics, recorded only on request.
    pub trace: Vec<FrameTrace>,
}

impl AuthOutcome {
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

/// State for one user's authentication attempt.
#[derive(Debug)]
pub struct AuthSession {
    classifier: GestureClassifier,
    matcher: PatternMatcher,
    pacing: Duration,
    record_trace: bool,
    frames: u64,
    trace: Vec<FrameTrace>,
}

impl AuthSession {
    pub fn new(pattern: EnrolledPattern, config: &SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        if pattern.len() != config.pattern_len {
            return Err(PatternError::WrongLength {
                expected: config.pattern_len,
                actual: pattern.len(),
            }
            .into());
        }

        Ok(Self {
            classifier: GestureClassifier::new(config),
            matcher: PatternMatcher::new(pattern),
            pacing: config.pacing(),
            record_trace: config.record_trace,
            frames: 0,
            trace: Vec::new(),
        })
    }

    pub fn step(&self) -> usize {
        self.matcher.step()
    }

    pub fn is_complete(&self) -> bool {
        self.matcher.is_complete()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Run one frame's landmarks through classification and matching.
    pub fn process_snapshot(
        &mut self,
        snapshot: Option<&LandmarkSnapshot>,
        width: u32,
        height: u32,
    ) -> FrameReport {
        let frame = self.frames;
        self.frames += 1;

        let reading = self.classifier.classify(snapshot, width, height);
        let progress = self.matcher.advance(reading.symbol);
        let step = self.matcher.step();

        tracing::debug!(frame, symbol = %reading.symbol, ?progress, step, "frame processed");

        if self.record_trace {
            self.trace.push(FrameTrace {
                frame,
                symbol: reading.symbol,
                step,
            });
        }

        FrameReport {
            frame,
            reading,
            progress,
            step,
        }
    }

    fn finish(self, verdict: Verdict) -> AuthOutcome {
        tracing::debug!(step = self.matcher.step(), "matcher state at session end");
        tracing::info!(?verdict, frames = self.frames, "session finished");
        AuthOutcome {
            verdict,
            frames_processed: self.frames,
            trace: self.trace,
        }
    }

    /// Drive the frame loop to a verdict.
    pub fn run<S, D, C>(mut self, source: &mut S, detector: &mut D, cancel: &C) -> AuthOutcome
    where
        S: FrameSource,
        D: LandmarkDetector<S::Frame>,
        C: CancellationSignal + ?Sized,
    {
        tracing::info!(
            pattern_len = self.matcher.pattern().len(),
            pacing_ms = self.pacing.as_millis() as u64,
            "session started"
        );

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return self.finish(Verdict::Rejected(RejectReason::EndOfStream)),
                Err(e) => {
                    tracing::error!(error = %e, "frame source failed");
                    return self.finish(Verdict::Rejected(RejectReason::SourceFailed(
                        e.to_string(),
                    )));
                }
            };

            let snapshot = match detector.detect(&frame) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, frame = self.frames, "detector failed; treating as no face");
                    None
                }
            };

            self.process_snapshot(snapshot.as_ref(), frame.width(), frame.height());

            if self.matcher.is_complete() {
                return self.finish(Verdict::Accepted);
            }
            if cancel.is_cancelled() {
                return self.finish(Verdict::Rejected(RejectReason::Cancelled));
            }
            if !self.pacing.is_zero() {
                std::thread::sleep(self.pacing);
            }
        }
    }
}

/// Look up `user`'s pattern, validate it, and run a session.
///
/// A malformed enrollment is reported as an error before the frame source is
/// touched.
pub fn authenticate<P, S, D, C>(
    user: &str,
    store: &P,
    source: &mut S,
    detector: &mut D,
    cancel: &C,
    config: &SessionConfig,
) -> Result<AuthOutcome, SessionError>
where
    P: PatternStore + ?Sized,
    S: FrameSource,
    D: LandmarkDetector<S::Frame>,
    C: CancellationSignal + ?Sized,
{
    config.validate()?;
    let tokens = store.enrolled_pattern(user)?;
    let pattern = EnrolledPattern::parse(tokens.as_slice(), config.pattern_len).map_err(|e| {
        tracing::warn!(user, error = %e, "rejecting malformed enrollment");
        e
    })?;

    tracing::info!(user, "authentication requested");
    let session = AuthSession::new(pattern, config)?;
    Ok(session.run(source, detector, cancel))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::classifier::tests::{face, Lid, HEIGHT, WIDTH};
    use crate::store::MemoryPatternStore;
    use crate::symbol::GestureSymbol::{Blink, Center, Left, Right};

    #[test]
    fn wide_lid_after_mesh_baseline_is_a_blink_step() {
        let mut s = session([Blink, Left, Left, Left]);
        let resting = face(0.5, Lid::Mesh);
        let wide = face(0.5, Lid::Wide);
        // Gaze is still read while the detector sits below `close`.
        let first = s.process_snapshot(Some(&resting), WIDTH, HEIGHT);
        assert_eq!(first.reading.symbol, Center);
        assert_eq!(first.progress, MatchProgress::Reset);
        let report = s.process_snapshot(Some(&wide), WIDTH, HEIGHT);
        assert_eq!(report.reading.symbol, Blink);
        assert_eq!(report.progress, MatchProgress::Advanced { step: 1 });
        assert_eq!(s.step(), 1);
        assert_eq!(s.frames_processed(), 2);
    }

    /// What the scripted camera shows in one frame.
    #[derive(Clone, Copy)]
    enum Shot {
        /// Relaxed eye on the face-mesh contour, iris at the given relative position.
        Look(f32),
        /// Lid contour above `close`, iris centred.
        Flick,
        Away,
    }

    const LEFT: Shot = Shot::Look(0.2);
    const CENTER: Shot = Shot::Look(0.5);
    const RIGHT: Shot = Shot::Look(0.8);

    struct TestFrame(Shot);

    impl FrameDimensions for TestFrame {
        fn width(&self) -> u32 {
            WIDTH
        }
        fn height(&self) -> u32 {
            HEIGHT
        }
    }

    struct ScriptedSource {
        shots: VecDeque<Shot>,
        fail_at_end: bool,
        pulled: usize,
    }

    impl ScriptedSource {
        fn new(shots: &[Shot]) -> Self {
            Self {
                shots: shots.iter().copied().collect(),
                fail_at_end: false,
                pulled: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        type Frame = TestFrame;

        fn next_frame(&mut self) -> Result<Option<TestFrame>, FrameSourceError> {
            self.pulled += 1;
            match self.shots.pop_front() {
                Some(shot) => Ok(Some(TestFrame(shot))),
                None if self.fail_at_end => {
                    Err(FrameSourceError::Unreadable("camera unplugged".into()))
                }
                None => Ok(None),
            }
        }
    }

    struct ScriptedDetector;

    impl LandmarkDetector<TestFrame> for ScriptedDetector {
        fn detect(
            &mut self,
            frame: &TestFrame,
        ) -> Result<Option<LandmarkSnapshot>, DetectorError> {
            Ok(match frame.0 {
                Shot::Look(relative) => Some(face(relative, Lid::Mesh)),
                Shot::Flick => Some(face(0.5, Lid::Wide)),
                Shot::Away => None,
            })
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            pacing_ms: 0,
            record_trace: true,
            ..SessionConfig::default()
        }
    }

    fn session(pattern: [GestureSymbol; 4]) -> AuthSession {
        AuthSession::new(EnrolledPattern::new(pattern.to_vec(), 4).unwrap(), &config()).unwrap()
    }

    fn run(pattern: [GestureSymbol; 4], shots: &[Shot]) -> AuthOutcome {
        let mut source = ScriptedSource::new(shots);
        session(pattern).run(&mut source, &mut ScriptedDetector, &NeverCancel)
    }

    #[test]
    fn accepts_exact_pattern() {
        let outcome = run(
            [Left, Center, Right, Blink],
            &[LEFT, CENTER, RIGHT, Shot::Flick],
        );
        assert!(outcome.is_accepted());
        assert_eq!(outcome.frames_processed, 4);
        let symbols: Vec<GestureSymbol> = outcome.trace.iter().map(|t| t.symbol).collect();
        assert_eq!(symbols, vec![Left, Center, Right, Blink]);
        let steps: Vec<usize> = outcome.trace.iter().map(|t| t.step).collect();
        assert_eq!(steps, vec![1, 2, 3, 4]);
    }

    #[test]
    fn accepts_on_face_mesh_contour_with_gaps() {
        let outcome = run(
            [Right, Left, Blink, Center],
            &[RIGHT, Shot::Away, LEFT, Shot::Flick, Shot::Away, CENTER],
        );
        assert!(outcome.is_accepted());
        let steps: Vec<usize> = outcome.trace.iter().map(|t| t.step).collect();
        assert_eq!(steps, vec![1, 1, 2, 3, 3, 4]);
    }

    #[test]
    fn no_face_frames_do_not_disturb_progress() {
        let outcome = run(
            [Left, Center, Right, Center],
            &[LEFT, CENTER, Shot::Away, RIGHT, Shot::Away, Shot::Away, CENTER],
        );
        assert!(outcome.is_accepted());
        let steps: Vec<usize> = outcome.trace.iter().map(|t| t.step).collect();
        assert_eq!(steps, vec![1, 2, 2, 3, 3, 3, 4]);
    }

    #[test]
    fn stops_at_first_completion() {
        let mut source = ScriptedSource::new(&[RIGHT, RIGHT, RIGHT, RIGHT, LEFT, LEFT]);
        let outcome = session([Right, Right, Right, Right]).run(
            &mut source,
            &mut ScriptedDetector,
            &NeverCancel,
        );
        assert!(outcome.is_accepted());
        assert_eq!(source.shots.len(), 2);
    }

    #[test]
    fn end_of_stream_rejects() {
        let outcome = run([Left, Center, Right, Blink], &[LEFT, CENTER]);
        assert_eq!(outcome.verdict, Verdict::Rejected(RejectReason::EndOfStream));
        assert_eq!(outcome.frames_processed, 2);
    }

    #[test]
    fn source_failure_rejects_without_retry() {
        let mut source = ScriptedSource::new(&[LEFT]);
        source.fail_at_end = true;
        let outcome = session([Left, Center, Right, Blink]).run(
            &mut source,
            &mut ScriptedDetector,
            &NeverCancel,
        );
        assert!(matches!(
            outcome.verdict,
            Verdict::Rejected(RejectReason::SourceFailed(_))
        ));
        assert_eq!(source.pulled, 2);
    }

    /// Raises the cancel flag after a given number of frames have been pulled.
    struct CancellingSource {
        inner: ScriptedSource,
        cancel_after: usize,
        flag: Arc<AtomicBool>,
    }

    impl FrameSource for CancellingSource {
        type Frame = TestFrame;

        fn next_frame(&mut self) -> Result<Option<TestFrame>, FrameSourceError> {
            let frame = self.inner.next_frame();
            if self.inner.pulled >= self.cancel_after {
                self.flag.store(true, Ordering::Relaxed);
            }
            frame
        }
    }

    #[test]
    fn cancellation_mid_pattern_rejects() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut source = CancellingSource {
            inner: ScriptedSource::new(&[LEFT, CENTER, RIGHT, Shot::Flick]),
            cancel_after: 2,
            flag: Arc::clone(&flag),
        };
        let cfg = SessionConfig {
            record_trace: false,
            ..config()
        };
        let pattern = EnrolledPattern::new(vec![Left, Center, Right, Blink], 4).unwrap();
        let outcome = AuthSession::new(pattern, &cfg)
            .unwrap()
            .run(&mut source, &mut ScriptedDetector, &flag);
        assert_eq!(outcome.verdict, Verdict::Rejected(RejectReason::Cancelled));
        assert!(!outcome.is_accepted());
        // The second frame is fully processed before the flag is honoured.
        assert_eq!(outcome.frames_processed, 2);

        // Two steps were matched, but nothing in the outcome says so.
        assert!(outcome.trace.is_empty());
        let json = serde_json::to_value(&outcome).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["frames_processed", "trace", "verdict"]);
        assert_eq!(json["trace"], serde_json::json!([]));
    }

    #[test]
    fn completion_wins_over_cancellation_on_same_frame() {
        let flag = AtomicBool::new(true);
        let mut source = ScriptedSource::new(&[CENTER]);
        let pattern = EnrolledPattern::new(vec![Center], 1).unwrap();
        let cfg = SessionConfig {
            pattern_len: 1,
            ..config()
        };
        let outcome = AuthSession::new(pattern, &cfg)
            .unwrap()
            .run(&mut source, &mut ScriptedDetector, &flag);
        assert!(outcome.is_accepted());
    }

    struct FailingDetector;

    impl LandmarkDetector<TestFrame> for FailingDetector {
        fn detect(&mut self, _: &TestFrame) -> Result<Option<LandmarkSnapshot>, DetectorError> {
            Err(DetectorError::Failed("model not loaded".into()))
        }
    }

    #[test]
    fn detector_errors_read_as_no_face() {
        let mut source = ScriptedSource::new(&[LEFT, CENTER, RIGHT]);
        let outcome = session([Left, Center, Right, Blink]).run(
            &mut source,
            &mut FailingDetector,
            &NeverCancel,
        );
        assert_eq!(outcome.verdict, Verdict::Rejected(RejectReason::EndOfStream));
        assert!(outcome.trace.iter().all(|t| t.symbol == GestureSymbol::None));
    }

    #[test]
    fn trace_is_opt_in() {
        let mut cfg = config();
        cfg.record_trace = false;
        let pattern = EnrolledPattern::new(vec![Left, Center, Right, Blink], 4).unwrap();
        let mut source = ScriptedSource::new(&[LEFT]);
        let outcome = AuthSession::new(pattern, &cfg)
            .unwrap()
            .run(&mut source, &mut ScriptedDetector, &NeverCancel);
        assert!(outcome.trace.is_empty());
        assert_eq!(outcome.frames_processed, 1);
    }

    #[test]
    fn session_rejects_pattern_of_other_length() {
        let pattern = EnrolledPattern::new(vec![Left, Right], 2).unwrap();
        let err = AuthSession::new(pattern, &config()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Pattern(PatternError::WrongLength {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn authenticate_accepts_enrolled_user() {
        let mut store = MemoryPatternStore::new();
        store.insert("alice", ["left", "center", "right", "blink"]);
        let mut source = ScriptedSource::new(&[LEFT, CENTER, RIGHT, Shot::Away, Shot::Flick]);
        let outcome = authenticate(
            "alice",
            &store,
            &mut source,
            &mut ScriptedDetector,
            &NeverCancel,
            &config(),
        )
        .unwrap();
        assert!(outcome.is_accepted());
    }

    #[test]
    fn authenticate_rejects_malformed_enrollment_before_reading_frames() {
        let mut store = MemoryPatternStore::new();
        store.insert("bob", ["left", "sideways", "center", "blink"]);
        store.insert("carol", ["left", "right"]);
        for user in ["bob", "carol"] {
            let mut source = ScriptedSource::new(&[LEFT]);
            let err = authenticate(
                user,
                &store,
                &mut source,
                &mut ScriptedDetector,
                &NeverCancel,
                &config(),
            )
            .unwrap_err();
            assert!(matches!(err, SessionError::Pattern(_)));
            assert_eq!(source.pulled, 0);
        }
    }

    #[test]
    fn authenticate_unknown_user() {
        let store = MemoryPatternStore::new();
        let mut source = ScriptedSource::new(&[]);
        let err = authenticate(
            "dave",
            &store,
            &mut source,
            &mut ScriptedDetector,
            &NeverCancel,
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::UnknownUser(_))));
    }

    #[test]
    fn verdict_serializes_with_reason() {
        let json = serde_json::to_value(Verdict::Rejected(RejectReason::Cancelled)).unwrap();
        assert_eq!(json["verdict"], "rejected");
        assert_eq!(json["reason"], "cancelled");
    }
}
