use std::time::Duration;

use thiserror::Error;

use crate::detection::domain::face_locator::FaceLocator;
use crate::estimation::distance::derive_focal_length;
use crate::session::domain::frame_source::FrameSourceError;
use crate::session::domain::transport::TransportError;
use crate::shared::frame::Frame;

/// Ground-truth measurements and bounds for one calibration run.
#[derive(Clone, Debug)]
pub struct CalibrationConfig {
    /// Distance of the calibration subject from the camera (meters).
    pub known_distance_m: f64,
    /// Physical width of the calibration subject's face (meters).
    pub known_width_m: f64,
    /// Attempts before giving up.
    pub attempt_budget: u32,
    /// Pause after each unsuccessful attempt. Zero is valid.
    pub attempt_delay: Duration,
}

/// Bookkeeping for one calibration run.
///
/// Mutated only while calibration is in progress; frozen once the focal
/// length is set or the budget is exhausted. The focal length is set if
/// and only if calibration succeeded.
#[derive(Clone, Debug)]
pub struct CalibrationState {
    attempts_made: u32,
    attempt_budget: u32,
    focal_length: Option<f64>,
}

impl CalibrationState {
    fn new(attempt_budget: u32) -> Self {
        debug_assert!(attempt_budget > 0);
        Self {
            attempts_made: 0,
            attempt_budget,
            focal_length: None,
        }
    }

    fn record_attempt(&mut self) {
        debug_assert!(self.focal_length.is_none(), "state is frozen after success");
        debug_assert!(self.attempts_made < self.attempt_budget);
        self.attempts_made += 1;
    }

    fn complete(&mut self, focal_length: f64) {
        debug_assert!(self.focal_length.is_none(), "state is frozen after success");
        self.focal_length = Some(focal_length);
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn attempt_budget(&self) -> u32 {
        self.attempt_budget
    }

    pub fn focal_length(&self) -> Option<f64> {
        self.focal_length
    }

    pub fn succeeded(&self) -> bool {
        self.focal_length.is_some()
    }
}

#[derive(Error, Debug)]
pub enum CalibrationError {
    /// The budget ran out without a single qualifying detection.
    #[error("no face detected within {attempts} calibration attempts")]
    NoFaceDetected { attempts: u32 },
    /// The frame supply ended for good before calibration finished.
    #[error("frame source exhausted during calibration")]
    SourceExhausted,
    /// The driver asked to stop (e.g. the client went away mid-run).
    #[error("calibration cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What the calibrator needs from its caller: a frame per attempt and a
/// sink for progress.
///
/// One trait rather than two callbacks because both sides usually wrap the
/// same connection.
pub trait CalibrationDriver {
    /// Fetch one frame for the next attempt.
    fn fetch_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;

    /// Progress after every unsuccessful attempt: `(completed, budget)`.
    /// Returning `false` cancels the run.
    fn notify_progress(&mut self, completed: u32, budget: u32) -> bool;
}

/// Derive the camera's focal length from a face of known width at a known
/// distance.
///
/// Per attempt: fetch one frame, run the locator, and on the first
/// measurable detection compute the focal length and stop. A fetch that
/// yields no frame still consumes an attempt: frame-read trouble is not a
/// detection failure, but the run must finish within a bounded number of
/// iterations either way. The driver is notified after every unsuccessful
/// attempt, including frame-read skips, so a client always sees forward
/// progress or a terminal answer.
pub fn calibrate(
    driver: &mut dyn CalibrationDriver,
    locator: &mut dyn FaceLocator,
    config: &CalibrationConfig,
) -> Result<f64, CalibrationError> {
    let mut state = CalibrationState::new(config.attempt_budget);

    while state.attempts_made() < state.attempt_budget() {
        let fetched = match driver.fetch_frame() {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => return Err(CalibrationError::SourceExhausted),
            Err(FrameSourceError::Acquisition(reason)) => {
                log::warn!("calibration frame read failed: {reason}");
                None
            }
            Err(FrameSourceError::Transport(e)) => return Err(e.into()),
        };
        state.record_attempt();

        if let Some(frame) = fetched {
            match locator.locate(&frame) {
                Ok(Some(region)) if region.is_measurable() => {
                    let focal = derive_focal_length(
                        region.pixel_width(),
                        config.known_distance_m,
                        config.known_width_m,
                    );
                    state.complete(focal);
                    log::info!(
                        "calibration succeeded after {} attempts: focal length {:.2}px",
                        state.attempts_made(),
                        focal
                    );
                    return Ok(focal);
                }
                Ok(Some(_)) => {
                    log::debug!("ignoring zero-width detection during calibration");
                }
                Ok(None) => {}
                Err(e) => {
                    // A misbehaving backend on one attempt is handled like a
                    // frame without a face; the budget still bounds the run.
                    log::warn!("face detection failed during calibration: {e}");
                }
            }
        }

        if !driver.notify_progress(state.attempts_made(), state.attempt_budget()) {
            return Err(CalibrationError::Cancelled);
        }
        if !config.attempt_delay.is_zero() {
            std::thread::sleep(config.attempt_delay);
        }
    }

    Err(CalibrationError::NoFaceDetected {
        attempts: state.attempts_made(),
    })
}
