use std::time::Duration;

use crate::detection::domain::face_locator::FaceLocator;
use crate::estimation::calibrator::{
    calibrate, CalibrationConfig, CalibrationDriver, CalibrationError,
};
use crate::pipeline::annotator::Annotator;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::session::domain::frame_source::{FrameSource, FrameSourceError};
use crate::session::domain::transport::{Transport, TransportError};
use crate::session::infrastructure::frame_codec;
use crate::session::protocol::ServerMessage;
use crate::shared::constants;
use crate::shared::frame::Frame;

/// Tunables for one session. Every value the original system hard-coded
/// is adjustable here.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Ground-truth distance of the calibration subject (meters).
    pub known_distance_m: f64,
    /// Physical face width (meters).
    pub known_width_m: f64,
    /// Minimum confidence for a detection to qualify.
    pub confidence_threshold: f32,
    /// Calibration attempts before giving up.
    pub attempt_budget: u32,
    /// Pause between calibration attempts. Zero is valid.
    pub attempt_delay: Duration,
    /// Pause between streamed frames. Zero is valid.
    pub frame_delay: Duration,
    /// When set, calibration is skipped and this focal length (pixels)
    /// is used for every frame.
    pub focal_length_override: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            known_distance_m: constants::DEFAULT_KNOWN_DISTANCE_M,
            known_width_m: constants::DEFAULT_KNOWN_WIDTH_M,
            confidence_threshold: constants::DEFAULT_CONFIDENCE_THRESHOLD,
            attempt_budget: constants::DEFAULT_ATTEMPT_BUDGET,
            attempt_delay: Duration::from_millis(constants::DEFAULT_ATTEMPT_DELAY_MS),
            frame_delay: Duration::from_millis(constants::DEFAULT_FRAME_DELAY_MS),
            focal_length_override: None,
        }
    }
}

/// Where a session's frames come from.
pub enum FrameInput {
    /// A local source the session pulls from (capture device, image
    /// directory). The session owns it and releases it on close.
    Source(Box<dyn FrameSource>),
    /// Frames arrive base64-encoded inside client messages.
    Client,
}

/// Why a session reached its terminal state.
#[derive(Clone, Debug, PartialEq)]
pub enum CloseReason {
    /// The local frame source ran out of frames.
    SourceExhausted,
    /// The client closed the connection in an orderly way.
    ClientDisconnected,
    /// The connection itself failed.
    Transport(String),
}

/// Terminal result of one session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// Calibration exhausted its budget; no frames were streamed.
    CalibrationFailed,
    Closed(CloseReason),
}

/// One client connection's lifetime: calibration, then an unbounded
/// streaming loop.
///
/// States run `Calibrating → Streaming → Closed`, with
/// `Calibrating → CalibrationFailed → Closed` as the failure branch; no
/// transition ever goes backwards. Frames are handled strictly one at a
/// time: frame N's message is sent before frame N+1 is acquired.
///
/// Failure policy: anything wrong with a single frame is reported and the
/// loop continues; transport failures and calibration exhaustion are
/// terminal. The frame source is released exactly once on close, on every
/// exit path.
pub struct StreamSession {
    transport: Box<dyn Transport>,
    input: FrameInput,
    locator: Box<dyn FaceLocator>,
    processor: FrameProcessor,
    config: SessionConfig,
    frames_seen: usize,
    released: bool,
}

impl StreamSession {
    pub fn new(
        transport: Box<dyn Transport>,
        input: FrameInput,
        locator: Box<dyn FaceLocator>,
        annotator: Annotator,
        config: SessionConfig,
    ) -> Self {
        let processor = FrameProcessor::new(
            annotator,
            config.known_width_m,
            config.confidence_threshold,
        );
        Self {
            transport,
            input,
            locator,
            processor,
            config,
            frames_seen: 0,
            released: false,
        }
    }

    /// Drive the session to its terminal state.
    pub fn run(mut self) -> SessionOutcome {
        let outcome = self.run_phases();
        self.shutdown();
        log::info!("session finished: {outcome:?}");
        outcome
    }

    fn run_phases(&mut self) -> SessionOutcome {
        let focal_length = match self.config.focal_length_override {
            Some(focal) => {
                log::debug!("calibration bypassed; fixed focal length {focal:.2}px");
                focal
            }
            None => match self.calibration_phase() {
                Ok(focal) => focal,
                Err(outcome) => return outcome,
            },
        };
        self.streaming_phase(focal_length)
    }

    /// Calibrating state: derive the focal length or fail the session.
    fn calibration_phase(&mut self) -> Result<f64, SessionOutcome> {
        if let Err(e) = self
            .transport
            .send(&ServerMessage::calibration("Calibrating... Please wait.", 0))
        {
            return Err(SessionOutcome::Closed(CloseReason::Transport(e.to_string())));
        }

        let cal_config = CalibrationConfig {
            known_distance_m: self.config.known_distance_m,
            known_width_m: self.config.known_width_m,
            attempt_budget: self.config.attempt_budget,
            attempt_delay: self.config.attempt_delay,
        };

        // Split the borrows: the driver wraps the connection and frame
        // input while the locator is handed to the calibrator separately.
        let Self {
            transport,
            input,
            locator,
            frames_seen,
            ..
        } = self;
        let mut driver = SessionCalibrationDriver {
            input,
            transport: transport.as_mut(),
            frames_seen,
            send_error: None,
        };
        let result = calibrate(&mut driver, locator.as_mut(), &cal_config);
        let send_error = driver.send_error;

        match result {
            Ok(focal) => {
                let success = ServerMessage::calibration(
                    format!("Calibration successful with focal length: {focal:.2}"),
                    100,
                );
                let complete = ServerMessage::calibration("Calibration complete.", 100);
                for message in [success, complete] {
                    if let Err(e) = self.transport.send(&message) {
                        return Err(SessionOutcome::Closed(CloseReason::Transport(
                            e.to_string(),
                        )));
                    }
                }
                Ok(focal)
            }
            Err(CalibrationError::NoFaceDetected { attempts }) => {
                log::error!("calibration failed: no face within {attempts} attempts");
                // Best effort: the client may already be gone
                let _ = self.transport.send(&ServerMessage::calibration(
                    "Calibration failed. No face detected.",
                    100,
                ));
                Err(SessionOutcome::CalibrationFailed)
            }
            Err(CalibrationError::SourceExhausted) => {
                Err(SessionOutcome::Closed(exhaustion_reason(&self.input)))
            }
            Err(CalibrationError::Cancelled) => {
                let reason = send_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "calibration cancelled".to_string());
                Err(SessionOutcome::Closed(CloseReason::Transport(reason)))
            }
            Err(CalibrationError::Transport(e)) => {
                Err(SessionOutcome::Closed(CloseReason::Transport(e.to_string())))
            }
        }
    }

    /// Streaming state: acquire → process → send, one frame at a time.
    fn streaming_phase(&mut self, focal_length: f64) -> SessionOutcome {
        log::info!("streaming at focal length {focal_length:.2}px");
        loop {
            let acquired = acquire_frame(
                &mut self.input,
                self.transport.as_mut(),
                &mut self.frames_seen,
            );
            match acquired {
                Err(FrameSourceError::Transport(e)) => {
                    return SessionOutcome::Closed(CloseReason::Transport(e.to_string()));
                }
                Err(FrameSourceError::Acquisition(reason)) => {
                    log::warn!("skipping frame: {reason}");
                }
                Ok(None) => return SessionOutcome::Closed(exhaustion_reason(&self.input)),
                Ok(Some(frame)) => {
                    if let Err(e) = self.process_and_send(&frame, focal_length) {
                        return SessionOutcome::Closed(CloseReason::Transport(e.to_string()));
                    }
                }
            }
            if !self.config.frame_delay.is_zero() {
                std::thread::sleep(self.config.frame_delay);
            }
        }
    }

    fn process_and_send(
        &mut self,
        frame: &Frame,
        focal_length: f64,
    ) -> Result<(), TransportError> {
        let (reading, annotated) =
            self.processor
                .process(self.locator.as_mut(), frame, focal_length);

        match frame_codec::encode_frame_jpeg(&annotated) {
            Ok(image) => self.transport.send(&ServerMessage::Frame {
                image,
                distance: reading.distance_m(),
                face_detected: reading.face_detected(),
            }),
            Err(e) => {
                // Per-frame failure: report it and keep the session alive
                log::error!("failed to encode frame {}: {e}", frame.index());
                self.transport
                    .send(&ServerMessage::error(format!("Error processing frame: {e}")))
            }
        }
    }

    /// Closed state: release the source and the connection, exactly once.
    fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let FrameInput::Source(source) = &mut self.input {
            source.close();
        }
        self.transport.close();
    }
}

/// Bridges the calibrator onto the session's connection: frames come from
/// the configured input, progress goes out as calibration messages, and a
/// failed send cancels the run.
struct SessionCalibrationDriver<'a> {
    input: &'a mut FrameInput,
    transport: &'a mut dyn Transport,
    frames_seen: &'a mut usize,
    send_error: Option<TransportError>,
}

impl CalibrationDriver for SessionCalibrationDriver<'_> {
    fn fetch_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        acquire_frame(self.input, self.transport, self.frames_seen)
    }

    fn notify_progress(&mut self, completed: u32, budget: u32) -> bool {
        let progress = ((completed * 100) / budget).min(100) as u8;
        let message = ServerMessage::calibration(
            format!("Calibrating... {completed}/{budget}"),
            progress,
        );
        match self.transport.send(&message) {
            Ok(()) => true,
            Err(e) => {
                self.send_error = Some(e);
                false
            }
        }
    }
}

/// Acquire the next frame according to the session's input mode.
///
/// In client mode a message without an image, or with undecodable image
/// bytes, is answered with the matching error reply and surfaces as a
/// transient acquisition error; the connection stays open.
fn acquire_frame(
    input: &mut FrameInput,
    transport: &mut dyn Transport,
    frames_seen: &mut usize,
) -> Result<Option<Frame>, FrameSourceError> {
    match input {
        FrameInput::Source(source) => source.next_frame(),
        FrameInput::Client => {
            let Some(message) = transport.recv()? else {
                return Ok(None);
            };
            let Some(payload) = message.image else {
                transport.send(&ServerMessage::error("No image received"))?;
                return Err(FrameSourceError::Acquisition(
                    "client message without image".into(),
                ));
            };
            match frame_codec::decode_base64_image(&payload, *frames_seen) {
                Ok(frame) => {
                    *frames_seen += 1;
                    Ok(Some(frame))
                }
                Err(e) => {
                    log::error!("failed to decode client image: {e}");
                    transport.send(&ServerMessage::error("Failed to decode image"))?;
                    Err(FrameSourceError::Acquisition(format!(
                        "undecodable client image: {e}"
                    )))
                }
            }
        }
    }
}

fn exhaustion_reason(input: &FrameInput) -> CloseReason {
    match input {
        FrameInput::Source(_) => CloseReason::SourceExhausted,
        FrameInput::Client => CloseReason::ClientDisconnected,
    }
}
