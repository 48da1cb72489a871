use crate::detection::domain::face_locator::FaceLocator;
use crate::estimation::distance::estimate_distance;
use crate::pipeline::annotator::Annotator;
use crate::shared::frame::Frame;

/// One frame's distance result.
///
/// The two fields can never disagree: an absent distance always means no
/// face, and a present distance always means a detected face. The private
/// constructor pair is the only way to build one.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceReading {
    distance_m: Option<f64>,
    face_detected: bool,
}

impl DistanceReading {
    pub fn detected(distance_m: f64) -> Self {
        debug_assert!(distance_m > 0.0);
        Self {
            distance_m: Some(distance_m),
            face_detected: true,
        }
    }

    pub fn no_face() -> Self {
        Self {
            distance_m: None,
            face_detected: false,
        }
    }

    pub fn distance_m(&self) -> Option<f64> {
        self.distance_m
    }

    pub fn face_detected(&self) -> bool {
        self.face_detected
    }
}

/// Per-frame pipeline: locate, estimate, annotate.
///
/// Owns the tunables; the locator and the calibrated focal length are
/// passed in per call, so one processor serves both deployment modes and
/// the locator stays usable for calibration beforehand.
pub struct FrameProcessor {
    annotator: Annotator,
    known_width_m: f64,
    confidence_threshold: f32,
}

impl FrameProcessor {
    pub fn new(annotator: Annotator, known_width_m: f64, confidence_threshold: f32) -> Self {
        Self {
            annotator,
            known_width_m,
            confidence_threshold,
        }
    }

    /// Process one frame: returns the reading and an annotated copy.
    ///
    /// A locator error is logged and mapped to a no-face reading; one bad
    /// frame never ends the stream. Degenerate zero-width detections are
    /// treated as "no face" rather than fed to the distance division.
    pub fn process(
        &self,
        locator: &mut dyn FaceLocator,
        frame: &Frame,
        focal_length: f64,
    ) -> (DistanceReading, Frame) {
        let mut annotated = frame.clone();

        let region = match locator.locate(frame) {
            Ok(region) => region,
            Err(e) => {
                log::error!("face detection failed on frame {}: {e}", frame.index());
                None
            }
        };

        let qualifying = region
            .filter(|r| r.confidence >= self.confidence_threshold)
            .filter(|r| r.is_measurable());

        match qualifying {
            Some(region) => {
                let distance =
                    estimate_distance(region.pixel_width(), focal_length, self.known_width_m);
                log::info!("detected face at distance: {distance:.2} meters");
                self.annotator.annotate_face(&mut annotated, &region, distance);
                (DistanceReading::detected(distance), annotated)
            }
            None => {
                self.annotator.annotate_no_face(&mut annotated);
                (DistanceReading::no_face(), annotated)
            }
        }
    }
}
