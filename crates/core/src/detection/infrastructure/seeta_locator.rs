use std::io::Cursor;
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Face locator backed by the `rustface` crate (SeetaFace engine).
///
/// The classical, model-file-driven detector. The engine applies its own
/// score threshold internally, so every detection it returns has already
/// passed the pass/fail gate; reported confidence is therefore `1.0`.
pub struct SeetaLocator {
    model: rustface::Model,
}

impl SeetaLocator {
    /// Load the SeetaFace model from raw bytes.
    pub fn from_bytes(model_data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let model = rustface::read_model(Cursor::new(model_data))?;
        Ok(Self { model })
    }

    /// Load the SeetaFace model from a resolved model file.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl FaceLocator for SeetaLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceRegion>, Box<dyn std::error::Error>> {
        let gray = to_grayscale(frame);

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(20);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(
            &gray,
            frame.width(),
            frame.height(),
        ));

        // Widest face wins: the pinhole math keys on pixel width, and the
        // nearest (largest) subject is the one being measured.
        let best = faces.iter().max_by_key(|face| face.bbox().width());

        Ok(best.map(|face| {
            let bbox = face.bbox();
            FaceRegion::new(
                bbox.x().max(0) as u32,
                bbox.y().max(0) as u32,
                bbox.width(),
                bbox.height(),
                1.0,
            )
        }))
    }
}

/// Plain luma conversion (ITU-R BT.601 weights), row-major u8.
fn to_grayscale(frame: &Frame) -> Vec<u8> {
    frame
        .data()
        .chunks_exact(3)
        .map(|px| {
            let [r, g, b] = [px[0] as u32, px[1] as u32, px[2] as u32];
            ((299 * r + 587 * g + 114 * b) / 1000) as u8
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_length() {
        let frame = Frame::new(vec![10u8; 8 * 4 * 3], 8, 4, 0);
        assert_eq!(to_grayscale(&frame).len(), 32);
    }

    #[test]
    fn test_grayscale_weights() {
        // Pure red, green, blue pixels
        let frame = Frame::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1, 0);
        let gray = to_grayscale(&frame);
        assert_eq!(gray[0], 76); // 0.299 * 255
        assert_eq!(gray[1], 149); // 0.587 * 255
        assert_eq!(gray[2], 29); // 0.114 * 255
    }

    #[test]
    fn test_grayscale_uniform_pixel_is_identity() {
        let frame = Frame::new(vec![128u8; 3], 1, 1, 0);
        assert_eq!(to_grayscale(&frame)[0], 128);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(SeetaLocator::from_bytes(b"not a model").is_err());
    }
}
