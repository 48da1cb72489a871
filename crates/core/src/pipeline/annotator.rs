use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Label baseline offset above the face box (pixels).
const LABEL_OFFSET: u32 = 24;

/// Position of the "no face" notice.
const NO_FACE_POS: (i32, i32) = (30, 30);

/// Draws the observability overlay: face box plus a distance label, or a
/// "no face" notice.
///
/// The font is optional: without one the overlay degrades to boxes only,
/// because a missing label must never take down a session. Drawing mutates
/// pixel data only; control data is never derived from the overlay.
pub struct Annotator {
    font: Option<FontVec>,
    scale: PxScale,
}

impl Annotator {
    pub fn new(font_bytes: Option<Vec<u8>>) -> Self {
        let font = font_bytes.and_then(|bytes| match FontVec::try_from_vec(bytes) {
            Ok(font) => Some(font),
            Err(e) => {
                log::warn!("label font unusable, drawing boxes only: {e}");
                None
            }
        });
        Self {
            font,
            scale: PxScale::from(22.0),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw the detection box and its distance label.
    pub fn annotate_face(&self, frame: &mut Frame, region: &FaceRegion, distance_m: f64) {
        let Some(mut canvas) = canvas_of(frame) else {
            return;
        };

        let (x, y) = (region.x as i32, region.y as i32);
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(x, y).of_size(region.width.max(1), region.height.max(1)),
            GREEN,
        );
        if let Some(font) = &self.font {
            let label = format!("{distance_m:.2}m");
            let label_y = region.y.saturating_sub(LABEL_OFFSET) as i32;
            draw_text_mut(&mut canvas, GREEN, x, label_y, self.scale, font, &label);
        }

        frame.data_mut().copy_from_slice(canvas.as_raw());
    }

    /// Draw the "no face detected" notice.
    pub fn annotate_no_face(&self, frame: &mut Frame) {
        let Some(font) = &self.font else {
            log::debug!("no label font; skipping no-face notice");
            return;
        };
        let Some(mut canvas) = canvas_of(frame) else {
            return;
        };

        draw_text_mut(
            &mut canvas,
            RED,
            NO_FACE_POS.0,
            NO_FACE_POS.1,
            self.scale,
            font,
            "No face detected",
        );

        frame.data_mut().copy_from_slice(canvas.as_raw());
    }
}

fn canvas_of(frame: &Frame) -> Option<RgbImage> {
    RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
}
