/// UltraFace (version-RFB-320) face locator using ONNX Runtime via `ort`.
///
/// An SSD-style single-shot detector: one forward pass produces per-prior
/// class scores and decoded corner boxes in normalized coordinates.
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Model input resolution (width x height).
const INPUT_W: usize = 320;
const INPUT_H: usize = 240;

/// Input normalization: `(pixel - MEAN) / SCALE` per channel.
const MEAN: f32 = 127.0;
const SCALE: f32 = 128.0;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// UltraFace face locator backed by an ONNX Runtime session.
///
/// Applies the configured confidence threshold and returns the single
/// highest-scoring detection left after NMS.
pub struct UltrafaceLocator {
    session: ort::session::Session,
    confidence: f32,
}

impl UltrafaceLocator {
    /// Load the UltraFace ONNX model.
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            confidence,
        })
    }
}

impl FaceLocator for UltrafaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceRegion>, Box<dyn std::error::Error>> {
        let fw = frame.width();
        let fh = frame.height();

        // 1. Preprocess: resize to 320x240, normalize, NCHW
        let input_tensor = preprocess(frame);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // UltraFace outputs two tensors:
        // - scores: [1, N, 2] (background, face) softmax probabilities
        // - boxes:  [1, N, 4] normalized corner coordinates
        if outputs.len() < 2 {
            return Err(
                format!("UltraFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        let boxes = outputs[1].try_extract_array::<f32>()?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;
        let box_data = boxes.as_slice().ok_or("Cannot get box slice")?;

        let num_priors = score_data.len() / 2;
        if box_data.len() < num_priors * 4 {
            return Err("UltraFace box tensor shorter than score tensor".into());
        }

        // 3. Filter by face-class probability and map to frame coordinates
        let mut raw_dets = Vec::new();
        for i in 0..num_priors {
            let score = score_data[i * 2 + 1];
            if score < self.confidence {
                continue;
            }

            let b = &box_data[i * 4..i * 4 + 4];
            let x1 = (f64::from(b[0]) * f64::from(fw)).max(0.0);
            let y1 = (f64::from(b[1]) * f64::from(fh)).max(0.0);
            let x2 = (f64::from(b[2]) * f64::from(fw)).min(f64::from(fw));
            let y2 = (f64::from(b[3]) * f64::from(fh)).min(f64::from(fh));
            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            raw_dets.push(RawDet {
                x1,
                y1,
                x2,
                y2,
                score: f64::from(score),
            });
        }

        // 4. NMS, then keep the single best detection
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        let best = kept.into_iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(best.map(|d| {
            FaceRegion::new(
                d.x1 as u32,
                d.y1 as u32,
                (d.x2 - d.x1) as u32,
                (d.y2 - d.y1) as u32,
                (d.score as f32).clamp(0.0, 1.0),
            )
        }))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to 320x240 and normalize to `(x - 127) / 128` NCHW float32.
fn preprocess(frame: &Frame) -> ndarray::Array4<f32> {
    let src = frame.data();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_H, INPUT_W));

    for y in 0..INPUT_H {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_H as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_W {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_W as f64) as usize).min(src_w - 1);
            let base = (src_y * src_w + src_x) * 3;
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[base + c] as f32 - MEAN) / SCALE;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 0);
        let tensor = preprocess(&frame);
        assert_eq!(tensor.shape(), &[1, 3, INPUT_H, INPUT_W]);
    }

    #[test]
    fn test_preprocess_normalized_midpoint() {
        // Uniform 127 maps to ~0.0 under (x - 127) / 128
        let frame = Frame::new(vec![127u8; 50 * 50 * 3], 50, 50, 0);
        let tensor = preprocess(&frame);
        assert!(tensor[[0, 0, 0, 0]].abs() < 0.01);
    }

    #[test]
    fn test_preprocess_normalized_extremes() {
        let frame = Frame::new(vec![255u8; 10 * 10 * 3], 10, 10, 0);
        let tensor = preprocess(&frame);
        assert!((tensor[[0, 2, 5, 5]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            RawDet {
                x1: 0.0,
                y1: 0.0,
                x2: 100.0,
                y2: 100.0,
                score: 0.9,
            },
            RawDet {
                x1: 5.0,
                y1: 5.0,
                x2: 105.0,
                y2: 105.0,
                score: 0.7,
            },
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_nms_keeps_separate() {
        let mut dets = vec![
            RawDet {
                x1: 0.0,
                y1: 0.0,
                x2: 50.0,
                y2: 50.0,
                score: 0.9,
            },
            RawDet {
                x1: 200.0,
                y1: 200.0,
                x2: 250.0,
                y2: 250.0,
                score: 0.8,
            },
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = RawDet {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            score: 1.0,
        };
        assert!((bbox_iou(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = RawDet {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            score: 1.0,
        };
        let b = RawDet {
            x1: 20.0,
            y1: 20.0,
            x2: 30.0,
            y2: 30.0,
            score: 1.0,
        };
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }
}
