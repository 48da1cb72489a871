/// A detected face bounding box within a frame.
///
/// At most one region is selected per frame: the backend's best qualifying
/// detection. Produced fresh for each frame and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detection confidence in `[0, 1]`. Backends whose engine applies its
    /// own pass/fail threshold report `1.0`.
    pub confidence: f32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32, confidence: f32) -> Self {
        debug_assert!((0.0..=1.0).contains(&confidence));
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Box width as a float, for the pinhole-distance arithmetic.
    pub fn pixel_width(&self) -> f64 {
        f64::from(self.width)
    }

    /// Whether the box can be fed to the distance estimator.
    ///
    /// Detector backends can return degenerate zero-width boxes; those must
    /// be treated as "no face", never divided by.
    pub fn is_measurable(&self) -> bool {
        self.width > 0
    }
}
