pub const SEETA_MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";
pub const SEETA_MODEL_URL: &str =
    "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin";

pub const ULTRAFACE_MODEL_NAME: &str = "version-RFB-320.onnx";
pub const ULTRAFACE_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/ultraface/models/version-RFB-320.onnx";

pub const LABEL_FONT_NAME: &str = "OpenSans-Regular.ttf";
pub const LABEL_FONT_URL: &str =
    "https://github.com/googlefonts/opensans/raw/main/fonts/ttf/OpenSans-Regular.ttf";

/// Ground-truth distance of the calibration subject from the camera (meters).
pub const DEFAULT_KNOWN_DISTANCE_M: f64 = 0.45;

/// Physical width of an average face (meters).
pub const DEFAULT_KNOWN_WIDTH_M: f64 = 0.15;

/// Minimum confidence for a detection to qualify (neural backend).
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Calibration gives up after this many attempts without a face.
pub const DEFAULT_ATTEMPT_BUDGET: u32 = 30;

/// Pause between calibration attempts (milliseconds).
pub const DEFAULT_ATTEMPT_DELAY_MS: u64 = 100;

/// Pause between streamed frames (milliseconds).
pub const DEFAULT_FRAME_DELAY_MS: u64 = 100;

/// Focal length (pixels) used when calibration is bypassed.
pub const DEFAULT_FIXED_FOCAL_LENGTH: f64 = 540.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
